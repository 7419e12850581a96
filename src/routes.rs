use axum::{
    Router,
    routing::{MethodRouter, get},
};
use axum_tracing_opentelemetry::middleware::{OtelAxumLayer, OtelInResponseLayer};

use crate::handlers::{items, users};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let users_root: MethodRouter<AppState> = get(users::read_users).post(users::create_user);
    let items_root: MethodRouter<AppState> = get(items::read_items).post(items::create_item);

    Router::new()
        .route("/users", users_root.clone())
        .route("/users/", users_root)
        .route(
            "/users/{id}",
            get(users::read_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/items", items_root.clone())
        .route("/items/", items_root)
        .route(
            "/items/{id}",
            get(items::read_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .layer(OtelInResponseLayer::default())
        .layer(OtelAxumLayer::default())
        .with_state(state)
}
