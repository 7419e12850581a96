use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    contracts::{
        CreateUserRequest, CreateUserResponse, MessageResponse, UpdateUserRequest, UserResponse,
        UserWithItemsResponse,
    },
    error::{AppError, AppResult, USER_NOT_FOUND},
    extract::{AppJson, AppPath},
    models::User,
    state::AppState,
};

#[instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CreateUserResponse>)> {
    let new_user = body.validate()?;

    let mut session = state.store.begin().await?;
    let user = session.insert_user(&User::create(new_user)).await?;
    session.commit().await?;

    state.users_created_counter.add(1, &[]);
    tracing::info!(user_id = %user.id, "user created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip_all)]
pub async fn read_users(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserWithItemsResponse>>> {
    let mut session = state.store.begin().await?;
    let users = session.list_users().await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn read_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<UserWithItemsResponse>> {
    let mut session = state.store.begin().await?;
    let user = session
        .find_user_with_items(id)
        .await?
        .ok_or(AppError::NotFound(USER_NOT_FOUND))?;

    Ok(Json(user.into()))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let changes = body.validate()?;

    let mut session = state.store.begin().await?;
    let mut user = session
        .find_user(id)
        .await?
        .ok_or(AppError::NotFound(USER_NOT_FOUND))?;

    user.apply(changes);
    let user = session.update_user(&user).await?;
    session.commit().await?;

    Ok(Json(user.into()))
}

/// Items owned by the user are deleted along with it.
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let mut session = state.store.begin().await?;
    if session.find_user(id).await?.is_none() {
        return Err(AppError::NotFound(USER_NOT_FOUND));
    }

    let removed_items = session.delete_items_owned_by(id).await?;
    session.delete_user(id).await?;
    session.commit().await?;

    tracing::info!(user_id = %id, removed_items, "user deleted");

    Ok(Json(MessageResponse::new("User deleted successfully")))
}
