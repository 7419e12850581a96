use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    contracts::{
        CreateItemRequest, ItemResponse, ItemWithOwnerResponse, MessageResponse, UpdateItemRequest,
    },
    error::{AppError, AppResult, ITEM_NOT_FOUND, OWNER_NOT_FOUND},
    extract::{AppJson, AppPath},
    models::Item,
    state::AppState,
    store::StoreError,
};

/// An item write tripping the owner FK means the owner vanished after the
/// existence check.
fn owner_missing(error: StoreError) -> AppError {
    match error {
        StoreError::ForeignKeyViolation { .. } => AppError::NotFound(OWNER_NOT_FOUND),
        other => other.into(),
    }
}

#[instrument(skip(state))]
pub async fn create_item(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let new_item = body.validate()?;

    let mut session = state.store.begin().await?;
    if session.find_user(new_item.owner_id).await?.is_none() {
        return Err(AppError::NotFound(OWNER_NOT_FOUND));
    }

    let item = session
        .insert_item(&Item::create(new_item))
        .await
        .map_err(owner_missing)?;
    session.commit().await.map_err(owner_missing)?;

    state.items_created_counter.add(1, &[]);
    tracing::info!(item_id = %item.id, owner_id = %item.owner_id, "item created");

    Ok((StatusCode::CREATED, Json(item.into())))
}

#[instrument(skip_all)]
pub async fn read_items(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ItemWithOwnerResponse>>> {
    let mut session = state.store.begin().await?;
    let items = session.list_items().await?;

    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn read_item(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ItemWithOwnerResponse>> {
    let mut session = state.store.begin().await?;
    let item = session
        .find_item_with_owner(id)
        .await?
        .ok_or(AppError::NotFound(ITEM_NOT_FOUND))?;

    Ok(Json(item.into()))
}

#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateItemRequest>,
) -> AppResult<Json<ItemResponse>> {
    let changes = body.validate()?;

    let mut session = state.store.begin().await?;
    let mut item = session
        .find_item(id)
        .await?
        .ok_or(AppError::NotFound(ITEM_NOT_FOUND))?;

    if let Some(owner_id) = changes.owner_id {
        if session.find_user(owner_id).await?.is_none() {
            return Err(AppError::NotFound(OWNER_NOT_FOUND));
        }
    }

    item.apply(changes);
    let item = session.update_item(&item).await.map_err(owner_missing)?;
    session.commit().await.map_err(owner_missing)?;

    Ok(Json(item.into()))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let mut session = state.store.begin().await?;
    if session.find_item(id).await?.is_none() {
        return Err(AppError::NotFound(ITEM_NOT_FOUND));
    }

    session.delete_item(id).await?;
    session.commit().await?;

    Ok(Json(MessageResponse::new("Item deleted successfully")))
}
