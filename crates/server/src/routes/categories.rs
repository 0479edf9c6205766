//! Category handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use vitrine_core::{Category, CategoryId, CategoryInput, CategoryPatch};

use super::Message;
use crate::error::{AppError, JsonBody, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// List categories by display order.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let mut categories = state.store().list_categories().await?;
    categories.sort_by_key(|c| c.order);
    Ok(Json(categories))
}

/// Create a category at the end of the display order.
///
/// # Errors
///
/// Returns 400 for an empty name and 409 if the id is taken.
#[instrument(skip(state, _admin, input), fields(name = %input.name))]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    input.validate()?;
    let category = state.store().create_category(input).await?;
    tracing::info!(category_id = %category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Merge fields into a category.
///
/// # Errors
///
/// Returns 404 if the category does not exist.
#[instrument(skip(state, _admin, patch))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    JsonBody(patch): JsonBody<CategoryPatch>,
) -> Result<Json<Category>> {
    patch.validate()?;
    state
        .store()
        .update_category(&id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Categoria não encontrada".to_string()))
}

/// Delete a category. Deleting an unknown id succeeds.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
#[instrument(skip(state, _admin))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Message>> {
    let removed = state.store().delete_category(&id).await?;
    tracing::info!(removed, "Category delete");
    Ok(Json(Message {
        message: "Categoria removida",
    }))
}
