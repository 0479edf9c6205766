//! Home page banner handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use vitrine_core::{Banner, BannerId, BannerInput, BannerPatch};

use super::Message;
use crate::error::{AppError, JsonBody, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// List banners by display order.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    let mut banners = state.store().list_banners().await?;
    banners.sort_by_key(|b| b.order);
    Ok(Json(banners))
}

/// Create a banner at the end of the carousel.
///
/// # Errors
///
/// Returns 400 if the image is missing.
#[instrument(skip(state, _admin, input))]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<BannerInput>,
) -> Result<(StatusCode, Json<Banner>)> {
    input.validate()?;
    let banner = state.store().create_banner(input).await?;
    tracing::info!(banner_id = %banner.id, "Banner created");
    Ok((StatusCode::CREATED, Json(banner)))
}

/// Merge fields into a banner.
///
/// # Errors
///
/// Returns 404 if the banner does not exist.
#[instrument(skip(state, _admin, patch))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
    JsonBody(patch): JsonBody<BannerPatch>,
) -> Result<Json<Banner>> {
    patch.validate()?;
    state
        .store()
        .update_banner(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Banner não encontrado".to_string()))
}

#[instrument(skip(state, _admin))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<Json<Message>> {
    let removed = state.store().delete_banner(id).await?;
    tracing::info!(removed, "Banner delete");
    Ok(Json(Message {
        message: "Banner removido",
    }))
}
