//! Site settings handlers.
//!
//! Settings are a free-form JSON object (store name, contact details, social
//! links, colors). Updates are a shallow merge: top-level keys in the body
//! replace stored ones, everything else is kept.

use axum::{Json, extract::State};
use tracing::instrument;

use vitrine_core::Settings;

use crate::error::{JsonBody, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Current settings; `{}` when nothing has been saved.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Result<Json<Settings>> {
    Ok(Json(state.store().get_settings().await?))
}

/// Shallow-merge the body into the stored settings.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
#[instrument(skip(state, _admin, patch), fields(keys = patch.len()))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(patch): JsonBody<Settings>,
) -> Result<Json<Settings>> {
    let settings = state.store().merge_settings(patch).await?;
    tracing::info!("Settings updated");
    Ok(Json(settings))
}
