//! Cart shipping estimate handler.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{JsonBody, Result};
use crate::services::shipping::{ShippingOption, ShippingRequest};
use crate::state::AppState;

/// Shipping options for a cart, free shipping first when it applies.
///
/// Carrier failures never reach the client; the contingency table answers
/// instead.
///
/// # Errors
///
/// Returns 400 if the postal code is missing or maps to no state.
#[instrument(skip(state, request))]
pub async fn calculate(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ShippingRequest>,
) -> Result<Json<Vec<ShippingOption>>> {
    let options = state.shipping().resolve(&request).await?;
    Ok(Json(options))
}
