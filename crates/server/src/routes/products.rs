//! Product catalog handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use vitrine_core::{Product, ProductId, ProductInput, ProductPatch};

use super::Message;
use crate::error::{AppError, JsonBody, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const NOT_FOUND: &str = "Produto não encontrado";

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Only products flagged active (the storefront sets this).
    #[serde(default)]
    pub active: Option<bool>,
}

/// List products.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let mut products = state.store().list_products().await?;
    if query.active == Some(true) {
        products.retain(|p| p.active);
    }
    Ok(Json(products))
}

/// Product detail.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    state
        .store()
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

/// Create a product.
///
/// # Errors
///
/// Returns 400 if the name is empty or the price negative.
#[instrument(skip(state, _admin, input), fields(name = %input.name))]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    input.validate()?;
    let product = state.store().create_product(input).await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Merge fields into a product; `updatedAt` is refreshed.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(state, _admin, patch))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> Result<Json<Product>> {
    patch.validate()?;
    let product = state
        .store()
        .update_product(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(product))
}

/// Delete a product. Deleting an unknown id succeeds.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
#[instrument(skip(state, _admin))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Message>> {
    let removed = state.store().delete_product(id).await?;
    tracing::info!(removed, "Product delete");
    Ok(Json(Message {
        message: "Produto removido com sucesso",
    }))
}
