//! Stripe checkout and Connect handlers.
//!
//! Every handler answers 503 when the server has no usable Stripe key.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::error::{JsonBody, Result};
use crate::services::stripe::{
    AccountStatus, CheckoutItem, NewProduct, StripeClient, StripeError,
};
use crate::state::AppState;

fn client(state: &AppState) -> std::result::Result<&StripeClient, StripeError> {
    state.stripe().ok_or(StripeError::Disabled)
}

/// `{"url": ...}` response for checkout and onboarding redirects.
#[derive(Debug, Serialize)]
pub struct RedirectUrl {
    pub url: String,
}

/// `{"account": ...}` response for account creation.
#[derive(Debug, Serialize)]
pub struct CreatedAccount {
    pub account: String,
}

/// Storefront cart checkout body.
#[derive(Debug, Deserialize)]
pub struct PlatformCheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
}

/// Onboarding link body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLinkRequest {
    #[serde(default)]
    pub account_id: String,
}

/// Connected product body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[serde(default)]
    pub account_id: String,
    #[serde(flatten)]
    pub product: NewProduct,
}

/// Connected checkout body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub price_id: String,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Hosted checkout for the storefront cart.
///
/// # Errors
///
/// Returns 400 for an empty cart and 502 if Stripe fails.
#[instrument(skip_all, fields(items = request.items.len()))]
pub async fn platform_checkout(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PlatformCheckoutRequest>,
) -> Result<Json<RedirectUrl>> {
    let url = client(&state)?.platform_checkout(&request.items).await?;
    Ok(Json(RedirectUrl { url }))
}

/// Create a connected account.
///
/// # Errors
///
/// Returns 502 if Stripe fails.
#[instrument(skip_all)]
pub async fn create_account(State(state): State<AppState>) -> Result<Json<CreatedAccount>> {
    let account = client(&state)?.create_account().await?;
    tracing::info!(%account, "Connected account created");
    Ok(Json(CreatedAccount { account }))
}

/// Onboarding link for a connected account.
///
/// # Errors
///
/// Returns 400 for a missing account id.
#[instrument(skip_all)]
pub async fn create_account_link(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AccountLinkRequest>,
) -> Result<Json<RedirectUrl>> {
    let url = client(&state)?
        .create_account_link(&request.account_id)
        .await?;
    Ok(Json(RedirectUrl { url }))
}

/// Onboarding flags of a connected account.
///
/// # Errors
///
/// Returns 502 if the account cannot be retrieved.
#[instrument(skip(state))]
pub async fn account_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountStatus>> {
    Ok(Json(client(&state)?.account_status(&id).await?))
}

/// Create a product on a connected account.
///
/// # Errors
///
/// Returns 400 for a missing account id.
#[instrument(skip_all, fields(name = %request.product.name))]
pub async fn create_product(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateProductRequest>,
) -> Result<Json<Value>> {
    let product = client(&state)?
        .create_product(&request.account_id, &request.product)
        .await?;
    Ok(Json(product))
}

/// Active products of a connected account.
///
/// # Errors
///
/// Returns 502 if the list cannot be retrieved.
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Value>> {
    Ok(Json(client(&state)?.list_products(&account_id).await?))
}

/// Hosted checkout on a connected account with the platform fee.
///
/// # Errors
///
/// Returns 400 for missing ids.
#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CheckoutRequest>,
) -> Result<Json<RedirectUrl>> {
    let url = client(&state)?
        .connected_checkout(
            &request.account_id,
            &request.price_id,
            request.quantity.unwrap_or(1),
        )
        .await?;
    Ok(Json(RedirectUrl { url }))
}
