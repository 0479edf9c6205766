//! Stripe key check.
//!
//! # Usage
//!
//! ```bash
//! vitrine stripe verify
//! ```
//!
//! # Environment Variables
//!
//! - `STRIPE_SECRET_KEY` - Secret key to check
//! - `STRIPE_API_URL` - API base URL (default: Stripe production)

use secrecy::SecretString;
use thiserror::Error;

use vitrine_server::config::{STRIPE_API_URL, StripeConfig, stripe_key_usable};
use vitrine_server::services::stripe::{StripeClient, StripeError};

/// Errors from `stripe verify`.
#[derive(Debug, Error)]
pub enum StripeCheckError {
    #[error("STRIPE_SECRET_KEY is missing or still a placeholder")]
    MissingKey,

    #[error("Stripe rejected the key: {0}")]
    Stripe(#[from] StripeError),
}

/// Retrieve the platform account with the configured key.
pub async fn verify() -> Result<(), StripeCheckError> {
    let key = super::env_var("STRIPE_SECRET_KEY")
        .filter(|key| stripe_key_usable(key))
        .ok_or(StripeCheckError::MissingKey)?;

    let config = StripeConfig {
        secret_key: SecretString::from(key),
        application_fee_cents: 0,
        api_url: super::env_var("STRIPE_API_URL").unwrap_or_else(|| STRIPE_API_URL.to_owned()),
    };
    let mode = if config.is_live() { "live" } else { "test" };
    tracing::info!(mode, "Checking Stripe key...");

    let account = StripeClient::new(&config, "http://localhost")
        .platform_account()
        .await?;

    tracing::info!(%account, mode, "Stripe key accepted");
    if config.is_live() {
        tracing::warn!("This is a live key: checkouts will charge real cards");
    }
    Ok(())
}
