//! Stripe REST client.
//!
//! Talks to the Stripe API with form-encoded posts, covering hosted checkout
//! for the storefront cart and the Connect flows used by the marketplace
//! pages (connected accounts, onboarding links, products and checkout with
//! an application fee).

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use vitrine_core::money::{self, to_cents};

use crate::config::StripeConfig;

/// Errors that can occur when calling Stripe.
#[derive(Debug, Error)]
pub enum StripeError {
    /// No usable secret key is configured.
    #[error("Stripe Integration Disabled")]
    Disabled,

    /// The request is missing something Stripe needs.
    #[error("{0}")]
    InvalidRequest(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with an error object.
    #[error("Stripe API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// A storefront cart line for platform checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItem {
    pub title: String,
    #[serde(with = "money::amount")]
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Product to create on a connected account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_in_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Onboarding state of a connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub id: String,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub charges_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: SecretString,
    application_fee_cents: i64,
    base_url: String,
}

impl StripeClient {
    /// Create a client. `base_url` is the public site URL used for
    /// checkout and onboarding return links.
    #[must_use]
    pub fn new(config: &StripeConfig, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            secret_key: config.secret_key.clone(),
            application_fee_cents: config.application_fee_cents,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        account: Option<&str>,
    ) -> Result<Value, StripeError> {
        let mut request = request.bearer_auth(self.secret_key.expose_secret());
        if let Some(account) = account {
            request = request.header("Stripe-Account", account);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_owned();
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn post(
        &self,
        path: &str,
        params: &[(String, String)],
        account: Option<&str>,
    ) -> Result<Value, StripeError> {
        let request = self
            .client
            .post(format!("{}/{path}", self.api_url))
            .form(params);
        self.send(request, account).await
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        account: Option<&str>,
    ) -> Result<Value, StripeError> {
        let url = url::Url::parse_with_params(&format!("{}/{path}", self.api_url), query)
            .map_err(|e| StripeError::InvalidRequest(format!("invalid URL: {e}")))?;
        self.send(self.client.get(url), account).await
    }

    fn created(body: Value) -> Result<Created, StripeError> {
        serde_json::from_value(body).map_err(|e| StripeError::Api {
            status: 200,
            message: format!("unexpected response: {e}"),
        })
    }

    fn checkout_url(body: Value) -> Result<String, StripeError> {
        let session = Self::created(body)?;
        debug!(session = %session.id, "Checkout session created");
        session.url.ok_or_else(|| StripeError::Api {
            status: 200,
            message: "checkout session has no url".to_string(),
        })
    }

    /// Retrieve the platform account; used to check a key works.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the key is rejected.
    pub async fn platform_account(&self) -> Result<String, StripeError> {
        let body = self.get("account", &[], None).await?;
        Ok(Self::created(body)?.id)
    }

    /// Hosted checkout for the storefront cart, paid to the platform.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidRequest` for an empty cart.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn platform_checkout(&self, items: &[CheckoutItem]) -> Result<String, StripeError> {
        let params = platform_checkout_params(items, &self.base_url)?;
        let body = self.post("checkout/sessions", &params, None).await?;
        Self::checkout_url(body)
    }

    /// Create a connected account; returns its id.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if Stripe rejects the request.
    #[instrument(skip(self))]
    pub async fn create_account(&self) -> Result<String, StripeError> {
        let params = form(&[
            ("controller[fees][payer]", "account"),
            ("controller[losses][payments]", "stripe"),
            ("controller[stripe_dashboard][type]", "full"),
        ]);
        let body = self.post("accounts", &params, None).await?;
        Ok(Self::created(body)?.id)
    }

    /// Onboarding link for a connected account.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidRequest` for a malformed account id.
    #[instrument(skip(self))]
    pub async fn create_account_link(&self, account_id: &str) -> Result<String, StripeError> {
        let account_id = checked_id(account_id, "accountId")?;
        let return_url = format!("{}/stripe-connect.html", self.base_url);
        let params = form(&[
            ("account", account_id),
            ("refresh_url", return_url.as_str()),
            ("return_url", return_url.as_str()),
            ("type", "account_onboarding"),
        ]);
        let body = self.post("account_links", &params, None).await?;
        Self::created_url(body)
    }

    fn created_url(body: Value) -> Result<String, StripeError> {
        body["url"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| StripeError::Api {
                status: 200,
                message: "response has no url".to_string(),
            })
    }

    /// Onboarding flags of a connected account.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the account cannot be retrieved.
    #[instrument(skip(self))]
    pub async fn account_status(&self, account_id: &str) -> Result<AccountStatus, StripeError> {
        let account_id = checked_id(account_id, "accountId")?;
        let body = self.get(&format!("accounts/{account_id}"), &[], None).await?;
        serde_json::from_value(body).map_err(|e| StripeError::Api {
            status: 200,
            message: format!("unexpected response: {e}"),
        })
    }

    /// Create a product with a default price on a connected account.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if Stripe rejects the request.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(
        &self,
        account_id: &str,
        product: &NewProduct,
    ) -> Result<Value, StripeError> {
        let account_id = checked_id(account_id, "accountId")?;
        let amount = product.price_in_cents.to_string();
        let mut params = form(&[
            ("name", product.name.as_str()),
            ("default_price_data[unit_amount]", amount.as_str()),
            (
                "default_price_data[currency]",
                product.currency.as_deref().unwrap_or("brl"),
            ),
        ]);
        if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
            params.push(("description".to_string(), description.to_string()));
        }
        self.post("products", &params, Some(account_id)).await
    }

    /// Up to ten active products of a connected account, with prices expanded.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the list cannot be retrieved.
    #[instrument(skip(self))]
    pub async fn list_products(&self, account_id: &str) -> Result<Value, StripeError> {
        let account_id = checked_id(account_id, "accountId")?;
        let mut body = self
            .get(
                "products",
                &[
                    ("limit", "10"),
                    ("active", "true"),
                    ("expand[]", "data.default_price"),
                ],
                Some(account_id),
            )
            .await?;
        Ok(body.get_mut("data").map(Value::take).unwrap_or_default())
    }

    /// Hosted checkout on a connected account with the platform fee.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidRequest` for malformed ids.
    #[instrument(skip(self))]
    pub async fn connected_checkout(
        &self,
        account_id: &str,
        price_id: &str,
        quantity: u32,
    ) -> Result<String, StripeError> {
        let account_id = checked_id(account_id, "accountId")?;
        let price_id = checked_id(price_id, "priceId")?;
        let params = connected_checkout_params(
            account_id,
            price_id,
            quantity,
            self.application_fee_cents,
            &self.base_url,
        );
        let body = self
            .post("checkout/sessions", &params, Some(account_id))
            .await?;
        Self::checkout_url(body)
    }
}

fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Stripe object ids are `[A-Za-z0-9_]`; anything else would end up in a path.
fn checked_id<'a>(id: &'a str, field: &str) -> Result<&'a str, StripeError> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(id)
    } else {
        Err(StripeError::InvalidRequest(format!("Missing or invalid {field}")))
    }
}

/// Form parameters for a storefront cart checkout.
///
/// # Errors
///
/// Returns `StripeError::InvalidRequest` when `items` is empty.
pub fn platform_checkout_params(
    items: &[CheckoutItem],
    base_url: &str,
) -> Result<Vec<(String, String)>, StripeError> {
    if items.is_empty() {
        return Err(StripeError::InvalidRequest("No items provided".to_string()));
    }

    let mut params = Vec::with_capacity(items.len() * 5 + 6);
    for (i, item) in items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        params.push((format!("{prefix}[price_data][currency]"), "brl".to_string()));
        params.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.title.clone(),
        ));
        if let Some(size) = item.size.as_deref().filter(|s| !s.is_empty()) {
            params.push((
                format!("{prefix}[price_data][product_data][description]"),
                format!(
                    "Tamanho: {size} | Cor: {}",
                    item.color.as_deref().unwrap_or_default()
                ),
            ));
        }
        params.push((
            format!("{prefix}[price_data][unit_amount]"),
            to_cents(item.price).to_string(),
        ));
        params.push((
            format!("{prefix}[quantity]"),
            item.quantity.filter(|q| *q > 0).unwrap_or(1).to_string(),
        ));
    }
    let success_url = format!("{base_url}/success.html");
    let cancel_url = format!("{base_url}/cancel.html");
    params.extend(form(&[
        ("mode", "payment"),
        ("success_url", success_url.as_str()),
        ("cancel_url", cancel_url.as_str()),
        ("shipping_address_collection[allowed_countries][0]", "BR"),
        ("phone_number_collection[enabled]", "true"),
    ]));
    Ok(params)
}

/// Form parameters for a connected-account checkout.
#[must_use]
pub fn connected_checkout_params(
    account_id: &str,
    price_id: &str,
    quantity: u32,
    application_fee_cents: i64,
    base_url: &str,
) -> Vec<(String, String)> {
    let storefront = format!("{base_url}/stripe-storefront.html?accountId={account_id}");
    let quantity = quantity.max(1).to_string();
    let fee = application_fee_cents.to_string();
    let success_url = format!("{storefront}&success=true");
    let cancel_url = format!("{storefront}&canceled=true");
    form(&[
        ("line_items[0][price]", price_id),
        ("line_items[0][quantity]", quantity.as_str()),
        ("payment_intent_data[application_fee_amount]", fee.as_str()),
        ("mode", "payment"),
        ("success_url", success_url.as_str()),
        ("cancel_url", cancel_url.as_str()),
    ])
}
