//! Integration test harness for Vitrine.
//!
//! Tests drive the full router in-process with `tower::ServiceExt::oneshot`,
//! backed by a JSON store in a temporary directory and a stub carrier, so no
//! database, network or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vitrine-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vitrine_core::{Role, User};
use vitrine_server::config::{JwtConfig, LogFormat, ServerConfig, ShippingConfig, StripeConfig};
use vitrine_server::db::{CatalogStore, JsonStore};
use vitrine_server::services::auth::hash_password;
use vitrine_server::services::shipping::{CarrierError, CarrierQuote, CarrierQuoter, QuoteRequest};
use vitrine_server::services::uploads::LocalImageStorage;
use vitrine_server::state::AppState;

/// Signing secret used by every test server.
pub const JWT_SECRET: &str = "k8Hq2mZr7VtXw4Lp9Bn3Jc6Fy1Ds5Ga0";

/// Password of the seeded admin user.
pub const ADMIN_PASSWORD: &str = "vitrine-test-pass";

// =============================================================================
// Stub carrier
// =============================================================================

/// Carrier that answers from a fixed script and counts calls.
pub struct StubCarrier {
    response: Result<Vec<CarrierQuote>, u16>,
    calls: AtomicUsize,
}

impl StubCarrier {
    /// Answer every request with `quotes`.
    #[must_use]
    pub fn quoting(quotes: Vec<CarrierQuote>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(quotes),
            calls: AtomicUsize::new(0),
        })
    }

    /// Fail every request with an HTTP status.
    #[must_use]
    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            response: Err(status),
            calls: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CarrierQuoter for StubCarrier {
    async fn quote(
        &self,
        _request: &QuoteRequest,
        _services: &[&str],
    ) -> Result<Vec<CarrierQuote>, CarrierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(CarrierError::Status)
    }
}

// =============================================================================
// Test server
// =============================================================================

/// A router over a throwaway data directory.
pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

/// Test configuration rooted at `dir`.
#[must_use]
pub fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3001".to_owned(),
        data_dir: dir.path().join("data"),
        upload_dir: dir.path().join("images"),
        static_dir: None,
        database_url: None,
        jwt: JwtConfig {
            secret: SecretString::from(JWT_SECRET),
            expiration_hours: 24,
        },
        shipping: ShippingConfig::default(),
        stripe: None,
        imgbb: None,
        sentry_dsn: None,
        log_format: LogFormat::Text,
    }
}

/// Stripe settings pointing at an address nothing listens on.
#[must_use]
pub fn offline_stripe() -> StripeConfig {
    StripeConfig {
        secret_key: SecretString::from("sk_test_offline"),
        application_fee_cents: 123,
        api_url: "http://127.0.0.1:9/v1".to_owned(),
    }
}

impl TestApp {
    /// App with a carrier that always fails (contingency rates apply).
    pub async fn new() -> Self {
        Self::with_carrier(StubCarrier::failing(503)).await
    }

    pub async fn with_carrier(carrier: Arc<StubCarrier>) -> Self {
        Self::build(carrier, |_| {}).await
    }

    /// App with a config tweak applied before the state is built.
    pub async fn build(
        carrier: Arc<StubCarrier>,
        configure: impl FnOnce(&mut ServerConfig),
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        configure(&mut config);

        let store = Arc::new(JsonStore::new(&config.data_dir));
        let images = Arc::new(LocalImageStorage::new(&config.upload_dir));
        let state = AppState::new(config, store, carrier, images);

        let hash = hash_password(ADMIN_PASSWORD).unwrap();
        state
            .store()
            .create_user("admin", "Administrador", Role::Admin, &hash)
            .await
            .unwrap();

        let router = vitrine_server::app(state.clone());
        Self { dir, state, router }
    }

    /// The seeded admin user.
    pub async fn admin(&self) -> User {
        self.state
            .store()
            .find_user_by_username("admin")
            .await
            .unwrap()
            .unwrap()
    }

    /// A valid token for the seeded admin.
    pub async fn admin_token(&self) -> String {
        self.state.jwt().issue(&self.admin().await).unwrap()
    }

    /// Send a request and return the status and JSON body (`Null` if the
    /// body is empty or not JSON).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(json_request(Method::GET, uri, None, None)).await
    }

    pub async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, Some(body), None))
            .await
    }

    /// Authenticated request as the seeded admin.
    pub async fn authed(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        let token = self.admin_token().await;
        self.send(json_request(method, uri, body, Some(&token)))
            .await
    }
}

/// Build a JSON request with an optional bearer token.
#[must_use]
pub fn json_request(
    method: Method,
    uri: &str,
    body: Option<&Value>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Multipart body with a single file field.
#[must_use]
pub fn multipart_request(
    uri: &str,
    token: &str,
    field: &str,
    filename: &str,
    bytes: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "vitrine-test-boundary";
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
         filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
