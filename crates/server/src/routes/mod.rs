//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness
//! GET    /health/ready              - Store readiness
//!
//! # Auth
//! POST   /api/auth/login            - Issue a token (rate limited)
//! GET    /api/auth/me               - Current user (auth)
//!
//! # Catalog (reads public, writes auth)
//! GET    /api/products              - List (?active=true)
//! POST   /api/products              - Create
//! GET    /api/products/{id}         - Detail
//! PUT    /api/products/{id}         - Merge update
//! DELETE /api/products/{id}         - Delete
//! GET    /api/categories            - List by order
//! POST   /api/categories            - Create
//! PUT    /api/categories/{id}       - Merge update
//! DELETE /api/categories/{id}       - Delete
//! GET    /api/banners               - List by order
//! POST   /api/banners               - Create
//! PUT    /api/banners/{id}          - Merge update
//! DELETE /api/banners/{id}          - Delete
//! GET    /api/settings              - Site settings
//! PUT    /api/settings              - Shallow merge
//!
//! # Admin
//! POST   /api/upload                - Multipart image upload
//! GET    /api/dashboard/stats       - Catalog counters
//!
//! # Shipping
//! POST   /api/shipping/calculate    - Cart shipping options
//!
//! # Stripe (503 when no key is configured)
//! POST   /api/stripe/platform-checkout
//! POST   /api/stripe/account
//! POST   /api/stripe/account_link
//! GET    /api/stripe/account/{id}
//! POST   /api/stripe/product
//! GET    /api/stripe/products/{account_id}
//! POST   /api/stripe/checkout
//!
//! GET    /images/*                  - Locally stored uploads
//! ```

pub mod auth;
pub mod banners;
pub mod categories;
pub mod dashboard;
pub mod products;
pub mod settings;
pub mod shipping;
pub mod stripe;
pub mod upload;

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post, put},
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::config::MAX_UPLOAD_BYTES;
use crate::middleware::{auth_rate_limiter, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Multipart framing allowance on top of the image itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// `{"message": ...}` body returned by deletes.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        // Only routes added above this line are limited
        .layer(auth_rate_limiter())
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route(
            "/{id}",
            put(categories::update).delete(categories::destroy),
        )
}

/// Create the banner routes router.
pub fn banner_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banners::index).post(banners::create))
        .route("/{id}", put(banners::update).delete(banners::destroy))
}

/// Create the Stripe routes router.
pub fn stripe_routes() -> Router<AppState> {
    Router::new()
        .route("/platform-checkout", post(stripe::platform_checkout))
        .route("/account", post(stripe::create_account))
        .route("/account_link", post(stripe::create_account_link))
        .route("/account/{id}", get(stripe::account_status))
        .route("/product", post(stripe::create_product))
        .route("/products/{account_id}", get(stripe::list_products))
        .route("/checkout", post(stripe::checkout))
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        .nest("/api/categories", category_routes())
        .nest("/api/banners", banner_routes())
        .route("/api/settings", get(settings::show).put(settings::update))
        .route(
            "/api/upload",
            post(upload::upload)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(
                    MAX_UPLOAD_BYTES + UPLOAD_OVERHEAD_BYTES,
                )),
        )
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route("/api/shipping/calculate", post(shipping::calculate))
        .nest("/api/stripe", stripe_routes())
}

/// Build the complete application router with its middleware stack.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/images", ServeDir::new(&config.upload_dir));

    if let Some(static_dir) = &config.static_dir {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        #[allow(clippy::cast_possible_truncation)]
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the catalog store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store().backend(), "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
