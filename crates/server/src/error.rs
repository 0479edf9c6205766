//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; the client only ever sees
//! a JSON body of the form `{"error": "..."}`.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use vitrine_core::{PostalCodeError, ValidationError};

use crate::db::StoreError;
use crate::services::auth::AuthError;
use crate::services::shipping::ShippingError;
use crate::services::stripe::StripeError;
use crate::services::uploads::UploadError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Third-party API (Stripe, `ImgBB`) failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A feature is switched off by configuration.
    #[error("{error}")]
    ServiceUnavailable {
        error: &'static str,
        message: &'static str,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<PostalCodeError> for AppError {
    fn from(err: PostalCodeError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ShippingError> for AppError {
    fn from(err: ShippingError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<StripeError> for AppError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::Disabled => Self::ServiceUnavailable {
                error: "Stripe Integration Disabled",
                message: "A chave de API do Stripe não foi configurada no servidor (Vercel/env).",
            },
            StripeError::InvalidRequest(msg) => Self::BadRequest(msg),
            err @ (StripeError::Http(_) | StripeError::Api { .. }) => {
                Self::Upstream(err.to_string())
            }
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Missing | UploadError::TooLarge { .. } | UploadError::Extension(_) => {
                Self::BadRequest(err.to_string())
            }
            UploadError::Io(_) => Self::Internal(err.to_string()),
            UploadError::Http(_) | UploadError::Rejected(_) => Self::Upstream(err.to_string()),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Conflict(_))
            | Self::Auth(AuthError::Store(StoreError::Conflict(_))) => StatusCode::CONFLICT,
            Self::Store(_)
            | Self::Internal(_)
            | Self::Auth(AuthError::Store(_) | AuthError::PasswordHash | AuthError::TokenEncoding) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(AuthError::UserNotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match &self {
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                json!({ "error": "Internal server error" })
            }
            Self::Store(StoreError::Conflict(msg))
            | Self::Auth(AuthError::Store(StoreError::Conflict(msg)))
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg) => json!({ "error": msg }),
            Self::Upstream(_) => json!({ "error": "External service error" }),
            Self::ServiceUnavailable { error, message } => {
                json!({ "error": error, "message": message })
            }
            Self::RateLimited => json!({ "error": "Too many requests" }),
            Self::Auth(err) => json!({ "error": err.to_string() }),
            Self::Store(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
        };

        (status, Json(body)).into_response()
    }
}

/// Request body extractor. Same as `axum::Json`, but a malformed or mistyped
/// body is rejected through [`AppError`] so the client gets a JSON error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated admin.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}
