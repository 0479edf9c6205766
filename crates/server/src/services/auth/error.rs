//! Authentication error types.

use thiserror::Error;

use crate::db::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token subject no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// No `Authorization: Bearer` header.
    #[error("missing token")]
    MissingToken,

    /// Malformed token or bad signature.
    #[error("invalid token")]
    InvalidToken,

    /// Token past its `exp` claim.
    #[error("token expired")]
    TokenExpired,

    /// Signing a token failed.
    #[error("token encoding error")]
    TokenEncoding,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
