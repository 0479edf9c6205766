//! Admin login and session lookup.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitrine_core::UserProfile;

use crate::error::{AppError, JsonBody, Result};
use crate::middleware::RequireAdmin;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Issued token and the user it belongs to.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Handle login.
///
/// # Errors
///
/// Returns 400 for an empty username or password and 401 for wrong
/// credentials.
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let auth = AuthService::new(state.store(), state.jwt());
    let (token, user) = auth.login(form.username.trim(), &form.password).await?;

    tracing::info!(user_id = %user.id, "Admin logged in");
    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}

/// Current user profile.
///
/// # Errors
///
/// Returns 404 if the user was removed after the token was issued.
#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn me(
    RequireAdmin(claims): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>> {
    let user = AuthService::new(state.store(), state.jwt())
        .current_user(&claims)
        .await?;
    Ok(Json(user.profile()))
}
