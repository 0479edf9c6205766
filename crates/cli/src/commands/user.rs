//! Admin user management.
//!
//! # Usage
//!
//! ```bash
//! # Reset an existing user's password (prompted on stdin)
//! vitrine user set-password -u admin
//!
//! # Create the first admin
//! vitrine user set-password -u admin -p 'long passphrase' --create
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string; without it the JSON
//!   data directory is updated

use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use vitrine_core::Role;
use vitrine_server::db::{CatalogStore, JsonStore, PgStore, StoreError, create_pool};
use vitrine_server::services::auth::{AuthError, hash_password};

const MIN_PASSWORD_LEN: usize = 8;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid role: {0}. Valid roles: admin, editor")]
    InvalidRole(String),

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("User not found: {0} (pass --create to add it)")]
    NotFound(String),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),
}

/// Arguments of `user set-password`.
pub struct SetPassword {
    pub username: String,
    pub password: Option<String>,
    pub create: bool,
    pub name: String,
    pub role: String,
    pub data_dir: PathBuf,
}

/// What `set-password` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Updated,
    Created,
}

/// Hash and store a password, creating the user if asked to.
pub async fn set_password(options: SetPassword) -> Result<(), UserError> {
    let role: Role = options
        .role
        .parse()
        .map_err(|_| UserError::InvalidRole(options.role.clone()))?;

    let password = match options.password {
        Some(password) => password,
        None => read_password().await?,
    };

    let store: Box<dyn CatalogStore> = match super::database_url() {
        Some(url) => {
            tracing::info!("Connecting to database...");
            Box::new(PgStore::new(create_pool(&url).await?))
        }
        None => {
            tracing::info!(dir = %options.data_dir.display(), "Using JSON data directory");
            Box::new(JsonStore::new(&options.data_dir))
        }
    };

    let outcome = apply(
        store.as_ref(),
        &options.username,
        &password,
        options.create.then_some((options.name.as_str(), role)),
    )
    .await?;

    match outcome {
        Outcome::Updated => tracing::info!(username = %options.username, "Password updated"),
        Outcome::Created => tracing::info!(username = %options.username, %role, "User created"),
    }
    Ok(())
}

/// Store `password` for `username`. With `create`, a missing user is added
/// with the given name and role.
pub async fn apply(
    store: &dyn CatalogStore,
    username: &str,
    password: &str,
    create: Option<(&str, Role)>,
) -> Result<Outcome, UserError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserError::WeakPassword);
    }

    let hash = hash_password(password)?;
    if store.set_password(username, &hash).await? {
        return Ok(Outcome::Updated);
    }

    let (name, role) = create.ok_or_else(|| UserError::NotFound(username.to_owned()))?;
    store.create_user(username, name, role, &hash).await?;
    Ok(Outcome::Created)
}

async fn read_password() -> Result<String, UserError> {
    tracing::info!("Reading password from stdin");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_server::services::auth::verify_password;

    #[tokio::test]
    async fn test_creates_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let outcome = apply(&store, "admin", "first-pass-123", Some(("Admin", Role::Admin)))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Created);

        let outcome = apply(&store, "admin", "second-pass-456", None).await.unwrap();
        assert_eq!(outcome, Outcome::Updated);

        let user = store.find_user_by_username("admin").await.unwrap().unwrap();
        assert!(verify_password("second-pass-456", &user.password_hash).is_ok());
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_missing_user_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(matches!(
            apply(&store, "ghost", "long-enough-pw", None).await,
            Err(UserError::NotFound(name)) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_rejects_short_password() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(matches!(
            apply(&store, "admin", "short", Some(("Admin", Role::Admin))).await,
            Err(UserError::WeakPassword)
        ));
    }
}
