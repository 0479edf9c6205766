//! Catalog persistence.
//!
//! Handlers talk to a [`CatalogStore`] trait object. Three backends exist:
//!
//! - [`JsonStore`] - one JSON file per collection in a data directory
//!   (`products.json`, `categories.json`, `banners.json`, `settings.json`,
//!   `users.json`). Used on its own when no database is configured.
//! - [`PgStore`] - `PostgreSQL` via `sqlx`.
//! - [`FallbackStore`] - `PgStore` as primary with the JSON directory as a
//!   read-only fallback when the database errors.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p vitrine-cli -- migrate
//! ```

mod fallback;
mod json;
mod postgres;

pub use fallback::FallbackStore;
pub use json::{CatalogSnapshot, JsonStore};
pub use postgres::PgStore;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use vitrine_core::{
    Banner, BannerId, BannerInput, BannerPatch, Category, CategoryId, CategoryInput,
    CategoryPatch, Product, ProductId, ProductInput, ProductPatch, Role, Settings, User, UserId,
};

/// Errors from any catalog backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reading or writing a data file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A data file holds JSON that does not match the expected shape.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Unique constraint violation (e.g. duplicate category id or username).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Catalog and user persistence used by the route handlers.
///
/// `update_*` return `None` when the record does not exist. `delete_*`
/// return whether a record was removed; deleting a missing id is not an
/// error.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    async fn create_product(&self, input: ProductInput) -> Result<Product, StoreError>;
    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError>;
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn create_category(&self, input: CategoryInput) -> Result<Category, StoreError>;
    async fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, StoreError>;
    async fn delete_category(&self, id: &CategoryId) -> Result<bool, StoreError>;

    async fn list_banners(&self) -> Result<Vec<Banner>, StoreError>;
    async fn create_banner(&self, input: BannerInput) -> Result<Banner, StoreError>;
    async fn update_banner(
        &self,
        id: BannerId,
        patch: BannerPatch,
    ) -> Result<Option<Banner>, StoreError>;
    async fn delete_banner(&self, id: BannerId) -> Result<bool, StoreError>;

    async fn get_settings(&self) -> Result<Settings, StoreError>;
    /// Shallow-merge `patch` into the stored settings and return the result.
    async fn merge_settings(&self, patch: Settings) -> Result<Settings, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    /// Create a user. Fails with [`StoreError::Conflict`] if the username is taken.
    async fn create_user(
        &self,
        username: &str,
        name: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<User, StoreError>;
    /// Replace a user's password hash. Returns `false` if no such user.
    async fn set_password(&self, username: &str, password_hash: &str)
    -> Result<bool, StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
