//! JSON data directory import.
//!
//! Upserts every collection into `PostgreSQL` by id inside one transaction,
//! replaces the settings row, then moves the id sequences past the imported
//! rows so new records do not collide.
//!
//! # Usage
//!
//! ```bash
//! vitrine import --data-dir data
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use std::path::Path;

use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use vitrine_core::{Banner, Category, Product, User};
use vitrine_server::db::{JsonStore, StoreError, create_pool};

/// Errors that can occur during import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Import `data_dir` into the database.
pub async fn run(data_dir: &Path) -> Result<(), ImportError> {
    let database_url = super::database_url().ok_or(ImportError::MissingEnvVar("DATABASE_URL"))?;
    let snapshot = JsonStore::new(data_dir).snapshot().await?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;
    let mut tx = pool.begin().await?;

    for category in &snapshot.categories {
        upsert_category(&mut tx, category).await?;
    }
    tracing::info!(count = snapshot.categories.len(), "Categories imported");

    for product in &snapshot.products {
        upsert_product(&mut tx, product).await?;
    }
    tracing::info!(count = snapshot.products.len(), "Products imported");

    for banner in &snapshot.banners {
        upsert_banner(&mut tx, banner).await?;
    }
    tracing::info!(count = snapshot.banners.len(), "Banners imported");

    for user in &snapshot.users {
        upsert_user(&mut tx, user).await?;
    }
    tracing::info!(count = snapshot.users.len(), "Users imported");

    if !snapshot.settings.is_empty() {
        sqlx::query(
            "INSERT INTO settings (id, config) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET config = EXCLUDED.config",
        )
        .bind(Json(&snapshot.settings))
        .execute(&mut *tx)
        .await?;
        tracing::info!("Settings imported");
    }

    for table in ["products", "banners", "users"] {
        sqlx::query(&format!(
            "SELECT setval('{table}_id_seq', COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
        ))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!("Import complete!");
    Ok(())
}

async fn upsert_category(
    tx: &mut Transaction<'_, Postgres>,
    category: &Category,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO categories (id, name, icon, link, "order") VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, icon = EXCLUDED.icon,
           link = EXCLUDED.link, "order" = EXCLUDED."order""#,
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.icon)
    .bind(&category.link)
    .bind(category.order)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_product(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO products (id, name, price, old_price, image, images, category, stock, \
         badge, active, variants, rating, reviews, description, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, price = EXCLUDED.price, \
         old_price = EXCLUDED.old_price, image = EXCLUDED.image, images = EXCLUDED.images, \
         category = EXCLUDED.category, stock = EXCLUDED.stock, badge = EXCLUDED.badge, \
         active = EXCLUDED.active, variants = EXCLUDED.variants, rating = EXCLUDED.rating, \
         reviews = EXCLUDED.reviews, description = EXCLUDED.description, \
         created_at = EXCLUDED.created_at, updated_at = EXCLUDED.updated_at",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.old_price)
    .bind(&product.image)
    .bind(Json(&product.images))
    .bind(&product.category)
    .bind(product.stock)
    .bind(&product.badge)
    .bind(product.active)
    .bind(Json(&product.variants))
    .bind(product.rating)
    .bind(product.reviews)
    .bind(&product.description)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_banner(
    tx: &mut Transaction<'_, Postgres>,
    banner: &Banner,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO banners (id, image, title, subtitle, link, "order", active)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           ON CONFLICT (id) DO UPDATE SET image = EXCLUDED.image, title = EXCLUDED.title,
           subtitle = EXCLUDED.subtitle, link = EXCLUDED.link, "order" = EXCLUDED."order",
           active = EXCLUDED.active"#,
    )
    .bind(banner.id)
    .bind(&banner.image)
    .bind(&banner.title)
    .bind(&banner.subtitle)
    .bind(&banner.link)
    .bind(banner.order)
    .bind(banner.active)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_user(tx: &mut Transaction<'_, Postgres>, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, username, password, name, role) VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username, \
         password = EXCLUDED.password, name = EXCLUDED.name, role = EXCLUDED.role",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.to_string())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
