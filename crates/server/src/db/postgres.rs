//! `PostgreSQL` catalog store.
//!
//! Queries are built at runtime (no `query!` macros) so the crate compiles
//! without a live database. Variants and image galleries are JSONB columns;
//! settings are a single `config` JSONB row with `id = 1`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use vitrine_core::{
    Banner, BannerId, BannerInput, BannerPatch, Category, CategoryId, CategoryInput,
    CategoryPatch, Product, ProductId, ProductInput, ProductPatch, Role, Settings, User, UserId,
    Variant,
};

use super::{CatalogStore, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, price, old_price, image, images, category, stock, \
    badge, active, variants, rating, reviews, description, created_at, updated_at";

const CATEGORY_COLUMNS: &str = r#"id, name, icon, link, "order""#;

const BANNER_COLUMNS: &str = r#"id, image, title, subtitle, link, "order", active"#;

const USER_COLUMNS: &str = "id, username, password, name, role";

/// Catalog store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Write every column of `product` (used after a merge in Rust).
    async fn save_product<'e, E>(executor: E, product: &Product) -> Result<(), sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            "UPDATE products SET name = $2, price = $3, old_price = $4, image = $5, \
             images = $6, category = $7, stock = $8, badge = $9, active = $10, \
             variants = $11, rating = $12, reviews = $13, description = $14, \
             updated_at = $15 WHERE id = $1",
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
        .bind(product.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let images: Json<Vec<String>> = row.try_get("images")?;
    let variants: Json<Vec<Variant>> = row.try_get("variants")?;
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        old_price: row.try_get("old_price")?,
        image: row.try_get("image")?,
        images: images.0,
        category: row.try_get("category")?,
        stock: row.try_get("stock")?,
        badge: row.try_get("badge")?,
        active: row.try_get("active")?,
        variants: variants.0,
        rating: row.try_get("rating")?,
        reviews: row.try_get("reviews")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        icon: row.try_get("icon")?,
        link: row.try_get("link")?,
        order: row.try_get("order")?,
    })
}

fn banner_from_row(row: &PgRow) -> Result<Banner, sqlx::Error> {
    Ok(Banner {
        id: row.try_get("id")?,
        image: row.try_get("image")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        link: row.try_get("link")?,
        order: row.try_get("order")?,
        active: row.try_get("active")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password")?,
        name: row.try_get("name")?,
        role: role
            .parse::<Role>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
    })
}

/// Map a unique-constraint violation to [`StoreError::Conflict`].
fn conflict_or(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message()),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(product_from_row)
            .collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(product_from_row).transpose()?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_product(&self, input: ProductInput) -> Result<Product, StoreError> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, price, old_price, image, images, category, stock, \
             badge, active, variants, rating, reviews, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.price)
        .bind(input.old_price)
        .bind(&input.image)
        .bind(Json(&input.images))
        .bind(&input.category)
        .bind(input.stock)
        .bind(input.badge.as_deref().filter(|b| !b.is_empty()))
        .bind(input.active)
        .bind(Json(&input.variants))
        .bind(input.rating)
        .bind(input.reviews)
        .bind(&input.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(product_from_row(&row)?)
    }

    #[instrument(skip(self, patch))]
    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut product = product_from_row(&row)?;
        patch.apply(&mut product, Utc::now());
        Self::save_product(&mut *tx, &product).await?;
        tx.commit().await?;
        Ok(Some(product))
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY "order", id"#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(category_from_row)
            .collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        // Order is filled in by the INSERT below.
        let category = input.into_category(0);
        let row = sqlx::query(&format!(
            r#"INSERT INTO categories (id, name, icon, link, "order")
               VALUES ($1, $2, $3, $4, (SELECT COUNT(*)::INT + 1 FROM categories))
               RETURNING {CATEGORY_COLUMNS}"#
        ))
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.link)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, || format!("category '{}' already exists", category.id)))?;
        Ok(category_from_row(&row)?)
    }

    #[instrument(skip(self, patch))]
    async fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut category = category_from_row(&row)?;
        patch.apply(&mut category);
        sqlx::query(
            r#"UPDATE categories SET name = $2, icon = $3, link = $4, "order" = $5 WHERE id = $1"#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.link)
        .bind(category.order)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(category))
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: &CategoryId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Banners
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_banners(&self) -> Result<Vec<Banner>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {BANNER_COLUMNS} FROM banners ORDER BY "order", id"#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(banner_from_row).collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self, input))]
    async fn create_banner(&self, input: BannerInput) -> Result<Banner, StoreError> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO banners (image, title, subtitle, link, "order", active)
               VALUES ($1, $2, $3, $4, (SELECT COUNT(*)::INT + 1 FROM banners), $5)
               RETURNING {BANNER_COLUMNS}"#
        ))
        .bind(&input.image)
        .bind(&input.title)
        .bind(&input.subtitle)
        .bind(&input.link)
        .bind(input.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(banner_from_row(&row)?)
    }

    #[instrument(skip(self, patch))]
    async fn update_banner(
        &self,
        id: BannerId,
        patch: BannerPatch,
    ) -> Result<Option<Banner>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {BANNER_COLUMNS} FROM banners WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut banner = banner_from_row(&row)?;
        patch.apply(&mut banner);
        sqlx::query(
            r#"UPDATE banners SET image = $2, title = $3, subtitle = $4, link = $5,
               "order" = $6, active = $7 WHERE id = $1"#,
        )
        .bind(banner.id)
        .bind(&banner.image)
        .bind(&banner.title)
        .bind(&banner.subtitle)
        .bind(&banner.link)
        .bind(banner.order)
        .bind(banner.active)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(banner))
    }

    #[instrument(skip(self))]
    async fn delete_banner(&self, id: BannerId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    #[instrument(skip(self))]
    async fn get_settings(&self) -> Result<Settings, StoreError> {
        let config: Option<Json<Settings>> =
            sqlx::query_scalar("SELECT config FROM settings WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(config.map(|c| c.0).unwrap_or_default())
    }

    #[instrument(skip(self, patch), fields(keys = patch.len()))]
    async fn merge_settings(&self, patch: Settings) -> Result<Settings, StoreError> {
        // jsonb `||` replaces top-level keys, matching the shallow merge.
        let config: Json<Settings> = sqlx::query_scalar(
            "INSERT INTO settings (id, config) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET config = settings.config || EXCLUDED.config \
             RETURNING config",
        )
        .bind(Json(&patch))
        .fetch_one(&self.pool)
        .await?;
        Ok(config.0)
    }

    // =========================================================================
    // Users
    // =========================================================================

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    #[instrument(skip(self, password_hash))]
    async fn create_user(
        &self,
        username: &str,
        name: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (username, password, name, role) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(password_hash)
        .bind(name)
        .bind(role.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, || format!("user '{username}' already exists")))?;
        Ok(user_from_row(&row)?)
    }

    #[instrument(skip(self, password_hash))]
    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET password = $2 WHERE username = $1")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
