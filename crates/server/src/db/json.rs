//! JSON-directory catalog store.
//!
//! Each collection lives in its own pretty-printed file. Reads are lenient:
//! a missing or unparseable file reads as empty and logs a warning, so a
//! fresh checkout serves an empty catalog. Read-modify-write cycles hold a
//! mutex and load strictly, so a corrupted file is reported instead of
//! being overwritten with an empty collection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{instrument, warn};

use vitrine_core::{
    Banner, BannerId, BannerInput, BannerPatch, Category, CategoryId, CategoryInput,
    CategoryPatch, Product, ProductId, ProductInput, ProductPatch, Role, Settings, User, UserId,
    merge_settings,
};

use super::{CatalogStore, StoreError};

const PRODUCTS: &str = "products.json";
const CATEGORIES: &str = "categories.json";
const BANNERS: &str = "banners.json";
const SETTINGS: &str = "settings.json";
const USERS: &str = "users.json";

/// Full contents of a data directory.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub banners: Vec<Banner>,
    pub settings: Settings,
    pub users: Vec<User>,
}

/// Catalog store backed by a directory of JSON files.
pub struct JsonStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open a store rooted at `dir`. The directory is not created or checked
    /// here; see [`CatalogStore::ping`].
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory the files live in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every collection strictly, for bulk export and import.
    ///
    /// # Errors
    ///
    /// Returns an error if any existing file cannot be read or parsed.
    pub async fn snapshot(&self) -> Result<CatalogSnapshot, StoreError> {
        Ok(CatalogSnapshot {
            products: self.load_strict(PRODUCTS).await?,
            categories: self.load_strict(CATEGORIES).await?,
            banners: self.load_strict(BANNERS).await?,
            settings: self.load_strict(SETTINGS).await?,
            users: self.load_strict(USERS).await?,
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Load a file, treating absence as `T::default()`.
    async fn load_strict<T>(&self, file: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path, source })
    }

    /// Load a file, logging and returning `T::default()` on any failure.
    async fn load_lenient<T>(&self, file: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load_strict(file).await {
            Ok(value) => value,
            Err(e) => {
                warn!(file, error = %e, "Data file unreadable, serving empty");
                T::default()
            }
        }
    }

    /// Write pretty JSON to a temp file and rename it over the target.
    async fn save<T: Serialize + Sync>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path(file);
        let tmp = self.path(&format!(".{file}.tmp"));
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }
}

/// Convert a collection length to an `order` position.
fn next_order(len: usize) -> i32 {
    i32::try_from(len).map_or(i32::MAX, |n| n.saturating_add(1))
}

#[async_trait]
impl CatalogStore for JsonStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let meta = tokio::fs::metadata(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Io {
                path: self.dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            })
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.load_lenient(PRODUCTS).await)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let products: Vec<Product> = self.load_lenient(PRODUCTS).await;
        Ok(products.into_iter().find(|p| p.id == id))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_product(&self, input: ProductInput) -> Result<Product, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut products: Vec<Product> = self.load_strict(PRODUCTS).await?;
        let id = ProductId::next_after(products.iter().map(|p| p.id));
        let product = input.into_product(id, Utc::now());
        products.push(product.clone());
        self.save(PRODUCTS, &products).await?;
        Ok(product)
    }

    #[instrument(skip(self, patch))]
    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut products: Vec<Product> = self.load_strict(PRODUCTS).await?;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        patch.apply(product, Utc::now());
        let updated = product.clone();
        self.save(PRODUCTS, &products).await?;
        Ok(Some(updated))
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut products: Vec<Product> = self.load_strict(PRODUCTS).await?;
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Ok(false);
        }
        self.save(PRODUCTS, &products).await?;
        Ok(true)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.load_lenient(CATEGORIES).await)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut categories: Vec<Category> = self.load_strict(CATEGORIES).await?;
        let category = input.into_category(next_order(categories.len()));
        if categories.iter().any(|c| c.id == category.id) {
            return Err(StoreError::Conflict(format!(
                "category '{}' already exists",
                category.id
            )));
        }
        categories.push(category.clone());
        self.save(CATEGORIES, &categories).await?;
        Ok(category)
    }

    #[instrument(skip(self, patch))]
    async fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut categories: Vec<Category> = self.load_strict(CATEGORIES).await?;
        let Some(category) = categories.iter_mut().find(|c| &c.id == id) else {
            return Ok(None);
        };
        patch.apply(category);
        let updated = category.clone();
        self.save(CATEGORIES, &categories).await?;
        Ok(Some(updated))
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: &CategoryId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut categories: Vec<Category> = self.load_strict(CATEGORIES).await?;
        let before = categories.len();
        categories.retain(|c| &c.id != id);
        if categories.len() == before {
            return Ok(false);
        }
        self.save(CATEGORIES, &categories).await?;
        Ok(true)
    }

    // =========================================================================
    // Banners
    // =========================================================================

    async fn list_banners(&self) -> Result<Vec<Banner>, StoreError> {
        Ok(self.load_lenient(BANNERS).await)
    }

    #[instrument(skip(self, input))]
    async fn create_banner(&self, input: BannerInput) -> Result<Banner, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut banners: Vec<Banner> = self.load_strict(BANNERS).await?;
        let id = BannerId::next_after(banners.iter().map(|b| b.id));
        let banner = input.into_banner(id, next_order(banners.len()));
        banners.push(banner.clone());
        self.save(BANNERS, &banners).await?;
        Ok(banner)
    }

    #[instrument(skip(self, patch))]
    async fn update_banner(
        &self,
        id: BannerId,
        patch: BannerPatch,
    ) -> Result<Option<Banner>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut banners: Vec<Banner> = self.load_strict(BANNERS).await?;
        let Some(banner) = banners.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        patch.apply(banner);
        let updated = banner.clone();
        self.save(BANNERS, &banners).await?;
        Ok(Some(updated))
    }

    #[instrument(skip(self))]
    async fn delete_banner(&self, id: BannerId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut banners: Vec<Banner> = self.load_strict(BANNERS).await?;
        let before = banners.len();
        banners.retain(|b| b.id != id);
        if banners.len() == before {
            return Ok(false);
        }
        self.save(BANNERS, &banners).await?;
        Ok(true)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    async fn get_settings(&self) -> Result<Settings, StoreError> {
        Ok(self.load_lenient(SETTINGS).await)
    }

    #[instrument(skip(self, patch), fields(keys = patch.len()))]
    async fn merge_settings(&self, patch: Settings) -> Result<Settings, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut settings: Settings = self.load_strict(SETTINGS).await?;
        merge_settings(&mut settings, patch);
        self.save(SETTINGS, &settings).await?;
        Ok(settings)
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users: Vec<User> = self.load_lenient(USERS).await;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let users: Vec<User> = self.load_lenient(USERS).await;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    #[instrument(skip(self, password_hash))]
    async fn create_user(
        &self,
        username: &str,
        name: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut users: Vec<User> = self.load_strict(USERS).await?;
        if users.iter().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!(
                "user '{username}' already exists"
            )));
        }
        let user = User {
            id: UserId::next_after(users.iter().map(|u| u.id)),
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            name: name.to_owned(),
            role,
        };
        users.push(user.clone());
        self.save(USERS, &users).await?;
        Ok(user)
    }

    #[instrument(skip(self, password_hash))]
    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut users: Vec<User> = self.load_strict(USERS).await?;
        let Some(user) = users.iter_mut().find(|u| u.username == username) else {
            return Ok(false);
        };
        password_hash.clone_into(&mut user.password_hash);
        self.save(USERS, &users).await?;
        Ok(true)
    }
}
