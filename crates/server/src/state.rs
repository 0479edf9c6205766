//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::{self, CatalogStore, FallbackStore, JsonStore, PgStore};
use crate::services::auth::JwtKeys;
use crate::services::shipping::{CarrierQuoter, CorreiosClient, ShippingResolver};
use crate::services::stripe::StripeClient;
use crate::services::uploads::{ImageStorage, ImgbbStorage, LocalImageStorage};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the catalog store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn CatalogStore>,
    jwt: JwtKeys,
    shipping: ShippingResolver,
    images: Arc<dyn ImageStorage>,
    stripe: Option<StripeClient>,
}

impl AppState {
    /// Create a new application state from already-built backends.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn CatalogStore>,
        carrier: Arc<dyn CarrierQuoter>,
        images: Arc<dyn ImageStorage>,
    ) -> Self {
        let jwt = JwtKeys::new(&config.jwt.secret, config.jwt.expiration_hours);
        let shipping = ShippingResolver::new(carrier, config.shipping.clone());
        let stripe = config
            .stripe
            .as_ref()
            .map(|stripe| StripeClient::new(stripe, &config.base_url));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                jwt,
                shipping,
                images,
                stripe,
            }),
        }
    }

    /// Build the state from configuration, connecting to `PostgreSQL` when
    /// `DATABASE_URL` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database pool cannot be created.
    pub async fn from_config(config: ServerConfig) -> Result<Self, StateError> {
        let json = JsonStore::new(&config.data_dir);
        let store: Arc<dyn CatalogStore> = match &config.database_url {
            Some(url) => {
                let pool = db::create_pool(url).await?;
                Arc::new(FallbackStore::new(PgStore::new(pool), json))
            }
            None => Arc::new(json),
        };

        let carrier = Arc::new(CorreiosClient::new(config.shipping.correios_url.clone()));

        let images: Arc<dyn ImageStorage> = match &config.imgbb {
            Some(imgbb) => Arc::new(ImgbbStorage::new(imgbb)),
            None => Arc::new(LocalImageStorage::new(&config.upload_dir)),
        };

        Ok(Self::new(config, store, carrier, images))
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog store.
    #[must_use]
    pub fn store(&self) -> &dyn CatalogStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the token keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    #[must_use]
    pub fn shipping(&self) -> &ShippingResolver {
        &self.inner.shipping
    }

    #[must_use]
    pub fn images(&self) -> &dyn ImageStorage {
        self.inner.images.as_ref()
    }

    /// Stripe client, `None` when no usable key is configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }
}
