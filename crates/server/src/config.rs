//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `VITRINE_HOST` - Bind address (default: 127.0.0.1)
//! - `VITRINE_PORT` - Listen port (default: 3001)
//! - `VITRINE_BASE_URL` - Public URL used for checkout return links
//!   (default: `http://localhost:3001`)
//! - `VITRINE_DATA_DIR` - JSON catalog directory (default: `data`)
//! - `VITRINE_UPLOAD_DIR` - Local image directory (default: `images`)
//! - `VITRINE_STATIC_DIR` - Storefront static files to serve at `/`
//! - `JWT_EXPIRATION_HOURS` - Token lifetime (default: 24)
//! - `DATABASE_URL` - `PostgreSQL` connection string; enables the database
//!   store with the JSON directory as read fallback
//! - `IMGBB_API_KEY` - Upload images to `ImgBB` instead of local disk
//! - `STRIPE_SECRET_KEY` - Enables `/api/stripe/*`
//! - `STRIPE_APPLICATION_FEE_CENTS` - Fee on connected-account checkouts (default: 123)
//! - `SHIPPING_ORIGIN_CEP` - Carrier origin postal code (default: 01001000)
//! - `SHIPPING_TIMEOUT_MS` - Carrier quote timeout (default: 4000)
//! - `SHIPPING_FREE_THRESHOLD` - Free shipping subtotal in BRL (default: 999)
//! - `CORREIOS_URL` - Carrier price calculator endpoint
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Correios price/lead-time calculator.
pub const CORREIOS_URL: &str = "https://ws.correios.com.br/calculador/CalcPrecoPrazo.aspx";

/// Default `ImgBB` upload endpoint.
pub const IMGBB_URL: &str = "https://api.imgbb.com/1/upload";

/// Default Stripe REST base URL.
pub const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

/// Maximum accepted image upload (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Directory holding `products.json`, `categories.json`, ...
    pub data_dir: PathBuf,
    /// Directory for locally stored uploads, served at `/images`
    pub upload_dir: PathBuf,
    /// Optional storefront static files
    pub static_dir: Option<PathBuf>,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Token signing
    pub jwt: JwtConfig,
    /// Shipping estimator settings
    pub shipping: ShippingConfig,
    /// Stripe integration, `None` when disabled
    pub stripe: Option<StripeConfig>,
    /// `ImgBB` image hosting, `None` for local disk
    pub imgbb: Option<ImgbbConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
}

/// JWT signing configuration.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub expiration_hours: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expiration_hours", &self.expiration_hours)
            .finish()
    }
}

/// Shipping estimator configuration.
#[derive(Debug, Clone)]
pub struct ShippingConfig {
    /// Postal code parcels ship from
    pub origin_cep: String,
    /// Upper bound on the live carrier query
    pub timeout: Duration,
    /// Cart subtotal at or above which a free option is offered
    pub free_threshold: Decimal,
    /// Carrier calculator endpoint
    pub correios_url: String,
    /// How long identical live quotes are reused
    pub quote_cache_ttl: Duration,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            origin_cep: "01001000".to_owned(),
            timeout: Duration::from_millis(4000),
            free_threshold: Decimal::from(999),
            correios_url: CORREIOS_URL.to_owned(),
            quote_cache_ttl: Duration::from_secs(600),
        }
    }
}

/// Stripe configuration.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub application_fee_cents: i64,
    pub api_url: String,
}

impl StripeConfig {
    /// Whether the key is a live-mode key.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_live")
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("application_fee_cents", &self.application_fee_cents)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// `ImgBB` configuration.
#[derive(Clone)]
pub struct ImgbbConfig {
    pub api_key: SecretString,
    pub upload_url: String,
}

impl std::fmt::Debug for ImgbbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgbbConfig")
            .field("api_key", &"[REDACTED]")
            .field("upload_url", &self.upload_url)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_parsed("VITRINE_HOST", "127.0.0.1")?;
        let port = get_parsed("VITRINE_PORT", "3001")?;
        let base_url = get_env_or_default("VITRINE_BASE_URL", "http://localhost:3001")
            .trim_end_matches('/')
            .to_owned();

        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;
        let jwt = JwtConfig {
            secret: jwt_secret,
            expiration_hours: get_parsed("JWT_EXPIRATION_HOURS", "24")?,
        };

        let defaults = ShippingConfig::default();
        let shipping = ShippingConfig {
            origin_cep: get_env_or_default("SHIPPING_ORIGIN_CEP", &defaults.origin_cep),
            timeout: Duration::from_millis(get_parsed("SHIPPING_TIMEOUT_MS", "4000")?),
            free_threshold: get_parsed("SHIPPING_FREE_THRESHOLD", "999")?,
            correios_url: get_env_or_default("CORREIOS_URL", CORREIOS_URL),
            quote_cache_ttl: defaults.quote_cache_ttl,
        };

        let stripe = match get_optional_env("STRIPE_SECRET_KEY") {
            Some(key) if stripe_key_usable(&key) => Some(StripeConfig {
                secret_key: SecretString::from(key),
                application_fee_cents: get_parsed("STRIPE_APPLICATION_FEE_CENTS", "123")?,
                api_url: get_env_or_default("STRIPE_API_URL", STRIPE_API_URL),
            }),
            _ => None,
        };

        let imgbb = get_optional_env("IMGBB_API_KEY").map(|key| ImgbbConfig {
            api_key: SecretString::from(key),
            upload_url: get_env_or_default("IMGBB_URL", IMGBB_URL),
        });

        let log_format = match get_optional_env("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            host,
            port,
            base_url,
            data_dir: PathBuf::from(get_env_or_default("VITRINE_DATA_DIR", "data")),
            upload_dir: PathBuf::from(get_env_or_default("VITRINE_UPLOAD_DIR", "images")),
            static_dir: get_optional_env("VITRINE_STATIC_DIR").map(PathBuf::from),
            database_url: get_optional_env("DATABASE_URL").map(SecretString::from),
            jwt,
            shipping,
            stripe,
            imgbb,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            log_format,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// A Stripe key counts as configured unless it is empty or still the
/// `PLACEHOLDER` value from the sample `.env`.
#[must_use]
pub fn stripe_key_usable(key: &str) -> bool {
    !key.trim().is_empty() && !key.contains("PLACEHOLDER")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-secret-goes-here", "JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "JWT_SECRET");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_stripe_key_usable() {
        assert!(stripe_key_usable("sk_test_51abc"));
        assert!(!stripe_key_usable(""));
        assert!(!stripe_key_usable("sk_test_PLACEHOLDER"));
    }

    #[test]
    fn test_shipping_defaults() {
        let shipping = ShippingConfig::default();
        assert_eq!(shipping.origin_cep, "01001000");
        assert_eq!(shipping.timeout, Duration::from_millis(4000));
        assert_eq!(shipping.free_threshold, Decimal::from(999));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let jwt = JwtConfig {
            secret: SecretString::from("super_secret_signing_key"),
            expiration_hours: 24,
        };
        let stripe = StripeConfig {
            secret_key: SecretString::from("sk_live_abcdef"),
            application_fee_cents: 123,
            api_url: STRIPE_API_URL.to_owned(),
        };
        let output = format!("{jwt:?} {stripe:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super_secret_signing_key"));
        assert!(!output.contains("sk_live_abcdef"));
        assert!(stripe.is_live());
    }
}
