//! Product and banner image uploads.
//!
//! Images land either on local disk (served back under `/images`) or on
//! `ImgBB` when an API key is configured, for deployments with a read-only
//! filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::{ImgbbConfig, MAX_UPLOAD_BYTES};

/// Accepted image extensions (lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Errors that can occur while storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The multipart body had no `image` field.
    #[error("no image uploaded")]
    Missing,

    #[error("image exceeds the {max} byte limit")]
    TooLarge { max: usize },

    #[error("unsupported image type: {0}")]
    Extension(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The image host answered but refused the file.
    #[error("image host rejected upload: {0}")]
    Rejected(String),
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    pub filename: String,
    /// Value to store on a product or banner (`images/<file>` or a hosted URL).
    pub path: String,
    /// Absolute or root-relative URL the browser can load.
    pub url: String,
}

/// Image storage backend.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Validate and store an image.
    async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredImage, UploadError>;
}

/// Check size and extension, returning the stored file name:
/// `<unix_millis>_<original name with whitespace replaced by '_'>`.
///
/// # Errors
///
/// Returns `UploadError::TooLarge` or `UploadError::Extension`.
pub fn validate(original_name: &str, len: usize) -> Result<String, UploadError> {
    if len > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            max: MAX_UPLOAD_BYTES,
        });
    }

    // Drop any directory part a client may have sent.
    let base = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let extension = Path::new(base)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadError::Extension(if extension.is_empty() {
            "(none)".to_string()
        } else {
            extension
        }));
    }

    let sanitized: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    Ok(format!("{}_{sanitized}", Utc::now().timestamp_millis()))
}

// =============================================================================
// Local disk
// =============================================================================

/// Stores uploads in a directory served at `/images`.
pub struct LocalImageStorage {
    dir: PathBuf,
}

impl LocalImageStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    fn backend(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredImage, UploadError> {
        let filename = validate(original_name, bytes.len())?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        info!(%filename, "Image stored on disk");
        Ok(StoredImage {
            path: format!("images/{filename}"),
            url: format!("/images/{filename}"),
            filename,
        })
    }
}

// =============================================================================
// ImgBB
// =============================================================================

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgbbImage>,
    error: Option<ImgbbFailure>,
}

#[derive(Debug, Deserialize)]
struct ImgbbImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImgbbFailure {
    message: String,
}

/// Uploads images to `ImgBB` as base64 form posts.
pub struct ImgbbStorage {
    client: reqwest::Client,
    api_key: SecretString,
    upload_url: String,
}

impl ImgbbStorage {
    #[must_use]
    pub fn new(config: &ImgbbConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            upload_url: config.upload_url.clone(),
        }
    }
}

#[async_trait]
impl ImageStorage for ImgbbStorage {
    fn backend(&self) -> &'static str {
        "imgbb"
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredImage, UploadError> {
        let filename = validate(original_name, bytes.len())?;
        let url = url::Url::parse_with_params(
            &self.upload_url,
            [("key", self.api_key.expose_secret())],
        )
        .map_err(|e| UploadError::Rejected(format!("invalid upload URL: {e}")))?;

        let encoded = STANDARD.encode(bytes);
        let response = self
            .client
            .post(url)
            .form(&[("image", encoded.as_str()), ("name", filename.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body: ImgbbResponse = response.json().await?;
        let hosted = match body {
            ImgbbResponse {
                success: true,
                data: Some(image),
                ..
            } => image.url,
            ImgbbResponse { error, .. } => {
                let message = error.map_or_else(|| format!("status {status}"), |e| e.message);
                return Err(UploadError::Rejected(message));
            }
        };

        info!(%filename, "Image stored on ImgBB");
        Ok(StoredImage {
            filename,
            path: hosted.clone(),
            url: hosted,
        })
    }
}
