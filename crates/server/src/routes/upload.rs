//! Image upload handler.

use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::uploads::{StoredImage, UploadError};
use crate::state::AppState;

/// Multipart field carrying the file.
const IMAGE_FIELD: &str = "image";

/// Store the `image` field of a multipart body.
///
/// # Errors
///
/// Returns 400 when the field is missing, too large or not an image.
#[instrument(skip_all)]
pub async fn upload(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StoredImage>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if bytes.is_empty() {
            break;
        }

        let stored = state.images().store(&original_name, &bytes).await?;
        tracing::info!(
            filename = %stored.filename,
            backend = state.images().backend(),
            "Image uploaded"
        );
        return Ok(Json(stored));
    }

    Err(UploadError::Missing.into())
}
