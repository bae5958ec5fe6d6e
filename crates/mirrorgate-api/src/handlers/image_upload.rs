//! Image upload handler.
//!
//! Validates the multipart payload, stores it, and moves the authoritative
//! pointer to the stored asset's URL.

use crate::constants::UPLOAD_FIELD;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mirrorgate_core::models::{UpdateSource, UploadResponse};
use mirrorgate_core::AppError;
use std::sync::Arc;

/// `POST /api/upload-image` - multipart image upload.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();

        validate_upload(&state, &file_name, &content_type)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::PayloadTooLarge(format!("Failed to read upload: {}", e)))?;

        if data.len() > state.config.max_file_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                state.config.max_file_size_bytes
            ))
            .into());
        }
        if data.is_empty() {
            return Err(AppError::InvalidInput("Uploaded file is empty".to_string()).into());
        }

        let file_size = data.len();
        let (key, url) = state
            .storage
            .upload(&file_name, &content_type, data.to_vec())
            .await?;

        // The freshly stored asset becomes the current pointer value
        state
            .pointer
            .lock()
            .await
            .set(&url, UpdateSource::Manual)
            .await;

        tracing::info!(key = %key, file_size, "Image uploaded");

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                success: true,
                image_url: url,
                file_name,
                file_size,
            }),
        ));
    }

    Err(AppError::BadRequest(format!("Missing multipart field '{}'", UPLOAD_FIELD)).into())
}

fn validate_upload(
    state: &AppState,
    file_name: &str,
    content_type: &str,
) -> Result<(), HttpAppError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    if !state.config.allowed_extensions.contains(&extension) {
        return Err(AppError::InvalidInput(format!(
            "File extension '{}' is not allowed",
            extension
        ))
        .into());
    }

    if !content_type.is_empty()
        && !state
            .config
            .allowed_content_types
            .contains(&content_type.to_lowercase())
    {
        return Err(AppError::InvalidInput(format!(
            "Content type '{}' is not allowed",
            content_type
        ))
        .into());
    }

    Ok(())
}
