//! Authoritative pointer read and update handlers.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use mirrorgate_core::models::{
    ImageStatusResponse, UpdateImageUrlRequest, UpdateImageUrlResponse, UpdateSource,
};
use mirrorgate_core::AppError;
use std::sync::Arc;

/// `GET /api/image-status` - authoritative pointer read.
pub async fn image_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pointer = state.pointer.lock().await.get();
    Json(ImageStatusResponse {
        image_url: pointer.as_ref().map(|p| p.value.clone()),
        updated_at: pointer.map(|p| p.updated_at),
    })
}

/// `POST /api/update-image-url` - single-writer pointer update.
#[tracing::instrument(skip(state, request), fields(operation = "update_image_url"))]
pub async fn update_image_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateImageUrlRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let value = request.image_url.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest("imageUrl must not be empty".to_string()).into());
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(
            AppError::InvalidInput("imageUrl must be an absolute http(s) URL".to_string()).into(),
        );
    }

    let pointer = state
        .pointer
        .lock()
        .await
        .set(value, UpdateSource::Manual)
        .await;

    Ok(Json(UpdateImageUrlResponse {
        success: true,
        image_url: pointer.value,
        updated_at: pointer.updated_at,
    }))
}
