//! Stored asset listing handler.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use mirrorgate_core::models::FileListResponse;
use std::sync::Arc;

/// `GET /api/files` - list stored asset keys. Doubles as the endpoint
/// health-probe target.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let files = state.storage.list().await?;
    Ok(Json(FileListResponse {
        success: true,
        files,
    }))
}
