//! Wire types for the upload gateway API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative pointer read: `GET /api/image-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatusResponse {
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Single-writer pointer update: `POST /api/update-image-url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageUrlRequest {
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageUrlResponse {
    pub success: bool,
    pub image_url: String,
    pub updated_at: DateTime<Utc>,
}

/// Upload result: `POST /api/upload-image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub image_url: String,
    pub file_name: String,
    pub file_size: usize,
}

/// Stored asset listing: `GET /api/files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    pub success: bool,
    pub files: Vec<String>,
}

/// `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
