//! Domain methods for the Mirrorgate gateway client.
//!
//! Response types are re-exported from `mirrorgate_core::models`.

use crate::ApiClient;
use anyhow::{Context, Result};
use mirrorgate_core::models::{
    FileListResponse, HealthResponse, ImageStatusResponse, UpdateImageUrlRequest,
    UpdateImageUrlResponse, UploadResponse,
};

impl ApiClient {
    /// Read the authoritative pointer.
    pub async fn image_status(&self) -> Result<ImageStatusResponse> {
        self.get("/api/image-status").await
    }

    /// Single-writer pointer update.
    pub async fn update_image_url(&self, image_url: &str) -> Result<UpdateImageUrlResponse> {
        self.post_json(
            "/api/update-image-url",
            &UpdateImageUrlRequest {
                image_url: image_url.to_string(),
            },
        )
        .await
    }

    /// Upload an image from a local file path.
    pub async fn upload_image(&self, file_path: &str) -> Result<UploadResponse> {
        let path = std::path::Path::new(file_path);
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
        }

        let buffer = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", file_path))?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.jpg");

        let form = reqwest::multipart::Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(buffer).file_name(filename.to_string()),
        );

        self.post_multipart("/api/upload-image", form).await
    }

    /// List stored asset keys.
    pub async fn list_files(&self) -> Result<FileListResponse> {
        self.get("/api/files").await
    }

    /// Gateway health check.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/health").await
    }
}
