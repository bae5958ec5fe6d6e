//! Mirrorgate Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! constants shared across all Mirrorgate components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{GatewayConfig, SyncConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    Endpoint, FileListResponse, HealthResponse, ImageStatusResponse, Liveness, Pointer,
    PointerEvent, RegistryStatus, UpdateImageUrlRequest, UpdateImageUrlResponse, UpdateSource,
    UploadResponse,
};
