//! API-level constants.

/// Route prefix for the gateway API.
pub const API_PREFIX: &str = "/api";

/// Multipart field name carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "image";
