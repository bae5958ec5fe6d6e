//! Health check handler.

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use mirrorgate_core::models::HealthResponse;

/// Liveness probe - process is running. Also the path endpoint probes hit,
/// where any response at all counts as reachable.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp: Utc::now(),
        }),
    )
}
