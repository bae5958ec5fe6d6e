//! Route configuration and setup.

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use mirrorgate_core::GatewayConfig;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &GatewayConfig, state: Arc<AppState>) -> Router<()> {
    let cors = setup_cors(config);

    // Multipart framing adds overhead on top of the file itself
    let body_limit = config.max_file_size_bytes + 64 * 1024;

    Router::new()
        .route(
            &format!("{}/image-status", API_PREFIX),
            get(handlers::pointer::image_status),
        )
        .route(
            &format!("{}/update-image-url", API_PREFIX),
            post(handlers::pointer::update_image_url),
        )
        .route(
            &format!("{}/upload-image", API_PREFIX),
            post(handlers::image_upload::upload_image),
        )
        .route(
            &format!("{}/files", API_PREFIX),
            get(handlers::files::list_files),
        )
        .route("/health", get(handlers::health::health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn setup_cors(config: &GatewayConfig) -> CorsLayer {
    if config.cors_origins.contains(&"*".to_string()) {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    }
}
