//! Application setup and initialization
//!
//! Initialization logic lives here rather than in main.rs so integration
//! tests can build the same application against isolated storage.

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use mirrorgate_core::GatewayConfig;
use mirrorgate_storage::LocalStorage;
use mirrorgate_sync::{FileStore, PointerStore};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Initialize the entire application
pub async fn initialize_app(config: GatewayConfig) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    let storage = LocalStorage::new(config.storage_path.clone(), config.storage_base_url.clone())
        .await
        .context("Failed to initialize storage")?;

    let state_store = Arc::new(FileStore::new(
        Path::new(&config.state_dir).join("gateway-state.json"),
    ));
    let pointer = Arc::new(Mutex::new(PointerStore::load(state_store).await));

    let state = Arc::new(AppState {
        config: config.clone(),
        storage: Arc::new(storage),
        pointer,
    });

    let router = routes::setup_routes(&config, state.clone());
    Ok((state, router))
}
