//! Application state shared by all handlers.

use mirrorgate_core::GatewayConfig;
use mirrorgate_storage::Storage;
use mirrorgate_sync::PointerStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Gateway state: configuration, asset storage, and the authoritative
/// pointer. The pointer store persists through the state directory so the
/// pointer survives restarts.
pub struct AppState {
    pub config: GatewayConfig,
    pub storage: Arc<dyn Storage>,
    pub pointer: Arc<Mutex<PointerStore>>,
}
