//! Remote authority port: the reconciler's view of the upload gateway.

use async_trait::async_trait;
use mirrorgate_core::models::Pointer;

/// Read access to the authoritative pointer copy. Implemented by the API
/// client; test doubles script the responses.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Fetch the authoritative pointer. `Ok(None)` means the authority is
    /// reachable but holds no pointer yet. Errors are swallowed by the
    /// caller; the remote is a best-effort channel.
    async fn fetch_pointer(&self) -> anyhow::Result<Option<Pointer>>;
}
