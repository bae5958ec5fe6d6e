//! Persisted state port and implementations.
//!
//! A `StateStore` is the same-origin persistence a context shares with its
//! own future executions (and with other contexts on the same origin). It
//! is a flat string-keyed map; atomicity is assumed only at the granularity
//! of one key. Callers treat persistence failures as non-fatal: in-memory
//! state stays authoritative for the current execution.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tokio::fs;

/// Logical keys for persisted state.
pub mod keys {
    /// Cursor into the endpoint rotation.
    pub const CURRENT_ENDPOINT_INDEX: &str = "currentEndpointIndex";
    /// Serialized list of blocked endpoint labels.
    pub const BLOCKED_ENDPOINTS: &str = "blockedEndpoints";
    /// Bounded list of previously minted endpoint labels.
    pub const USED_ENDPOINT_NAMES: &str = "usedEndpointNames";
    /// Cached pointer value + timestamp (serialized `Pointer`).
    pub const CACHED_POINTER: &str = "cachedPointer";
    /// RFC 3339 stamp of the last redirect this origin performed.
    pub const LAST_REDIRECT_AT: &str = "lastRedirectAt";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Same-origin persisted key/value storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> StoreResult<()>;
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory store: default for tests and single-run contexts.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON document, written atomically (tmp + rename).
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> StoreResult<HashMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => Ok(map),
                Err(e) => {
                    // Corrupt document: start over rather than fail every read
                    tracing::warn!(path = %self.path.display(), error = %e, "Discarding malformed state file");
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, map: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.load().await?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }
}

/// Session-scoped flags. Lives and dies with the context, which is what
/// makes the "already redirected" latch reset on a new session.
#[derive(Default)]
pub struct SessionFlags {
    redirected: std::sync::atomic::AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_redirected(&self) -> bool {
        self.redirected.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn mark_redirected(&self) {
        self.redirected
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.redirected
            .store(false, std::sync::atomic::Ordering::Relaxed);
    }
}
