//! Local view of the shared pointer: cached value, last-write-wins
//! adoption, persistence, and change notification.

use crate::store::{keys, StateStore};
use chrono::{DateTime, Utc};
use mirrorgate_core::models::{Pointer, PointerEvent, UpdateSource};
use std::sync::Arc;
use tokio::sync::broadcast;

type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One context's copy of the pointer. The cached value only ever moves
/// forward in `updated_at` order (monotonic local view); it may lag the
/// authoritative copy arbitrarily.
pub struct PointerStore {
    store: Arc<dyn StateStore>,
    cached: Option<Pointer>,
    events: broadcast::Sender<PointerEvent>,
    now: NowFn,
}

impl PointerStore {
    /// Restore the cached pointer from the state store; malformed or
    /// missing state starts empty.
    pub async fn load(store: Arc<dyn StateStore>) -> Self {
        let cached = match store.get(keys::CACHED_POINTER).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(pointer) => Some(pointer),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding malformed cached pointer");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached pointer, starting empty");
                None
            }
        };

        let (events, _) = broadcast::channel(16);
        Self {
            store,
            cached,
            events,
            now: Arc::new(Utc::now),
        }
    }

    /// Replace the clock used to stamp `set` updates.
    pub fn with_clock(mut self, now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.now = Arc::new(now);
        self
    }

    pub fn get(&self) -> Option<Pointer> {
        self.cached.clone()
    }

    /// Notifications for every change of the cached value, whatever the
    /// source.
    pub fn subscribe(&self) -> broadcast::Receiver<PointerEvent> {
        self.events.subscribe()
    }

    /// Operator write: stamp the current time and adopt unconditionally.
    pub async fn set(&mut self, value: &str, source: UpdateSource) -> Pointer {
        let pointer = Pointer::new(value, (self.now)());
        self.accept(pointer.clone(), source).await;
        pointer
    }

    /// Adopt a pointer observed elsewhere. Last-write-wins: a value that
    /// is not strictly newer than the cached one is ignored. Returns
    /// whether the value was adopted.
    pub async fn adopt(&mut self, pointer: Pointer, source: UpdateSource) -> bool {
        match &self.cached {
            Some(cached) if !pointer.is_newer_than(cached) => {
                tracing::debug!(
                    value = %pointer.value,
                    source = %source,
                    "Ignoring pointer no newer than the cached copy"
                );
                false
            }
            _ => {
                self.accept(pointer, source).await;
                true
            }
        }
    }

    async fn accept(&mut self, pointer: Pointer, source: UpdateSource) {
        let changed = self.cached.as_ref().map(|c| c.value != pointer.value);
        self.cached = Some(pointer.clone());
        self.persist().await;

        tracing::info!(
            value = %pointer.value,
            source = %source,
            changed = changed.unwrap_or(true),
            "Pointer updated"
        );
        // No receivers is fine
        let _ = self.events.send(PointerEvent::new(&pointer, source));
    }

    async fn persist(&self) {
        let Some(pointer) = &self.cached else { return };
        let raw = match serde_json::to_string(pointer) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize pointer");
                return;
            }
        };
        if let Err(e) = self.store.put(keys::CACHED_POINTER, &raw).await {
            // In-memory copy stays authoritative for this execution
            tracing::warn!(error = %e, "Failed to persist pointer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, secs).unwrap()
    }

    #[tokio::test]
    async fn test_last_write_wins_either_delivery_order() {
        let p1 = Pointer::new("first", at(1));
        let p2 = Pointer::new("second", at(2));

        // In order: both adopted
        let mut store = PointerStore::load(Arc::new(MemoryStore::new())).await;
        assert!(store.adopt(p1.clone(), UpdateSource::Remote).await);
        assert!(store.adopt(p2.clone(), UpdateSource::Broadcast).await);
        assert_eq!(store.get().unwrap().value, "second");

        // Out of order: the stale one is ignored
        let mut store = PointerStore::load(Arc::new(MemoryStore::new())).await;
        assert!(store.adopt(p2.clone(), UpdateSource::Broadcast).await);
        assert!(!store.adopt(p1, UpdateSource::Remote).await);
        assert_eq!(store.get().unwrap().value, "second");
    }

    #[tokio::test]
    async fn test_set_stamps_injected_clock() {
        let mut store = PointerStore::load(Arc::new(MemoryStore::new()))
            .await
            .with_clock(|| at(42));

        let pointer = store.set("https://x/img.png", UpdateSource::Manual).await;
        assert_eq!(pointer.updated_at, at(42));
        assert_eq!(store.get().unwrap().value, "https://x/img.png");
    }

    #[tokio::test]
    async fn test_change_notification_fires_on_adoption() {
        let mut store = PointerStore::load(Arc::new(MemoryStore::new())).await;
        let mut rx = store.subscribe();

        store.adopt(Pointer::new("v", at(1)), UpdateSource::Local).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.value, "v");
        assert_eq!(event.source, UpdateSource::Local);
        assert_eq!(event.timestamp, at(1));
    }

    #[tokio::test]
    async fn test_no_notification_for_stale_value() {
        let mut store = PointerStore::load(Arc::new(MemoryStore::new())).await;
        store.adopt(Pointer::new("new", at(5)), UpdateSource::Remote).await;

        let mut rx = store.subscribe();
        store.adopt(Pointer::new("old", at(1)), UpdateSource::Broadcast).await;

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_cached_pointer_survives_reload() {
        let backing = Arc::new(MemoryStore::new());
        {
            let mut store = PointerStore::load(backing.clone()).await;
            store.adopt(Pointer::new("v", at(9)), UpdateSource::Remote).await;
        }

        let store = PointerStore::load(backing).await;
        let cached = store.get().unwrap();
        assert_eq!(cached.value, "v");
        assert_eq!(cached.updated_at, at(9));
    }

    #[tokio::test]
    async fn test_corrupt_cached_pointer_starts_empty() {
        let backing = Arc::new(MemoryStore::new());
        backing.put(keys::CACHED_POINTER, "nope").await.unwrap();

        let store = PointerStore::load(backing).await;
        assert!(store.get().is_none());
    }
}
