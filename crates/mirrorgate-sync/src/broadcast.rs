//! Cross-context fan-out channel for pointer events.
//!
//! Contexts that cannot share memory exchange `PointerEvent`s over a
//! best-effort broadcast topic. Delivery is lossy by contract; the polling
//! reconciliation path covers anything the push path drops.

use async_trait::async_trait;
use mirrorgate_core::models::PointerEvent;
use tokio::sync::broadcast;

/// Fixed topic name carried by every channel backend.
pub const TOPIC: &str = "pointer-updates";

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Publish to every listening context. Never fails; an undeliverable
    /// message is dropped.
    async fn publish(&self, event: PointerEvent);

    /// Subscribe to events published after this call.
    fn subscribe(&self) -> broadcast::Receiver<PointerEvent>;
}

/// Process-local backend over a tokio broadcast channel. Contexts in the
/// same process (or test) share one instance.
pub struct LocalBroadcaster {
    tx: broadcast::Sender<PointerEvent>,
}

impl LocalBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }
}

impl Default for LocalBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for LocalBroadcaster {
    async fn publish(&self, event: PointerEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<PointerEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mirrorgate_core::models::{Pointer, UpdateSource};

    #[tokio::test]
    async fn test_fan_out_to_multiple_subscribers() {
        let bus = LocalBroadcaster::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        bus.publish(PointerEvent::new(
            &Pointer::new("v", t),
            UpdateSource::Manual,
        ))
        .await;

        assert_eq!(rx1.recv().await.unwrap().value, "v");
        assert_eq!(rx2.recv().await.unwrap().value, "v");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = LocalBroadcaster::new();
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        // Must not panic or error
        bus.publish(PointerEvent::new(
            &Pointer::new("v", t),
            UpdateSource::Manual,
        ))
        .await;
    }
}
