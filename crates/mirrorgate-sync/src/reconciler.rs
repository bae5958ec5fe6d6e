//! Pointer reconciliation: the poll path (local store, then remote
//! authority) with a push path (cross-context broadcast) layered on top
//! for low latency when both contexts are reachable.

use crate::broadcast::Broadcaster;
use crate::pointer::PointerStore;
use crate::remote::RemoteAuthority;
use crate::store::{keys, StateStore};
use mirrorgate_core::models::{Pointer, PointerEvent, UpdateSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::interval;

#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    pub interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// Keeps one context's pointer view converged with the persisted local
/// copy, the remote authority, and other contexts. Ticks are serialized
/// by the loop: an overrunning tick delays the next rather than
/// overlapping it.
pub struct Reconciler {
    pointer: Arc<Mutex<PointerStore>>,
    store: Arc<dyn StateStore>,
    remote: Arc<dyn RemoteAuthority>,
    broadcaster: Arc<dyn Broadcaster>,
    config: ReconcilerConfig,
    shutdown_txs: Vec<mpsc::Sender<()>>,
}

impl Reconciler {
    pub fn new(
        pointer: Arc<Mutex<PointerStore>>,
        store: Arc<dyn StateStore>,
        remote: Arc<dyn RemoteAuthority>,
        broadcaster: Arc<dyn Broadcaster>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            pointer,
            store,
            remote,
            broadcaster,
            config,
            shutdown_txs: Vec::new(),
        }
    }

    pub fn pointer(&self) -> Arc<Mutex<PointerStore>> {
        self.pointer.clone()
    }

    /// One reconciliation pass. Public so tests can drive the loop with
    /// synthetic ticks instead of wall-clock timers.
    pub async fn tick(&self) {
        if self.check_local().await {
            return;
        }
        self.check_remote().await;
    }

    /// Step 1: another same-origin context may have persisted a newer
    /// value.
    async fn check_local(&self) -> bool {
        let persisted = match self.store.get(keys::CACHED_POINTER).await {
            Ok(Some(raw)) => match serde_json::from_str::<Pointer>(&raw) {
                Ok(pointer) => pointer,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring malformed persisted pointer");
                    return false;
                }
            },
            Ok(None) => return false,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read persisted pointer");
                return false;
            }
        };

        let mut pointer = self.pointer.lock().await;
        if pointer.get().as_ref() == Some(&persisted) {
            return false;
        }
        if pointer.adopt(persisted, UpdateSource::Local).await {
            if let Some(adopted) = pointer.get() {
                drop(pointer);
                self.broadcaster
                    .publish(PointerEvent::new(&adopted, UpdateSource::Local))
                    .await;
                return true;
            }
        }
        false
    }

    /// Step 2: query the remote authority. Failures are skipped silently;
    /// this is a best-effort channel retried on the next tick.
    async fn check_remote(&self) {
        let fetched = match self.remote.fetch_pointer().await {
            Ok(Some(pointer)) => pointer,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "Remote authority unreachable, skipping tick");
                return;
            }
        };

        let mut pointer = self.pointer.lock().await;
        if pointer.adopt(fetched, UpdateSource::Remote).await {
            if let Some(adopted) = pointer.get() {
                drop(pointer);
                self.broadcaster
                    .publish(PointerEvent::new(&adopted, UpdateSource::Remote))
                    .await;
            }
        }
    }

    /// Push path: adopt a newer-looking inbound event immediately and
    /// rebroadcast it, so one authoritative write reaches every listening
    /// context without waiting for their poll ticks. Returns whether the
    /// event was adopted; a stale or already-seen event is not
    /// rebroadcast, which is what keeps two contexts from ping-ponging.
    pub async fn handle_event(&self, event: PointerEvent) -> bool {
        let mut pointer = self.pointer.lock().await;
        let adopted = pointer.adopt(event.pointer(), UpdateSource::Broadcast).await;
        drop(pointer);

        if adopted {
            self.broadcaster
                .publish(PointerEvent::new(
                    &event.pointer(),
                    UpdateSource::Broadcast,
                ))
                .await;
        }
        adopted
    }

    /// Operator write through this context: adopt locally and push to
    /// every listener.
    pub async fn set_manual(&self, value: &str) -> Pointer {
        let mut pointer = self.pointer.lock().await;
        let adopted = pointer.set(value, UpdateSource::Manual).await;
        drop(pointer);

        self.broadcaster
            .publish(PointerEvent::new(&adopted, UpdateSource::Manual))
            .await;
        adopted
    }

    /// Spawn the poll loop and the push-path listener. Calling `start` on
    /// a running reconciler is a no-op.
    pub fn start(&mut self) {
        if !self.shutdown_txs.is_empty() {
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Reconciler started"
        );

        // Poll loop
        let (poll_tx, mut poll_rx) = mpsc::channel(1);
        self.shutdown_txs.push(poll_tx);
        let poll = self.clone_for_task();
        let tick_interval = self.config.interval;
        tokio::spawn(async move {
            let mut ticks = interval(tick_interval);
            loop {
                tokio::select! {
                    _ = ticks.tick() => poll.tick().await,
                    _ = poll_rx.recv() => break,
                }
            }
        });

        // Push-path listener
        let (push_tx, mut push_rx) = mpsc::channel(1);
        self.shutdown_txs.push(push_tx);
        let push = self.clone_for_task();
        let mut events = self.broadcaster.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = events.recv() => match received {
                        Ok(event) => {
                            push.handle_event(event).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // The poll path will catch anything we missed
                            tracing::debug!(skipped, "Push listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = push_rx.recv() => break,
                }
            }
        });
    }

    /// Stop both loops. Idempotent and safe to call from a teardown path.
    pub fn stop(&mut self) {
        for tx in self.shutdown_txs.drain(..) {
            let _ = tx.try_send(());
        }
    }

    fn clone_for_task(&self) -> Reconciler {
        Reconciler {
            pointer: self.pointer.clone(),
            store: self.store.clone(),
            remote: self.remote.clone(),
            broadcaster: self.broadcaster.clone(),
            config: self.config.clone(),
            shutdown_txs: Vec::new(),
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::LocalBroadcaster;
    use crate::store::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, secs).unwrap()
    }

    struct FixedRemote {
        pointer: std::sync::Mutex<Option<Pointer>>,
    }

    impl FixedRemote {
        fn new(pointer: Option<Pointer>) -> Self {
            Self {
                pointer: std::sync::Mutex::new(pointer),
            }
        }
    }

    #[async_trait::async_trait]
    impl RemoteAuthority for FixedRemote {
        async fn fetch_pointer(&self) -> anyhow::Result<Option<Pointer>> {
            Ok(self.pointer.lock().unwrap().clone())
        }
    }

    struct FailingRemote;

    #[async_trait::async_trait]
    impl RemoteAuthority for FailingRemote {
        async fn fetch_pointer(&self) -> anyhow::Result<Option<Pointer>> {
            anyhow::bail!("connection refused")
        }
    }

    async fn context(
        remote: Arc<dyn RemoteAuthority>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Reconciler {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let pointer = Arc::new(Mutex::new(PointerStore::load(store.clone()).await));
        Reconciler::new(
            pointer,
            store,
            remote,
            broadcaster,
            ReconcilerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_pointer_convergence_via_remote() {
        // Two independent contexts, one reachable authority: after one
        // tick each, both report the same pointer
        let remote = Arc::new(FixedRemote::new(Some(Pointer::new("v1", at(10)))));
        let a = context(remote.clone(), Arc::new(LocalBroadcaster::new())).await;
        let b = context(remote.clone(), Arc::new(LocalBroadcaster::new())).await;

        a.tick().await;
        b.tick().await;

        let got_a = a.pointer().lock().await.get().unwrap();
        let got_b = b.pointer().lock().await.get().unwrap();
        assert_eq!(got_a, got_b);
        assert_eq!(got_a.value, "v1");
    }

    #[tokio::test]
    async fn test_local_store_wins_over_remote_in_one_tick() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        // Another same-origin context persisted a newer value than the
        // remote currently serves
        store
            .put(
                keys::CACHED_POINTER,
                &serde_json::to_string(&Pointer::new("local", at(20))).unwrap(),
            )
            .await
            .unwrap();

        let pointer = Arc::new(Mutex::new(PointerStore::load(Arc::new(MemoryStore::new())).await));
        let reconciler = Reconciler::new(
            pointer,
            store,
            Arc::new(FixedRemote::new(Some(Pointer::new("remote", at(5))))),
            Arc::new(LocalBroadcaster::new()),
            ReconcilerConfig::default(),
        );

        reconciler.tick().await;
        assert_eq!(
            reconciler.pointer().lock().await.get().unwrap().value,
            "local"
        );
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_previous_value() {
        let bus: Arc<dyn Broadcaster> = Arc::new(LocalBroadcaster::new());
        let reconciler = context(Arc::new(FailingRemote), bus).await;

        reconciler
            .pointer()
            .lock()
            .await
            .adopt(Pointer::new("kept", at(1)), UpdateSource::Remote)
            .await;

        reconciler.tick().await;
        assert_eq!(
            reconciler.pointer().lock().await.get().unwrap().value,
            "kept"
        );
    }

    #[tokio::test]
    async fn test_push_path_adopts_and_rebroadcasts_once() {
        let bus = Arc::new(LocalBroadcaster::new());
        let reconciler = context(Arc::new(FixedRemote::new(None)), bus.clone()).await;
        let mut taps = bus.subscribe();

        let event = PointerEvent::new(&Pointer::new("pushed", at(7)), UpdateSource::Manual);
        assert!(reconciler.handle_event(event.clone()).await);
        // Rebroadcast as a broadcast-sourced event
        assert_eq!(taps.recv().await.unwrap().source, UpdateSource::Broadcast);

        // Replaying the same event: already seen, no rebroadcast
        assert!(!reconciler.handle_event(event).await);
        assert!(matches!(
            taps.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_stale_broadcast_ignored() {
        let bus = Arc::new(LocalBroadcaster::new());
        let reconciler = context(Arc::new(FixedRemote::new(None)), bus.clone()).await;

        reconciler
            .pointer()
            .lock()
            .await
            .adopt(Pointer::new("new", at(9)), UpdateSource::Remote)
            .await;

        let stale = PointerEvent::new(&Pointer::new("old", at(2)), UpdateSource::Manual);
        assert!(!reconciler.handle_event(stale).await);
        assert_eq!(
            reconciler.pointer().lock().await.get().unwrap().value,
            "new"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_contexts_converge_via_push() {
        // One shared bus, no remote value: a manual write in context A
        // reaches context B through the push listener alone
        let bus = Arc::new(LocalBroadcaster::new());
        let remote = Arc::new(FixedRemote::new(None));
        let mut a = context(remote.clone(), bus.clone()).await;
        let mut b = context(remote, bus).await;
        a.start();
        b.start();

        a.set_manual("https://x/img.png").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            b.pointer().lock().await.get().unwrap().value,
            "https://x/img.png"
        );

        a.stop();
        b.stop();
        a.stop(); // idempotent
    }
}
