//! Endpoint health probing: the probe port, its HTTP implementation, and
//! the background service running periodic reconciliation passes.

use crate::registry::LivenessRegistry;
use anyhow::Context;
use async_trait::async_trait;
use mirrorgate_core::models::Endpoint;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::interval;

/// Health predicate over one endpoint. Implementations report `Ok(true)`
/// for reachable, `Ok(false)` for believed-blocked; errors are treated as
/// not reachable by the caller.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint, root_domain: &str) -> anyhow::Result<bool>;
}

/// Probes `GET https://{origin}/{probe_path}`. Any response counts as
/// reachable; the probe path is served by every replica, so reachability
/// of the path is reachability of the endpoint.
pub struct HttpHealthProbe {
    client: reqwest::Client,
    probe_path: String,
}

impl HttpHealthProbe {
    pub fn new(probe_path: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            probe_path: probe_path.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, endpoint: &Endpoint, root_domain: &str) -> anyhow::Result<bool> {
        let url = format!(
            "https://{}/{}",
            endpoint.origin(root_domain),
            self.probe_path.trim_start_matches('/')
        );
        self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Probe request to {} failed", url))?;
        Ok(true)
    }
}

/// Configuration for the background probe service.
#[derive(Clone, Debug)]
pub struct ProbeServiceConfig {
    pub interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for ProbeServiceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Background service that reconciles endpoint liveness on a timer,
/// independent of navigation events.
pub struct ProbeService {
    registry: Arc<Mutex<LivenessRegistry>>,
    probe: Arc<dyn HealthProbe>,
    config: ProbeServiceConfig,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl ProbeService {
    pub fn new(
        registry: Arc<Mutex<LivenessRegistry>>,
        probe: Arc<dyn HealthProbe>,
        config: ProbeServiceConfig,
    ) -> Self {
        Self {
            registry,
            probe,
            config,
            shutdown_tx: None,
        }
    }

    /// Spawn the probe loop. Calling `start` on a running service is a
    /// no-op.
    pub fn start(&mut self) {
        if self.shutdown_tx.is_some() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let registry = self.registry.clone();
        let probe = self.probe.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            Self::worker_loop(registry, probe, config, shutdown_rx).await;
        });
    }

    /// Stop the probe loop. Idempotent and safe to call from a teardown
    /// path whether or not the service was started.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // The loop may already be gone; that is fine
            let _ = tx.try_send(());
        }
    }

    async fn worker_loop(
        registry: Arc<Mutex<LivenessRegistry>>,
        probe: Arc<dyn HealthProbe>,
        config: ProbeServiceConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut poll_interval = interval(config.interval);

        tracing::info!(
            interval_secs = config.interval.as_secs(),
            "Probe service started"
        );

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    let mut registry = registry.lock().await;
                    registry.probe_all(probe.as_ref(), config.probe_timeout).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Probe service shutting down");
                    break;
                }
            }
        }
    }
}

impl Drop for ProbeService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_config_defaults() {
        let config = ProbeServiceConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
    }

    struct CountingProbe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HealthProbe for CountingProbe {
        async fn probe(&self, _endpoint: &Endpoint, _root: &str) -> anyhow::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_loop_runs_and_stops() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(Mutex::new(
            LivenessRegistry::load(store, "example", vec!["a".into(), "b".into()]).await,
        ));
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
        });

        let mut service = ProbeService::new(
            registry.clone(),
            probe.clone(),
            ProbeServiceConfig {
                interval: Duration::from_secs(60),
                probe_timeout: Duration::from_secs(5),
            },
        );
        service.start();

        // First tick fires immediately, second after the interval
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(probe.calls.load(Ordering::SeqCst) >= 4);

        service.stop();
        service.stop();
        let before = probe.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), before);
    }
}
