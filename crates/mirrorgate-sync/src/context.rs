//! One execution context's fully wired sync stack.
//!
//! Bundles the registry, name generator, pointer store, reconciler, and
//! probe service behind a single build/start/stop lifecycle. Ports (state
//! store, remote authority, broadcaster, health probe) are injected so a
//! context can run against the real gateway or entirely in-memory.

use crate::broadcast::Broadcaster;
use crate::detector::BlockedPageDetector;
use crate::namegen::{NameGenerator, NameGeneratorConfig};
use crate::pointer::PointerStore;
use crate::probe::{HealthProbe, ProbeService, ProbeServiceConfig};
use crate::reconciler::{Reconciler, ReconcilerConfig};
use crate::redirect::{
    Navigator, NoticeSink, RedirectController, RedirectControllerConfig, RotationMode,
};
use crate::registry::LivenessRegistry;
use crate::remote::RemoteAuthority;
use crate::store::{SessionFlags, StateStore};
use mirrorgate_core::SyncConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct SyncContext {
    config: SyncConfig,
    store: Arc<dyn StateStore>,
    registry: Arc<Mutex<LivenessRegistry>>,
    names: Arc<Mutex<NameGenerator>>,
    session: Arc<SessionFlags>,
    reconciler: Reconciler,
    probes: ProbeService,
}

impl SyncContext {
    /// Wire up a context from its configuration and ports. Nothing runs
    /// until `start`.
    pub async fn build(
        config: SyncConfig,
        store: Arc<dyn StateStore>,
        remote: Arc<dyn RemoteAuthority>,
        broadcaster: Arc<dyn Broadcaster>,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        let registry = Arc::new(Mutex::new(
            LivenessRegistry::load(
                store.clone(),
                config.root_domain.clone(),
                config.endpoints.clone(),
            )
            .await,
        ));

        let names = Arc::new(Mutex::new(
            NameGenerator::load(
                store.clone(),
                NameGeneratorConfig {
                    root_domain: config.root_domain.clone(),
                    label_length: config.label_length,
                    ..NameGeneratorConfig::default()
                },
            )
            .await,
        ));

        let pointer = Arc::new(Mutex::new(PointerStore::load(store.clone()).await));
        let reconciler = Reconciler::new(
            pointer,
            store.clone(),
            remote,
            broadcaster,
            ReconcilerConfig {
                interval: Duration::from_secs(config.sync_interval_secs),
            },
        );

        let probes = ProbeService::new(
            registry.clone(),
            probe,
            ProbeServiceConfig {
                interval: Duration::from_secs(config.probe_interval_secs),
                probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            },
        );

        Self {
            config,
            store,
            registry,
            names,
            session: Arc::new(SessionFlags::new()),
            reconciler,
            probes,
        }
    }

    pub fn registry(&self) -> Arc<Mutex<LivenessRegistry>> {
        self.registry.clone()
    }

    pub fn pointer(&self) -> Arc<Mutex<PointerStore>> {
        self.reconciler.pointer()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Build a redirect controller sharing this context's registry, name
    /// generator, session flags, and persisted state.
    pub fn controller(
        &self,
        mode: RotationMode,
        detector: Arc<dyn BlockedPageDetector>,
        navigator: Arc<dyn Navigator>,
        notice: Arc<dyn NoticeSink>,
    ) -> RedirectController {
        RedirectController::new(
            self.registry.clone(),
            self.names.clone(),
            detector,
            self.session.clone(),
            self.store.clone(),
            navigator,
            notice,
            RedirectControllerConfig {
                mode,
                redirect_delay: Duration::from_millis(self.config.redirect_delay_ms),
                throttle: Duration::from_secs(self.config.redirect_throttle_secs),
            },
        )
    }

    /// Start the reconciliation and probe loops.
    pub fn start(&mut self) {
        self.reconciler.start();
        self.probes.start();
    }

    /// Stop both loops. Idempotent; safe from a teardown path.
    pub fn stop(&mut self) {
        self.reconciler.stop();
        self.probes.stop();
    }
}
