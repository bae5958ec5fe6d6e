//! Mirrorgate Sync Library
//!
//! This crate implements the pointer-and-liveness mechanism: a liveness
//! registry rotating over alternate endpoint names, an eventually-consistent
//! pointer store reconciled across contexts, and the redirect controller
//! that moves a context off a blocked endpoint.
//!
//! Every component is constructed with injected ports (state store, health
//! probe, detector, navigator, broadcaster, remote authority) so state
//! transitions are testable without a network or wall clock.

pub mod broadcast;
pub mod context;
pub mod detector;
pub mod namegen;
pub mod pointer;
pub mod probe;
pub mod reconciler;
pub mod redirect;
pub mod registry;
pub mod remote;
pub mod store;

// Re-export commonly used types
pub use broadcast::{Broadcaster, LocalBroadcaster};
pub use context::SyncContext;
pub use detector::{BlockedPageDetector, IndicatorDetector, PageSnapshot};
pub use namegen::{NameGenerator, NameGeneratorConfig};
pub use pointer::PointerStore;
pub use probe::{HealthProbe, HttpHealthProbe, ProbeService, ProbeServiceConfig};
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use redirect::{
    Decision, Navigator, NoticeSink, NoopNotice, RedirectController, RedirectControllerConfig,
    RotationMode,
};
pub use registry::LivenessRegistry;
pub use remote::RemoteAuthority;
pub use store::{FileStore, MemoryStore, SessionFlags, StateStore, StoreError, StoreResult};
