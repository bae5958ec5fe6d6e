//! Liveness registry: ordered endpoint rotation with a persisted cursor and
//! blocked set.
//!
//! All mutations persist immediately but never fail out: a persistence
//! error is logged and in-memory state stays authoritative for the current
//! execution. State is shared only with executions on the same origin;
//! cross-origin views converge through the pointer sync path instead.

use crate::probe::HealthProbe;
use crate::store::{keys, StateStore};
use mirrorgate_core::models::{Endpoint, Liveness, RegistryStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub struct LivenessRegistry {
    store: Arc<dyn StateStore>,
    root_domain: String,
    endpoints: Vec<Endpoint>,
    cursor: usize,
    blocked: HashSet<String>,
}

impl LivenessRegistry {
    /// Build a registry over the configured labels, restoring the persisted
    /// cursor and blocked set. Absent or malformed state falls back to
    /// defaults. An empty label list gets the apex endpoint so `current()`
    /// always has something to return.
    pub async fn load(
        store: Arc<dyn StateStore>,
        root_domain: impl Into<String>,
        labels: Vec<String>,
    ) -> Self {
        let mut endpoints: Vec<Endpoint> = labels.into_iter().map(Endpoint::new).collect();
        if endpoints.is_empty() {
            endpoints.push(Endpoint::new(""));
        }

        let cursor = match store.get(keys::CURRENT_ENDPOINT_INDEX).await {
            Ok(Some(raw)) => raw.parse::<usize>().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read rotation cursor, starting at 0");
                0
            }
        };

        let blocked: HashSet<String> = match store.get(keys::BLOCKED_ENDPOINTS).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding malformed blocked set");
                HashSet::new()
            }),
            Ok(None) => HashSet::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read blocked set, starting empty");
                HashSet::new()
            }
        };

        let mut registry = Self {
            store,
            root_domain: root_domain.into(),
            endpoints,
            cursor: 0,
            blocked,
        };
        // Clamp a stale cursor from a previous configuration
        registry.cursor = cursor.min(registry.endpoints.len() - 1);
        registry.refresh_liveness();
        registry
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    /// Endpoint at the cursor. The cursor is always a valid index.
    pub fn current(&self) -> Endpoint {
        self.endpoints[self.cursor].clone()
    }

    pub fn current_origin(&self) -> String {
        self.current().origin(&self.root_domain)
    }

    /// Idempotent: marking an already-blocked label is a no-op.
    pub async fn mark_blocked(&mut self, label: &str) {
        if self.blocked.insert(label.to_string()) {
            tracing::info!(label, "Endpoint marked blocked");
            self.refresh_liveness();
            self.persist().await;
        }
    }

    /// Idempotent: marking an already-available label is a no-op.
    pub async fn mark_available(&mut self, label: &str) {
        let mut changed = self.blocked.remove(label);
        if changed {
            tracing::info!(label, "Endpoint marked available");
        }
        // An endpoint never probed before also lands here
        if let Some(ep) = self.endpoints.iter_mut().find(|ep| ep.label == label) {
            if ep.liveness != Liveness::Available {
                ep.liveness = Liveness::Available;
                changed = true;
            }
        }
        if changed {
            self.persist().await;
        }
    }

    /// Move the cursor forward circularly, skipping blocked endpoints, for
    /// at most one full pass. If every endpoint is blocked, reset the
    /// blocked set and return the endpoint at cursor 0: retrying a
    /// previously blocked endpoint beats permanent deadlock.
    pub async fn advance(&mut self) -> Endpoint {
        let len = self.endpoints.len();
        for step in 1..=len {
            let idx = (self.cursor + step) % len;
            if !self.blocked.contains(&self.endpoints[idx].label) {
                self.cursor = idx;
                self.persist().await;
                return self.current();
            }
        }

        tracing::warn!("Every endpoint is blocked, resetting rotation state");
        self.reset_all().await;
        self.current()
    }

    /// Designed escape from total outage: clear the blocked set and rewind
    /// the cursor.
    pub async fn reset_all(&mut self) {
        self.blocked.clear();
        self.cursor = 0;
        self.refresh_liveness();
        self.persist().await;
    }

    /// Background reconciliation pass: run the supplied health predicate
    /// against every endpoint with a bounded timeout. Errors and timeouts
    /// count as blocked.
    pub async fn probe_all(&mut self, probe: &dyn HealthProbe, timeout: Duration) {
        let endpoints = self.endpoints.clone();
        for ep in endpoints {
            let origin = ep.origin(&self.root_domain);
            let reachable =
                match tokio::time::timeout(timeout, probe.probe(&ep, &self.root_domain)).await {
                    Ok(Ok(reachable)) => reachable,
                    Ok(Err(e)) => {
                        tracing::debug!(origin, error = %e, "Health probe failed");
                        false
                    }
                    Err(_) => {
                        tracing::debug!(origin, "Health probe timed out");
                        false
                    }
                };

            if reachable {
                self.mark_available(&ep.label).await;
            } else {
                self.mark_blocked(&ep.label).await;
            }
        }
    }

    /// No-op when the label is already configured.
    pub async fn add_endpoint(&mut self, label: &str) {
        if self.endpoints.iter().any(|ep| ep.label == label) {
            return;
        }
        self.endpoints.push(Endpoint::new(label));
        tracing::info!(label, "Endpoint added to rotation");
        self.persist().await;
    }

    /// Remove a label from the rotation, clamping the cursor if it now
    /// points past the end. The last endpoint cannot be removed: the
    /// rotation must always have something to return.
    pub async fn remove_endpoint(&mut self, label: &str) {
        if self.endpoints.len() == 1 {
            tracing::warn!(label, "Refusing to remove the last endpoint");
            return;
        }
        let Some(idx) = self.endpoints.iter().position(|ep| ep.label == label) else {
            return;
        };

        self.endpoints.remove(idx);
        self.blocked.remove(label);
        if self.cursor >= self.endpoints.len() {
            self.cursor = 0;
        } else if idx < self.cursor {
            // Keep pointing at the same endpoint after the shift
            self.cursor -= 1;
        }
        tracing::info!(label, "Endpoint removed from rotation");
        self.persist().await;
    }

    pub fn status(&self) -> RegistryStatus {
        RegistryStatus {
            current: self.current_origin(),
            cursor: self.cursor,
            total: self.endpoints.len(),
            blocked: self.sorted_blocked(),
            available: self
                .endpoints
                .iter()
                .filter(|ep| !self.blocked.contains(&ep.label))
                .map(|ep| ep.origin(&self.root_domain))
                .collect(),
        }
    }

    pub fn blocked_len(&self) -> usize {
        self.blocked.len()
    }

    fn refresh_liveness(&mut self) {
        for ep in &mut self.endpoints {
            if self.blocked.contains(&ep.label) {
                ep.liveness = Liveness::Blocked;
            } else if ep.liveness == Liveness::Blocked {
                // Blocked flag cleared by a reset
                ep.liveness = Liveness::Unknown;
            }
        }
    }

    fn sorted_blocked(&self) -> Vec<String> {
        let mut blocked: Vec<String> = self.blocked.iter().cloned().collect();
        blocked.sort();
        blocked
    }

    async fn persist(&self) {
        if let Err(e) = self
            .store
            .put(keys::CURRENT_ENDPOINT_INDEX, &self.cursor.to_string())
            .await
        {
            tracing::warn!(error = %e, "Failed to persist rotation cursor");
        }
        match serde_json::to_string(&self.sorted_blocked()) {
            Ok(raw) => {
                if let Err(e) = self.store.put(keys::BLOCKED_ENDPOINTS, &raw).await {
                    tracing::warn!(error = %e, "Failed to persist blocked set");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize blocked set"),
        }
    }
}
