//! Collision-avoiding generator of candidate endpoint labels.

use crate::store::{keys, StateStore};
use mirrorgate_core::constants;
use rand::Rng;
use regex::Regex;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct NameGeneratorConfig {
    pub root_domain: String,
    pub label_length: usize,
    pub alphabet: Vec<char>,
    /// Prune the used set when it grows past this...
    pub cap: usize,
    /// ...down to this many most recent entries.
    pub keep: usize,
}

impl Default for NameGeneratorConfig {
    fn default() -> Self {
        Self {
            root_domain: "example.com".to_string(),
            label_length: constants::DEFAULT_LABEL_LENGTH,
            alphabet: constants::LABEL_ALPHABET.iter().map(|b| *b as char).collect(),
            cap: constants::USED_NAMES_CAP,
            keep: constants::USED_NAMES_KEEP,
        }
    }
}

/// Mints fixed-length labels from a fixed alphabet, remembering recently
/// issued ones to avoid immediate reuse. The memory is a QoS heuristic,
/// not a correctness invariant: after bounded regeneration attempts the
/// set is cleared and generation proceeds.
pub struct NameGenerator {
    store: Arc<dyn StateStore>,
    config: NameGeneratorConfig,
    used: Vec<String>,
    minted_host: Regex,
}

impl NameGenerator {
    pub async fn load(store: Arc<dyn StateStore>, config: NameGeneratorConfig) -> Self {
        let used = match store.get(keys::USED_ENDPOINT_NAMES).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding malformed used-name set");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read used-name set, starting empty");
                Vec::new()
            }
        };

        let minted_host = Regex::new(&format!(
            "^[a-z0-9]{{{}}}\\.{}$",
            config.label_length,
            regex::escape(&config.root_domain)
        ))
        .expect("minted-host pattern is statically well-formed");

        Self {
            store,
            config,
            used,
            minted_host,
        }
    }

    /// Produce a label not currently in the used set. After
    /// `MAX_MINT_ATTEMPTS` collisions the set is cleared and generation
    /// proceeds; the returned label is always recorded and persisted.
    pub async fn generate(&mut self) -> String {
        for _ in 0..constants::MAX_MINT_ATTEMPTS {
            let label = self.random_label();
            if !self.used.iter().any(|u| u == &label) {
                self.remember(label.clone()).await;
                return label;
            }
        }

        // Escape hatch: the set is saturated for this label space
        tracing::info!(
            attempts = constants::MAX_MINT_ATTEMPTS,
            "Used-name set exhausted regeneration attempts, clearing it"
        );
        self.used.clear();
        let label = self.random_label();
        self.remember(label.clone()).await;
        label
    }

    /// Full host name for a freshly minted label.
    pub async fn mint_origin(&mut self) -> String {
        let label = self.generate().await;
        format!("{}.{}", label, self.config.root_domain)
    }

    /// Whether `host` looks like a label this generator could have minted.
    pub fn is_minted_host(&self, host: &str) -> bool {
        self.minted_host.is_match(host)
    }

    pub fn used_len(&self) -> usize {
        self.used.len()
    }

    fn random_label(&self) -> String {
        let mut rng = rand::rng();
        (0..self.config.label_length)
            .map(|_| self.config.alphabet[rng.random_range(0..self.config.alphabet.len())])
            .collect()
    }

    async fn remember(&mut self, label: String) {
        self.used.push(label);
        if self.used.len() > self.config.cap {
            let excess = self.used.len() - self.config.keep;
            self.used.drain(..excess);
        }
        self.persist().await;
    }

    async fn persist(&self) {
        let raw = match serde_json::to_string(&self.used) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize used-name set");
                return;
            }
        };
        if let Err(e) = self.store.put(keys::USED_ENDPOINT_NAMES, &raw).await {
            // In-memory set stays authoritative for this execution
            tracing::warn!(error = %e, "Failed to persist used-name set");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn tiny_config(alphabet: &str, length: usize) -> NameGeneratorConfig {
        NameGeneratorConfig {
            root_domain: "example.com".to_string(),
            label_length: length,
            alphabet: alphabet.chars().collect(),
            cap: 100,
            keep: 50,
        }
    }

    #[tokio::test]
    async fn test_labels_distinct_before_reset() {
        let store = Arc::new(MemoryStore::new());
        let mut names =
            NameGenerator::load(store, tiny_config("abcdefghijklmnopqrstuvwxyz0123456789", 1))
                .await;

        // Ten draws from a space of 36 stay below the collision escape
        // hatch, so they must be pairwise distinct
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            assert!(seen.insert(names.generate().await));
        }
    }

    #[tokio::test]
    async fn test_exhaustion_clears_set_and_terminates() {
        // Single-label space: the second call must hit the escape hatch
        let store = Arc::new(MemoryStore::new());
        let mut names = NameGenerator::load(store, tiny_config("a", 1)).await;

        assert_eq!(names.generate().await, "a");
        assert_eq!(names.generate().await, "a");
        // Set was cleared, then the new label recorded
        assert_eq!(names.used_len(), 1);
    }

    #[tokio::test]
    async fn test_used_set_pruned_past_cap() {
        let store = Arc::new(MemoryStore::new());
        let mut config = tiny_config("abcdefghijklmnopqrstuvwxyz0123456789", 6);
        config.cap = 10;
        config.keep = 5;
        let mut names = NameGenerator::load(store, config).await;

        for _ in 0..11 {
            names.generate().await;
        }
        // The 11th insert tips the set past the cap and prunes it to keep
        assert_eq!(names.used_len(), 5);
    }

    #[tokio::test]
    async fn test_used_set_persists_and_reloads() {
        let store = Arc::new(MemoryStore::new());
        let config = tiny_config("ab", 2);

        let minted = {
            let mut names = NameGenerator::load(store.clone(), config.clone()).await;
            names.generate().await
        };

        let names = NameGenerator::load(store, config).await;
        assert_eq!(names.used_len(), 1);
        assert!(names.is_minted_host(&format!("{}.example.com", minted)));
    }

    #[tokio::test]
    async fn test_minted_host_recognition() {
        let store = Arc::new(MemoryStore::new());
        let names = NameGenerator::load(store, NameGeneratorConfig::default()).await;

        assert!(names.is_minted_host("abc123.example.com"));
        assert!(!names.is_minted_host("www.example.com"));
        assert!(!names.is_minted_host("abc123.example.org"));
        assert!(!names.is_minted_host("toolong1.example.com"));
        assert!(!names.is_minted_host("example.com"));
    }

    #[tokio::test]
    async fn test_corrupt_persisted_set_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(keys::USED_ENDPOINT_NAMES, "{broken")
            .await
            .unwrap();

        let names = NameGenerator::load(store, NameGeneratorConfig::default()).await;
        assert_eq!(names.used_len(), 0);
    }
}
