//! Endpoint model: one alternate network name through which the resource is
//! reachable, plus its believed reachability state.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Believed reachability state of an endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Available,
    Blocked,
    Unknown,
}

impl Display for Liveness {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Liveness::Available => write!(f, "available"),
            Liveness::Blocked => write!(f, "blocked"),
            Liveness::Unknown => write!(f, "unknown"),
        }
    }
}

/// One replica name in the rotation. The apex domain itself is represented
/// by an empty label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub label: String,
    pub liveness: Liveness,
}

impl Endpoint {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            liveness: Liveness::Unknown,
        }
    }

    /// Full host name under the given root domain.
    pub fn origin(&self, root_domain: &str) -> String {
        if self.label.is_empty() {
            root_domain.to_string()
        } else {
            format!("{}.{}", self.label, root_domain)
        }
    }
}

/// Operator-facing snapshot of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub current: String,
    pub cursor: usize,
    pub total: usize,
    pub blocked: Vec<String>,
    pub available: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_joins_label_and_root() {
        let ep = Endpoint::new("abc123");
        assert_eq!(ep.origin("example.com"), "abc123.example.com");
    }

    #[test]
    fn test_origin_for_apex() {
        let ep = Endpoint::new("");
        assert_eq!(ep.origin("example.com"), "example.com");
    }
}
