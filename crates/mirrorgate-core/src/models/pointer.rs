//! Pointer model: the single shared reference value being kept consistent,
//! and the change-notification payload that travels between contexts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The current value of the shared reference with its last-update time.
/// One authoritative copy lives at the upload gateway; every other context
/// holds a possibly stale cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pointer {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl Pointer {
    pub fn new(value: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            updated_at,
        }
    }

    /// Last-write-wins ordering: true when `self` supersedes `other`.
    pub fn is_newer_than(&self, other: &Pointer) -> bool {
        self.updated_at > other.updated_at
    }
}

/// Where an adopted pointer value came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSource {
    /// Read from the same-origin persisted store.
    Local,
    /// Fetched from the remote authority.
    Remote,
    /// Received over a cross-context channel.
    Broadcast,
    /// Set directly by an operator action.
    Manual,
}

impl Display for UpdateSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UpdateSource::Local => write!(f, "local"),
            UpdateSource::Remote => write!(f, "remote"),
            UpdateSource::Broadcast => write!(f, "broadcast"),
            UpdateSource::Manual => write!(f, "manual"),
        }
    }
}

/// Change notification; also the cross-context wire message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    /// Wire discriminant; always `"pointerUpdated"`.
    #[serde(rename = "type", default = "PointerEvent::wire_type")]
    pub kind: String,
    pub value: String,
    pub source: UpdateSource,
    pub timestamp: DateTime<Utc>,
}

impl PointerEvent {
    pub const WIRE_TYPE: &'static str = "pointerUpdated";

    fn wire_type() -> String {
        Self::WIRE_TYPE.to_string()
    }

    pub fn new(pointer: &Pointer, source: UpdateSource) -> Self {
        Self {
            kind: Self::wire_type(),
            value: pointer.value.clone(),
            source,
            timestamp: pointer.updated_at,
        }
    }

    pub fn pointer(&self) -> Pointer {
        Pointer::new(self.value.clone(), self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_write_wins_ordering() {
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap();
        let a = Pointer::new("a", t1);
        let b = Pointer::new("b", t2);
        assert!(b.is_newer_than(&a));
        assert!(!a.is_newer_than(&b));
        assert!(!a.is_newer_than(&a));
    }

    #[test]
    fn test_event_wire_shape() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let event = PointerEvent::new(&Pointer::new("https://x/img.png", t), UpdateSource::Remote);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pointerUpdated");
        assert_eq!(json["source"], "remote");
        assert_eq!(json["value"], "https://x/img.png");
    }
}
