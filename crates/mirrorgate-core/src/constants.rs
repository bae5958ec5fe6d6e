//! Shared constants and defaults.

/// Alphabet used for minted endpoint labels.
pub const LABEL_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a minted endpoint label.
pub const DEFAULT_LABEL_LENGTH: usize = 6;

/// Regeneration attempts before the used-name set is cleared.
pub const MAX_MINT_ATTEMPTS: usize = 10;

/// Used-name set is pruned when it grows past this size...
pub const USED_NAMES_CAP: usize = 100;
/// ...down to this many most recent entries.
pub const USED_NAMES_KEEP: usize = 50;

/// Reconciliation tick interval.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3;

/// Background probe pass interval.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 300;

/// Per-endpoint health probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Path probed on each endpoint; any response counts as reachable.
pub const DEFAULT_PROBE_PATH: &str = "api/files";

/// Delay between a redirect decision and the navigation.
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 1500;

/// Window during which a context will not redirect twice.
pub const DEFAULT_REDIRECT_THROTTLE_SECS: u64 = 300;

/// Default upload size cap (10 MB, matching the gateway's historical limit).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
