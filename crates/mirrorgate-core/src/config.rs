//! Configuration module
//!
//! Env-var driven configuration for the gateway service and for sync
//! contexts. Call `dotenvy::dotenv().ok()` at startup before `from_env`.

use std::env;

use crate::constants;

/// Configuration for the upload gateway service.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Root directory for uploaded assets.
    pub storage_path: String,
    /// Base URL under which stored assets are publicly reachable.
    pub storage_base_url: String,
    /// Directory holding the gateway's persisted pointer state.
    pub state_dir: String,
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb: usize = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpg,jpeg,png,gif,webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| {
                "image/jpeg,image/png,image/gif,image/webp".to_string()
            })
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        Ok(Self {
            server_port,
            cors_origins,
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "./uploads".to_string()),
            storage_base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/uploads", server_port)),
            state_dir: env::var("STATE_DIR").unwrap_or_else(|_| "./state".to_string()),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions,
            allowed_content_types,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            anyhow::bail!("MAX_FILE_SIZE_MB must be greater than zero");
        }
        if self.storage_path.is_empty() {
            anyhow::bail!("STORAGE_PATH must not be empty");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration for a sync context (reconciler, registry, redirect).
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Apex domain under which endpoints live.
    pub root_domain: String,
    /// Statically configured endpoint labels. The apex itself is addressed
    /// with an empty label.
    pub endpoints: Vec<String>,
    /// Base URL of the remote authority (upload gateway).
    pub api_url: String,
    pub sync_interval_secs: u64,
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub probe_path: String,
    pub label_length: usize,
    pub redirect_delay_ms: u64,
    pub redirect_throttle_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_domain: "example.com".to_string(),
            endpoints: Vec::new(),
            api_url: "http://localhost:3000".to_string(),
            sync_interval_secs: constants::DEFAULT_SYNC_INTERVAL_SECS,
            probe_interval_secs: constants::DEFAULT_PROBE_INTERVAL_SECS,
            probe_timeout_secs: constants::DEFAULT_PROBE_TIMEOUT_SECS,
            probe_path: constants::DEFAULT_PROBE_PATH.to_string(),
            label_length: constants::DEFAULT_LABEL_LENGTH,
            redirect_delay_ms: constants::DEFAULT_REDIRECT_DELAY_MS,
            redirect_throttle_secs: constants::DEFAULT_REDIRECT_THROTTLE_SECS,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let defaults = Self::default();

        let endpoints = env::var("ENDPOINTS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            root_domain: env::var("ROOT_DOMAIN").unwrap_or(defaults.root_domain),
            endpoints,
            api_url: env::var("MIRRORGATE_API_URL")
                .or_else(|_| env::var("API_URL"))
                .unwrap_or(defaults.api_url),
            sync_interval_secs: parse_env("SYNC_INTERVAL_SECS", defaults.sync_interval_secs),
            probe_interval_secs: parse_env("PROBE_INTERVAL_SECS", defaults.probe_interval_secs),
            probe_timeout_secs: parse_env("PROBE_TIMEOUT_SECS", defaults.probe_timeout_secs),
            probe_path: env::var("PROBE_PATH").unwrap_or(defaults.probe_path),
            label_length: parse_env("LABEL_LENGTH", defaults.label_length),
            redirect_delay_ms: parse_env("REDIRECT_DELAY_MS", defaults.redirect_delay_ms),
            redirect_throttle_secs: parse_env(
                "REDIRECT_THROTTLE_SECS",
                defaults.redirect_throttle_secs,
            ),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
