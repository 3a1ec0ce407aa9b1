//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub directory: DirectoryConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whether to expose interactive API docs (Swagger UI). Should be false in hardened production.
    pub enable_docs: bool,
    /// Global request timeout in seconds applied at the HTTP layer.
    pub request_timeout_seconds: u64,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the table store. Table subdirectories are created on demand.
    pub directory: PathBuf,
}

/// Tenant state cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Fallback TTL for entry types without an override.
    pub default_ttl_seconds: u64,
    /// Per-entry-type TTL overrides, keyed by entry type (e.g. "licenses").
    #[serde(default)]
    pub ttl_overrides: HashMap<String, u64>,
    /// Delay between background refresh tasks, to avoid bursting the upstream API.
    pub refresh_delay_ms: u64,
    /// Capacity of the background refresh queue. A full queue drops new refreshes.
    pub refresh_queue_capacity: usize,
    /// Interval between expired-entry sweeps.
    pub sweep_interval_seconds: u64,
}

/// Remote directory API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub base_url: String,
    /// Pre-acquired bearer token. Token acquisition is a collaborator concern.
    pub token: Option<String>,
    pub timeout_seconds: u64,
    /// Retries after the first attempt for transient and rate-limited failures.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

/// Detection orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// TTL of the in-memory snapshot served by repeated reads.
    pub list_cache_ttl_seconds: u64,
    /// Days without a sign-in before an enabled account counts as stale.
    pub stale_account_days: i64,
    /// Privileged role membership count above which a finding is raised.
    pub privileged_role_ceiling: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                enable_docs: true,
                request_timeout_seconds: 30,
            },
            storage: StorageConfig {
                directory: PathBuf::from(".postura_data"),
            },
            cache: CacheConfig {
                default_ttl_seconds: 1800,
                ttl_overrides: HashMap::from([
                    ("users".to_string(), 900),
                    ("licenses".to_string(), 1800),
                    ("directory_roles".to_string(), 900),
                    ("organization".to_string(), 3600),
                ]),
                refresh_delay_ms: 100,
                refresh_queue_capacity: 64,
                sweep_interval_seconds: 300,
            },
            directory: DirectoryConfig {
                base_url: "https://directory.example.com/v1".to_string(),
                token: None,
                timeout_seconds: 30,
                max_retries: 3,
                retry_base_delay_ms: 1000,
            },
            detection: DetectionConfig {
                list_cache_ttl_seconds: 30,
                stale_account_days: 90,
                privileged_role_ceiling: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("POSTURA").separator("__"));

        // Override with environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder.build()?.try_deserialize()
    }
}
