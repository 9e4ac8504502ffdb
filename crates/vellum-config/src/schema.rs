//! Configuration sections.

use serde::{Deserialize, Serialize};

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Seconds to wait for open connections after a shutdown signal.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum number of open connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Keep-alive timeout in seconds. `None` disables keep-alive.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_connections: default_max_connections(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    10000
}

#[allow(clippy::unnecessary_wraps)]
fn default_keep_alive() -> Option<u64> {
    Some(60)
}

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Runtime worker threads.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Calls admitted at once. Calls over the cap are rejected.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_worker_threads() -> usize {
    32
}

fn default_max_in_flight() -> usize {
    160
}

/// Access scope settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScopeSection {
    /// Caller identity that sees every record.
    #[serde(default = "default_privileged_identity")]
    pub privileged_identity: String,

    /// Associate field whose values become the scope.
    #[serde(default = "default_associate_key_field")]
    pub associate_key_field: String,
}

impl Default for ScopeSection {
    fn default() -> Self {
        Self {
            privileged_identity: default_privileged_identity(),
            associate_key_field: default_associate_key_field(),
        }
    }
}

fn default_privileged_identity() -> String {
    "root".to_string()
}

fn default_associate_key_field() -> String {
    "email".to_string()
}

/// Where associates are looked up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// Read the directory collections of the local store.
    #[default]
    Local,
    /// Call a remote identity service.
    Remote,
}

/// Identity service client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct IdentitySection {
    /// Lookup mode.
    #[serde(default)]
    pub mode: IdentityMode,

    /// Base URL of the identity service. Required in remote mode.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in milliseconds. Client default when unset.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Connect timeout in milliseconds. Client default when unset.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

/// Store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// JSON fixture loaded into the in-memory store at startup.
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Collection name overrides.
    #[serde(default)]
    pub collections: CollectionNames,
}

/// Collection names. Unset names keep their built-in default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CollectionNames {
    /// OCR documents.
    #[serde(default)]
    pub documents: Option<String>,
    /// Document metadata.
    #[serde(default)]
    pub document_info: Option<String>,
    /// Transactions.
    #[serde(default)]
    pub transactions: Option<String>,
    /// Users.
    #[serde(default)]
    pub users: Option<String>,
    /// Branch offices.
    #[serde(default)]
    pub branch_offices: Option<String>,
    /// Organizations.
    #[serde(default)]
    pub organizations: Option<String>,
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or filter directive (`info`, `vellum_scope=debug,info`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable metrics collection.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus listener address. When unset, metrics are only served on
    /// the main listener's `/metrics`.
    #[serde(default)]
    pub addr: Option<String>,
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name reported in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "vellum".to_string()
}

fn default_true() -> bool {
    true
}
