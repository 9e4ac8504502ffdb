//! The root configuration type.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{
    ConfigError, IdentityMode, IdentitySection, LogFormat, PoolConfig, ScopeSection,
    ServerConfig, StoreSection, TelemetrySection,
};

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Complete Vellum server configuration.
///
/// # Example
///
/// ```
/// use vellum_config::VellumConfig;
///
/// let config = VellumConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.scope.privileged_identity, "root");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct VellumConfig {
    /// HTTP transport.
    #[serde(default)]
    pub server: ServerConfig,

    /// Worker pool.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Access scope.
    #[serde(default)]
    pub scope: ScopeSection,

    /// Identity lookup.
    #[serde(default)]
    pub identity: IdentitySection,

    /// Record store.
    #[serde(default)]
    pub store: StoreSection,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl VellumConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_addr("server.http_addr", &self.server.http_addr)?;

        if self.pool.worker_threads == 0 {
            return Err(ConfigError::invalid_value(
                "pool.worker_threads",
                "must be at least 1",
            ));
        }
        if self.pool.max_in_flight == 0 {
            return Err(ConfigError::invalid_value(
                "pool.max_in_flight",
                "must be at least 1",
            ));
        }

        if self.scope.privileged_identity.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "scope.privileged_identity",
                "must not be empty",
            ));
        }
        if self.scope.associate_key_field.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "scope.associate_key_field",
                "must not be empty",
            ));
        }

        if self.identity.mode == IdentityMode::Remote {
            match self.identity.endpoint.as_deref() {
                Some(endpoint)
                    if endpoint.starts_with("http://") || endpoint.starts_with("https://") => {}
                Some(endpoint) => {
                    return Err(ConfigError::invalid_value(
                        "identity.endpoint",
                        format!("not an http(s) URL: {endpoint}"),
                    ))
                }
                None => {
                    return Err(ConfigError::invalid_value(
                        "identity.endpoint",
                        "required when identity.mode is 'remote'",
                    ))
                }
            }
        }

        let logging = &self.telemetry.logging;
        if logging.enabled && !is_valid_filter(&logging.level) {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                format!("invalid level or directive: {}", logging.level),
            ));
        }

        if let Some(addr) = &self.telemetry.metrics.addr {
            if self.telemetry.metrics.enabled {
                parse_addr("telemetry.metrics.addr", addr)?;
            }
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, metrics on, local identity.
    ///
    /// # Example
    ///
    /// ```
    /// use vellum_config::VellumConfig;
    ///
    /// let config = VellumConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.server.shutdown_timeout_secs = 5;
        config.pool.worker_threads = 4;
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.metrics.enabled = true;
        config
    }

    /// Production preset: JSON info logs and metrics on.
    ///
    /// # Example
    ///
    /// ```
    /// use vellum_config::{LogFormat, VellumConfig};
    ///
    /// let config = VellumConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.metrics.enabled = true;
        config
    }
}

fn parse_addr(field: &str, addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.parse()
        .map_err(|_| ConfigError::invalid_value(field, format!("invalid socket address: {addr}")))
}

// Accepts a bare level or comma-separated `target=level` directives.
fn is_valid_filter(filter: &str) -> bool {
    !filter.trim().is_empty()
        && filter.split(',').all(|directive| {
            let level = directive.rsplit('=').next().unwrap_or_default().trim();
            LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(VellumConfig::default().validate().is_ok());
        assert!(VellumConfig::development().validate().is_ok());
        assert!(VellumConfig::production().validate().is_ok());
    }

    #[test]
    fn test_invalid_http_addr() {
        let mut config = VellumConfig::default();
        config.server.http_addr = "localhost".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.http_addr"));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let mut config = VellumConfig::default();
        config.pool.max_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_identity_needs_endpoint() {
        let mut config = VellumConfig::default();
        config.identity.mode = IdentityMode::Remote;
        assert!(config.validate().is_err());

        config.identity.endpoint = Some("identity:8080".to_string());
        assert!(config.validate().is_err());

        config.identity.endpoint = Some("http://identity:8080".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_directives() {
        assert!(is_valid_filter("info"));
        assert!(is_valid_filter("vellum_scope=debug,warn"));
        assert!(!is_valid_filter("loud"));
        assert!(!is_valid_filter(""));
    }

    #[test]
    fn test_empty_privileged_identity_rejected() {
        let mut config = VellumConfig::default();
        config.scope.privileged_identity = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scope.privileged_identity"));
    }

    #[test]
    fn test_metrics_addr_checked_only_when_enabled() {
        let mut config = VellumConfig::default();
        config.telemetry.metrics.addr = Some("nowhere".to_string());
        assert!(config.validate().is_ok());
        config.telemetry.metrics.enabled = true;
        assert!(config.validate().is_err());
    }
}
