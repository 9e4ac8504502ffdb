//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, IdentityMode, LogFormat, VellumConfig};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "VELLUM";

/// Loads a [`VellumConfig`] in layers, later layers overriding earlier ones:
///
/// 1. defaults or a preset
/// 2. a TOML or JSON file
/// 3. a `.env` file
/// 4. `PREFIX__SECTION__KEY` environment variables
///
/// # Example
///
/// ```no_run
/// use vellum_config::ConfigLoader;
///
/// # fn main() -> Result<(), vellum_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("vellum.toml")?
///     .with_dotenv()?
///     .with_env_prefix("VELLUM")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: VellumConfig,
    env_prefix: Option<String>,
    vars: Option<Vec<(String, String)>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: VellumConfig::default(),
            env_prefix: None,
            vars: None,
        }
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = VellumConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = VellumConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file. The file replaces the current
    /// configuration; sections it omits take their defaults.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        self.config = parse(&content, &format)?;
        Ok(self)
    }

    /// Loads a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `format` (`toml` or `json`).
    ///
    /// # Example
    ///
    /// ```
    /// use vellum_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[pool]\nmax_in_flight = 8", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.pool.max_in_flight, 8);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Reads environment overrides with `prefix`, e.g. `VELLUM__POOL__MAX_IN_FLIGHT`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Uses `vars` instead of the process environment for overrides.
    #[must_use]
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Loads `.env` from the working directory into the process environment.
    /// A missing file is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(err) if err.not_found() => Ok(self),
            Err(err) => Err(ConfigError::Dotenv(err.to_string())),
        }
    }

    /// Applies environment overrides and validates.
    pub fn load(self) -> Result<VellumConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    pub fn load_unvalidated(mut self) -> Result<VellumConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars = self
                .vars
                .take()
                .unwrap_or_else(|| env::vars().collect());
            for (key, value) in vars {
                if let Some(path) = key
                    .strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_prefix("__"))
                {
                    apply_override(&mut self.config, &key, path, &value)?;
                }
            }
        }
        Ok(self.config)
    }
}

fn parse(content: &str, format: &str) -> Result<VellumConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn apply_override(
    config: &mut VellumConfig,
    key: &str,
    path: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let parts: Vec<&str> = path.split("__").collect();
    match parts.as_slice() {
        ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
        ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
            config.server.shutdown_timeout_secs = parse_num(key, value)?;
        }
        ["SERVER", "MAX_CONNECTIONS"] => config.server.max_connections = parse_num(key, value)?,
        ["SERVER", "KEEP_ALIVE_SECS"] => {
            config.server.keep_alive_secs = if value.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_num(key, value)?)
            };
        }

        ["POOL", "WORKER_THREADS"] => config.pool.worker_threads = parse_num(key, value)?,
        ["POOL", "MAX_IN_FLIGHT"] => config.pool.max_in_flight = parse_num(key, value)?,

        ["SCOPE", "PRIVILEGED_IDENTITY"] => config.scope.privileged_identity = value.to_string(),
        ["SCOPE", "ASSOCIATE_KEY_FIELD"] => config.scope.associate_key_field = value.to_string(),

        ["IDENTITY", "MODE"] => {
            config.identity.mode = match value.to_lowercase().as_str() {
                "local" => IdentityMode::Local,
                "remote" => IdentityMode::Remote,
                _ => return Err(ConfigError::env_parse_error(key, "expected 'local' or 'remote'")),
            };
        }
        ["IDENTITY", "ENDPOINT"] => config.identity.endpoint = non_empty(value),
        ["IDENTITY", "TIMEOUT_MS"] => config.identity.timeout_ms = Some(parse_num(key, value)?),
        ["IDENTITY", "CONNECT_TIMEOUT_MS"] => {
            config.identity.connect_timeout_ms = Some(parse_num(key, value)?);
        }

        ["STORE", "SEED_PATH"] => config.store.seed_path = non_empty(value),

        ["TELEMETRY", "SERVICE_NAME"] => config.telemetry.service_name = value.to_string(),
        ["TELEMETRY", "LOGGING", "ENABLED"] => {
            config.telemetry.logging.enabled = parse_bool(key, value)?;
        }
        ["TELEMETRY", "LOGGING", "LEVEL"] => config.telemetry.logging.level = value.to_string(),
        ["TELEMETRY", "LOGGING", "FORMAT"] => {
            config.telemetry.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
            };
        }
        ["TELEMETRY", "METRICS", "ENABLED"] => {
            config.telemetry.metrics.enabled = parse_bool(key, value)?;
        }
        ["TELEMETRY", "METRICS", "ADDR"] => config.telemetry.metrics.addr = non_empty(value),

        // Unknown keys belong to other tools sharing the prefix.
        _ => {}
    }
    Ok(())
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, VellumConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigLoader::new()
            .with_env_prefix(ENV_PREFIX)
            .with_vars([
                ("VELLUM__POOL__MAX_IN_FLIGHT", "12"),
                ("VELLUM__IDENTITY__MODE", "remote"),
                ("VELLUM__IDENTITY__ENDPOINT", "http://identity:9000"),
                ("VELLUM__TELEMETRY__LOGGING__FORMAT", "pretty"),
                ("VELLUM__SERVER__KEEP_ALIVE_SECS", "none"),
                ("OTHER__POOL__MAX_IN_FLIGHT", "1"),
            ])
            .load()
            .unwrap();
        assert_eq!(config.pool.max_in_flight, 12);
        assert_eq!(config.identity.mode, IdentityMode::Remote);
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
        assert_eq!(config.server.keep_alive_secs, None);
    }

    #[test]
    fn test_bad_env_value() {
        let err = ConfigLoader::new()
            .with_env_prefix(ENV_PREFIX)
            .with_vars([("VELLUM__POOL__WORKER_THREADS", "many")])
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));
    }

    #[test]
    fn test_vars_ignored_without_prefix() {
        let config = ConfigLoader::new()
            .with_vars([("VELLUM__POOL__MAX_IN_FLIGHT", "3")])
            .load()
            .unwrap();
        assert_eq!(config.pool.max_in_flight, 160);
    }

    #[test]
    fn test_env_overrides_are_validated() {
        let result = ConfigLoader::new()
            .with_env_prefix(ENV_PREFIX)
            .with_vars([("VELLUM__IDENTITY__MODE", "remote")])
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_unsupported_string_format() {
        let result = ConfigLoader::new().with_string("x: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = ConfigLoader::new().with_string("[authorization]\nenabled = true", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }
}
