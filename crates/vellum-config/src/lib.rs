//! Typed configuration for Vellum servers.
//!
//! - TOML and JSON files
//! - `VELLUM__SECTION__KEY` environment overrides and `.env` files
//! - strict parsing: unknown fields are errors
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//!
//! [pool]
//! worker_threads = 32
//! max_in_flight = 160
//!
//! [scope]
//! privileged_identity = "root"
//! associate_key_field = "email"
//!
//! [identity]
//! mode = "remote"
//! endpoint = "http://identity:8080"
//!
//! [store]
//! seed_path = "fixtures/sample.json"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```

#![doc(html_root_url = "https://docs.rs/vellum-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::VellumConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX};
pub use schema::{
    CollectionNames, IdentityMode, IdentitySection, LogFormat, LoggingConfig, MetricsConfig,
    PoolConfig, ScopeSection, ServerConfig, StoreSection, TelemetrySection,
};
