//! # Vellum Telemetry
//!
//! Logging and metrics for Vellum services.
//!
//! - **Logging**: a `tracing-subscriber` registry with an `EnvFilter` and
//!   JSON or pretty formatting
//! - **Metrics**: Prometheus-format metrics through the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use vellum_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! init_telemetry(&LogConfig::development(), &MetricsConfig::default())?;
//! tracing::info!(service = "dataset", "ready");
//! ```

#![doc(html_root_url = "https://docs.rs/vellum-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{
    init_metrics, record_call, record_scope_resolution, record_stream_item, render_metrics,
    InFlightGuard, MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
pub fn init_telemetry(logging: &LogConfig, metrics: &MetricsConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    init_metrics(metrics)?;
    Ok(())
}
