//! Prometheus metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `vellum_calls_total` | Counter | `service`, `operation`, `outcome` |
//! | `vellum_call_duration_seconds` | Histogram | `service`, `operation` |
//! | `vellum_stream_items_total` | Counter | `service`, `operation` |
//! | `vellum_scope_resolutions_total` | Counter | `kind` |
//! | `vellum_in_flight_calls` | Gauge | - |
//!
//! The recording functions are safe to call before [`init_metrics`]; the
//! `metrics` facade drops observations until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const CALLS_TOTAL: &str = "vellum_calls_total";
const CALL_DURATION: &str = "vellum_call_duration_seconds";
const STREAM_ITEMS: &str = "vellum_stream_items_total";
const SCOPE_RESOLUTIONS: &str = "vellum_scope_resolutions_total";
const IN_FLIGHT: &str = "vellum_in_flight_calls";

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are recorded.
    pub enabled: bool,
    /// Dedicated scrape listener. `None` keeps metrics in-process, rendered
    /// through [`render_metrics`].
    pub addr: Option<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: None,
        }
    }
}

/// Installs the Prometheus recorder.
///
/// With a listener address this must run inside a tokio runtime; the scrape
/// endpoint is served by a spawned task.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = match &config.addr {
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            let (recorder, exporter) = PrometheusBuilder::new()
                .with_http_listener(addr)
                .build()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            tokio::spawn(exporter);
            handle
        }
        None => PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?,
    };

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();
    Ok(())
}

/// Renders metrics in Prometheus text format, `None` before [`init_metrics`].
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(CALLS_TOTAL, "Completed calls by outcome");
    describe_histogram!(CALL_DURATION, "Call duration in seconds");
    describe_counter!(STREAM_ITEMS, "Messages emitted on streamed calls");
    describe_counter!(SCOPE_RESOLUTIONS, "Scope resolutions by token kind");
    describe_gauge!(IN_FLIGHT, "Calls currently holding a worker permit");
}

/// Records a finished call.
///
/// `outcome` is `ok`, `cancelled` or an error category label.
pub fn record_call(service: &str, operation: &str, outcome: &str, duration: Duration) {
    counter!(
        CALLS_TOTAL,
        "service" => service.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        CALL_DURATION,
        "service" => service.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records one emitted stream element.
pub fn record_stream_item(service: &str, operation: &str) {
    counter!(
        STREAM_ITEMS,
        "service" => service.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Records a scope resolution.
pub fn record_scope_resolution(kind: &'static str) {
    counter!(SCOPE_RESOLUTIONS, "kind" => kind).increment(1);
}

/// Holds the in-flight gauge up for its lifetime.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT).decrement(1.0);
    }
}
