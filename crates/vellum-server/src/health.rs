//! Liveness and readiness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

/// `/health` body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `healthy` while the process answers.
    pub status: &'static str,
    /// Service name.
    pub service: String,
    /// Crate version.
    pub version: &'static str,
    /// Seconds since start.
    pub uptime_seconds: u64,
}

/// `/ready` body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReadinessStatus {
    /// Whether the server accepts calls.
    pub ready: bool,
    /// Calls currently admitted.
    pub in_flight: usize,
    /// Admission cap.
    pub max_in_flight: usize,
}

/// Shared health state.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    started: Instant,
    ready: Arc<AtomicBool>,
}

impl HealthCheck {
    /// Creates a ready health check for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            started: Instant::now(),
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Liveness.
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            service: self.service.clone(),
            version: crate::VERSION,
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }

    /// Whether the server accepts calls.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Flips readiness, e.g. to `false` when draining.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}
