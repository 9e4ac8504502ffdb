//! Bounded admission of in-flight calls.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::warn;
use vellum_core::{VellumError, VellumResult};
use vellum_telemetry::InFlightGuard;

/// Caps the number of calls in flight.
///
/// Calls over the cap are rejected immediately with a retryable error rather
/// than queued. A streamed call holds its permit until its stream is dropped.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_in_flight: usize,
}

/// Proof of admission. Releases its slot on drop.
#[derive(Debug)]
pub struct CallPermit {
    _permit: OwnedSemaphorePermit,
    _gauge: InFlightGuard,
}

impl WorkerPool {
    /// Default in-flight cap.
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 160;

    /// Creates a pool admitting up to `max_in_flight` calls.
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Admits one call.
    pub fn acquire(&self) -> VellumResult<CallPermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(CallPermit {
                _permit: permit,
                _gauge: InFlightGuard::new(),
            }),
            Err(TryAcquireError::NoPermits) => {
                warn!(max_in_flight = self.max_in_flight, "call rejected, pool saturated");
                Err(VellumError::dependency_unavailable(
                    "worker_pool",
                    format!("more than {} calls in flight", self.max_in_flight),
                ))
            }
            Err(TryAcquireError::Closed) => Err(VellumError::dependency_unavailable(
                "worker_pool",
                "server is shutting down",
            )),
        }
    }

    /// Calls currently admitted.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight
            .saturating_sub(self.semaphore.available_permits())
    }

    /// The in-flight cap.
    pub const fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Stops admitting calls. Admitted calls run to completion.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_IN_FLIGHT)
    }
}
