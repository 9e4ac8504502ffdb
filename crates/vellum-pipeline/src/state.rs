//! Per-call state machine.
//!
//! ```text
//! Idle → ScopeResolved → FilterBuilt → Queried → {Marshaling → Emitting}* → Done
//!   └──────────────┴──────────────┴──────────┴───────────┴──────────→ Failed
//! ```

use std::time::Instant;
use tracing::{debug, trace, warn};
use vellum_core::{RequestContext, RequestId, VellumError, VellumResult};

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Nothing done yet.
    Idle,
    /// The caller's scope is known.
    ScopeResolved,
    /// The query filter is built.
    FilterBuilt,
    /// The store query has been issued.
    Queried,
    /// A record is being converted.
    Marshaling,
    /// A message has been handed to the transport.
    Emitting,
    /// Completed.
    Done,
    /// Aborted with an error.
    Failed,
}

impl CallState {
    /// Returns `true` for `Done` and `Failed`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns whether `next` may follow `self`.
    pub const fn can_advance_to(self, next: Self) -> bool {
        use CallState::{
            Done, Emitting, Failed, FilterBuilt, Idle, Marshaling, Queried, ScopeResolved,
        };
        matches!(
            (self, next),
            (Idle, ScopeResolved)
                | (ScopeResolved, FilterBuilt)
                | (FilterBuilt, Queried)
                | (Queried | Marshaling | Emitting, Marshaling | Done)
                | (Marshaling, Emitting)
                | (Idle | ScopeResolved | FilterBuilt | Queried | Marshaling | Emitting, Failed)
        )
    }

    /// Label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScopeResolved => "scope_resolved",
            Self::FilterBuilt => "filter_built",
            Self::Queried => "queried",
            Self::Marshaling => "marshaling",
            Self::Emitting => "emitting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one call through [`CallState`] and records its outcome.
///
/// A tracker dropped before reaching a terminal state counts as cancelled,
/// which is what happens when a client disconnects mid-stream.
#[derive(Debug)]
pub struct CallTracker {
    service: String,
    operation: String,
    request_id: RequestId,
    state: CallState,
    started: Instant,
    emitted: u64,
}

impl CallTracker {
    /// Starts tracking a call in [`CallState::Idle`].
    pub fn start(ctx: &RequestContext) -> Self {
        trace!(request_id = %ctx.request_id(), operation = ctx.operation(), "call started");
        Self {
            service: ctx.service().to_string(),
            operation: ctx.operation().to_string(),
            request_id: ctx.request_id(),
            state: CallState::Idle,
            started: Instant::now(),
            emitted: 0,
        }
    }

    /// Returns the current state.
    pub const fn state(&self) -> CallState {
        self.state
    }

    /// Returns the number of messages emitted so far.
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Moves to `next`, rejecting moves the state machine does not allow.
    pub fn advance(&mut self, next: CallState) -> VellumResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(VellumError::internal(format!(
                "illegal call transition {} -> {}",
                self.state, next
            )));
        }
        trace!(request_id = %self.request_id, from = %self.state, to = %next, "call transition");
        if next == CallState::Emitting {
            self.emitted += 1;
            vellum_telemetry::record_stream_item(&self.service, &self.operation);
        }
        self.state = next;
        Ok(())
    }

    /// Moves to [`CallState::Done`] and records success.
    pub fn finish(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let Err(err) = self.advance(CallState::Done) {
            self.fail(&err);
            return;
        }
        debug!(
            request_id = %self.request_id,
            operation = %self.operation,
            emitted = self.emitted,
            duration_ms = self.started.elapsed().as_millis() as u64,
            "call completed"
        );
        vellum_telemetry::record_call(&self.service, &self.operation, "ok", self.started.elapsed());
    }

    /// Moves to [`CallState::Failed`] and records the error category.
    pub fn fail(&mut self, err: &VellumError) {
        if self.state.is_terminal() {
            return;
        }
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            state = %self.state,
            error = %err,
            "call failed"
        );
        self.state = CallState::Failed;
        vellum_telemetry::record_call(
            &self.service,
            &self.operation,
            err.category().as_str(),
            self.started.elapsed(),
        );
    }

    /// Finishes or fails according to `result`.
    pub fn settle<T>(&mut self, result: &VellumResult<T>) {
        match result {
            Ok(_) => self.finish(),
            Err(err) => self.fail(err),
        }
    }
}

impl Drop for CallTracker {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            debug!(
                request_id = %self.request_id,
                operation = %self.operation,
                state = %self.state,
                emitted = self.emitted,
                "call cancelled"
            );
            vellum_telemetry::record_call(
                &self.service,
                &self.operation,
                "cancelled",
                self.started.elapsed(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> CallTracker {
        CallTracker::start(&RequestContext::new("dataset", "listAll"))
    }

    #[test]
    fn test_streaming_walk() {
        let mut call = tracker();
        for state in [
            CallState::ScopeResolved,
            CallState::FilterBuilt,
            CallState::Queried,
            CallState::Marshaling,
            CallState::Emitting,
            CallState::Marshaling,
            CallState::Marshaling,
            CallState::Emitting,
        ] {
            call.advance(state).unwrap();
        }
        call.finish();
        assert_eq!(call.state(), CallState::Done);
        assert_eq!(call.emitted(), 2);
    }

    #[test]
    fn test_no_backwards_moves() {
        let mut call = tracker();
        call.advance(CallState::ScopeResolved).unwrap();
        call.advance(CallState::FilterBuilt).unwrap();
        assert!(call.advance(CallState::ScopeResolved).is_err());
        assert!(call.advance(CallState::Emitting).is_err());
        assert_eq!(call.state(), CallState::FilterBuilt);
    }

    #[test]
    fn test_skipping_the_query_is_rejected() {
        let mut call = tracker();
        call.advance(CallState::ScopeResolved).unwrap();
        assert!(call.advance(CallState::Queried).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut call = tracker();
        call.fail(&VellumError::internal("boom"));
        assert_eq!(call.state(), CallState::Failed);
        call.finish();
        assert_eq!(call.state(), CallState::Failed);
        assert!(call.advance(CallState::ScopeResolved).is_err());
    }

    #[test]
    fn test_finish_before_query_fails() {
        let mut call = tracker();
        call.advance(CallState::ScopeResolved).unwrap();
        call.finish();
        assert_eq!(call.state(), CallState::Failed);
    }

    #[test]
    fn test_settle() {
        let mut ok = tracker();
        for state in [CallState::ScopeResolved, CallState::FilterBuilt, CallState::Queried] {
            ok.advance(state).unwrap();
        }
        ok.settle(&Ok::<_, VellumError>(1));
        assert_eq!(ok.state(), CallState::Done);

        let mut failed = tracker();
        failed.settle(&Err::<(), _>(VellumError::invalid_request("bad")));
        assert_eq!(failed.state(), CallState::Failed);
    }
}
