//! Vellum Server - HTTP transport for the Vellum record services
//!
//! Exposes the `dataset`, `transactions` and `identity` services as
//! JSON-over-HTTP RPCs. Single-record replies are JSON objects; streamed
//! replies are newline-delimited JSON.
//!
//! # Architecture
//!
//! ```text
//!  client ──POST /{service}/{operation}──► Server ──► Dispatcher ──► Services
//!         ◄── JSON / NDJSON ─────────────          ◄── WireStream ──
//! ```
//!
//! - `x-caller-id` names the identity the call is made for
//! - `x-request-id` is echoed back, and generated when missing or not a UUID
//! - failures answer with an error envelope and a status matching the
//!   error category
//!
//! # Example Usage
//!
//! ```bash
//! $ vellum-server --config /etc/vellum/vellum.toml
//!
//! $ curl -s -X POST localhost:8080/dataset/listAll \
//!     -H 'x-caller-id: ana@acme.io' -d '{"limit": 10}'
//! ```

#![doc(html_root_url = "https://docs.rs/vellum-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod response;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use dispatch::{Dispatcher, Reply};
pub use error::{ServerError, ServerResult};
pub use health::{HealthCheck, HealthStatus, ReadinessStatus};
pub use routes::{Entity, Operation};
pub use server::Server;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
