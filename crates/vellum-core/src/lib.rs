//! # Vellum Core
//!
//! Foundational types shared by every Vellum service.
//!
//! - [`Record`] / [`Value`] - loosely typed nested store records
//! - [`ObjectId`] - the store-native 12-byte identifier
//! - [`WireMessage`] / [`WireValue`] - presence-aware typed wire messages
//! - [`ScopeToken`] - the visibility a caller has for one call
//! - [`VellumError`] - the service-level error taxonomy
//! - [`RequestContext`] / [`RequestId`] / [`CallerId`] - per-call state

#![doc(html_root_url = "https://docs.rs/vellum-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod scope;
mod value;
mod wire;

pub use context::{CallerId, RequestContext, RequestId};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, VellumError, VellumResult};
pub use scope::ScopeToken;
pub use value::{ObjectId, ObjectIdError, Record, Value};
pub use wire::{MapState, Scalar, Timestamp, WireMessage, WireValue};
