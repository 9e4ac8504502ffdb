//! # Vellum Pipeline
//!
//! The scoped request pipeline shared by every Vellum service.
//!
//! A call moves through a fixed sequence:
//!
//! ```text
//! Idle -> ScopeResolved -> FilterBuilt -> Queried -> (Marshaling -> Emitting)* -> Done
//!                                                                   \-> Failed
//! ```
//!
//! The scope is resolved once per call and every store query of the call
//! runs under the filter built from it. Streams are lazy: records are read,
//! marshaled and emitted one at a time, and dropping a stream cancels the
//! call and releases its admission permit.
//!
//! Entities differ only by their [`EntityProfile`]; [`EntityService`] runs
//! the same pipeline for all of them. [`IdentityService`] adds the
//! directory operations that are not plain entity reads.

#![doc(html_root_url = "https://docs.rs/vellum-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod identity;
mod lines;
mod pool;
mod profile;
mod request;
mod service;
mod services;
mod state;

pub use identity::IdentityService;
pub use lines::{line_paths, plan_update, LineEdit};
pub use pool::{CallPermit, WorkerPool};
pub use profile::{EntityProfile, QualityRule, GOOD_GRADES};
pub use request::{
    AssociatesRequest, BranchOfficesRequest, GetManyRequest, GetOneRequest, ListRequest,
    MetricsReport, MetricsRequest, UpdateLinesRequest, UpdateLinesResponse,
};
pub use service::{EntityService, WireStream};
pub use services::{Collections, Dependencies, Services};
pub use state::{CallState, CallTracker};
