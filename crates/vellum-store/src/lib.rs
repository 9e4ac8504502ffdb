//! # Vellum Store
//!
//! The document store boundary of Vellum services.
//!
//! - [`Store`] - async query interface (`find_one`, `find_many`, `count`,
//!   `update_one`)
//! - [`QueryFilter`] / [`Predicate`] - store-agnostic conjunctive filters
//! - [`FilterBuilder`] - pure composition of an access scope and request
//!   parameters into a filter
//! - [`MemoryStore`] - in-process engine for tests and local runs
//! - [`fixtures`] - sample directory and business records

#![doc(html_root_url = "https://docs.rs/vellum-store/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod error;
mod filter;
pub mod fixtures;
mod memory;
mod store;

pub use builder::{DateRange, FilterBuilder, FilterFields, FilterParams, MatchPresence};
pub use error::{FilterError, StoreError, StoreResult};
pub use filter::{compare, Predicate, QueryFilter};
pub use memory::MemoryStore;
pub use store::{FieldUpdate, FindOptions, RecordStream, SortDirection, SortKey, Store};
