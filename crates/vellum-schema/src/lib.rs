//! # Vellum Schema
//!
//! Schema-driven conversion between store [`Record`]s and [`WireMessage`]s.
//!
//! A [`SchemaRegistry`] maps every message type to a table of field names and
//! [`FieldKind`]s. It is built once at startup and shared read-only. The
//! [`Marshaler`] walks records and messages depth-first, consulting the table
//! to decide how each field crosses the boundary:
//!
//! | Kind | Store side | Wire side |
//! |---|---|---|
//! | `NestedList` | array of documents | repeated message |
//! | `NestedObject` | document | message |
//! | `Identifier` | object id or string | string |
//! | `Timestamp` | datetime | timestamp |
//! | `DynamicMap` | document of scalars | map |
//! | `Plain` | scalar | scalar |
//!
//! Fields unknown to the schema are dropped. A value whose shape does not
//! match its declared kind fails the whole conversion with
//! [`MarshalError::KindMismatch`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vellum_core::Record;
//! use vellum_schema::{catalog, Marshaler};
//!
//! let marshaler = Marshaler::new(Arc::new(catalog::standard()));
//! let line = Record::new().with("uuid", "l-1").with("text", "TOTAL");
//! let wire = marshaler.encode(&line, catalog::LINE).unwrap();
//! assert_eq!(wire.get_str("text"), Some("TOTAL"));
//! assert_eq!(marshaler.decode(&wire).unwrap(), line);
//! ```
//!
//! [`Record`]: vellum_core::Record
//! [`WireMessage`]: vellum_core::WireMessage

#![doc(html_root_url = "https://docs.rs/vellum-schema/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod catalog;
mod error;
pub mod json;
mod marshal;
mod registry;

pub use error::{MarshalError, MarshalResult};
pub use marshal::Marshaler;
pub use registry::{
    FieldKind, FieldSpec, MessageSchema, MessageSchemaBuilder, PlainType, SchemaRegistry,
    SchemaRegistryBuilder,
};
