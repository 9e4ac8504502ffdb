//! # Vellum Scope
//!
//! Access scope resolution for Vellum services.
//!
//! Every call resolves its caller to a [`ScopeToken`](vellum_core::ScopeToken)
//! before touching the store:
//!
//! | Caller | Scope |
//! |---|---|
//! | privileged identity (`root` by default) | unrestricted |
//! | empty | nothing |
//! | anyone else | the `email` of every associate |
//!
//! Associates come from an [`IdentityLookup`]. [`DirectoryLookup`] walks the
//! directory collections of a store in-process; [`HttpIdentityClient`] asks a
//! remote identity service.
//!
//! Failures never widen the scope. A lookup error fails the call.

#![doc(html_root_url = "https://docs.rs/vellum-scope/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod directory;
mod error;
mod http;
mod lookup;
mod resolver;

pub use config::{IdentityClientConfig, ScopeConfig};
pub use directory::{DirectoryCollections, DirectoryLookup};
pub use error::{ScopeError, ScopeResult};
pub use http::HttpIdentityClient;
pub use lookup::IdentityLookup;
pub use resolver::ScopeResolver;
pub use vellum_core::ScopeToken;
