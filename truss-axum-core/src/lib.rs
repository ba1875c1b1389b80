//! Core transcoding types for truss-axum.
//!
//! This crate provides the pieces shared by the server (`truss-axum`) and
//! client (`truss-axum-client`) crates.
//!
//! ## Modules
//!
//! - [`error`]: Error codes, RPC errors and binding errors
//! - [`schema`]: Field bindings and static message schemas
//! - [`route`]: HTTP method + path template pairs
//! - [`codec`]: Scalar, repeated and JSON field codecs
//! - [`context`]: Call context and the context/header bridge
//! - [`envelope`]: The `{"error": "..."}` failure envelope

mod codec;
mod context;
mod envelope;
mod error;
mod route;
mod schema;

pub use codec::*;
pub use context::*;
pub use envelope::*;
pub use error::*;
pub use route::*;
pub use schema::*;
