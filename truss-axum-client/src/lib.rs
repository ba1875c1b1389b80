//! HTTP client for services exposed through `truss-axum`.
//!
//! This crate encodes request messages onto their HTTP routes the same way
//! the server binds them: path placeholders, query parameters (repeated
//! values as JSON array literals), headers and a JSON body. Responses decode
//! into the response message, or into a [`ClientError`] when the server
//! answers with a `{"error": "..."}` envelope.
//!
//! ## Features
//!
//! - Context values travel as headers, but only for keys allow-listed with
//!   [`ClientBuilder::ctx_values_to_send`]
//! - Client-wide and per-call timeouts, reported as `deadline_exceeded`
//! - Optional `tracing` feature: every call runs inside an `rpc.call` span
//!
//! ## Example
//!
//! ```ignore
//! use truss_axum_client::TrussClient;
//! use truss_axum_core::{CallContext, Route};
//!
//! let client = TrussClient::builder("http://localhost:3000")
//!     .ctx_values_to_send(["Truss-Auth-Header"])
//!     .build()?;
//!
//! let ctx = CallContext::new().with_value("Truss-Auth-Header", "SECRET");
//! let response: MetaResponse = client
//!     .call(&ctx, &Route::post("/ctxtoctx"), &MetaRequest { key: "Truss-Auth-Header".into() })
//!     .await?;
//! ```
//!
//! ### Timeouts
//!
//! Set timeouts using [`ClientBuilder::timeout`] or [`CallOptions::timeout`].
//! The per-call value wins.

mod builder;
mod client;
mod error;
mod error_parser;
mod options;
pub mod request;
pub mod transport;

pub use builder::ClientBuilder;
pub use client::TrussClient;
pub use error::ClientError;
pub use error_parser::parse_error_response;
pub use options::CallOptions;
pub use transport::{HyperTransport, HyperTransportBuilder};

// Re-export core types for convenience
pub use truss_axum_core::{CallContext, Code, Route};
