//! # truss-axum
//!
//! JSON-over-HTTP transcoding for RPC services, built on [Axum](https://github.com/tokio-rs/axum).
//!
//! Each RPC method is an async function `(CallContext, Request) -> Result<Response, E>`.
//! This crate serves it at an HTTP method and path template, binding the
//! request message from the path, query string, headers and JSON body, and
//! writing the response message (or a `{"error": "..."}` envelope) as JSON.
//!
//! ## Features
//!
//! - **Static field bindings:** every message type carries a
//!   [`MessageSchema`](truss_axum_core::MessageSchema) table naming where
//!   each field lives on the wire.
//! - **Context bridging:** configured context keys travel as HTTP headers.
//! - **One error shape:** binding failures and RPC failures render through
//!   the same error envelope.
//!
//! ## Getting Started
//!
//! See [`TrussServiceBuilder`] and the `truss-axum-examples` crate.

pub mod binding;
pub mod config;
pub mod error;
pub mod handler;
pub mod limits;
pub mod response;
pub mod service_builder;

pub use config::ServerConfig;
pub use error::RouteError;
pub use handler::TranscodeHandler;
pub use limits::MessageLimits;
pub use service_builder::TrussServiceBuilder;

// Re-export several crates
pub use serde;
pub use truss_axum_core;

pub mod prelude {
    //! A prelude for `truss-axum` providing the most common types.
    pub use crate::error::RouteError;
    pub use crate::limits::MessageLimits;
    pub use crate::service_builder::TrussServiceBuilder;
    pub use truss_axum_core::{
        Binding, CallContext, Code, FieldDescriptor, FieldKind, HttpMessage, MessageSchema,
        Route, RpcError, Scalar,
    };
}
