//! Server configuration: set once at startup, shared by every route.

use std::time::Duration;

use truss_axum_core::ContextKeys;

use crate::limits::MessageLimits;

/// Server-wide settings used by each route handler.
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    /// Context keys read from request headers.
    pub context_keys: ContextKeys,
    /// Message size limits.
    pub limits: MessageLimits,
    /// Upper bound on a single RPC invocation.
    pub timeout: Option<Duration>,
}
