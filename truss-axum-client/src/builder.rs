//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`TrussClient`].

use std::time::Duration;

use truss_axum_core::ContextKeys;
use url::Url;

use crate::ClientError;
use crate::client::TrussClient;
use crate::transport::HyperTransport;

/// Builder for creating a [`TrussClient`].
///
/// # Example
///
/// ```ignore
/// use truss_axum_client::ClientBuilder;
///
/// let client = ClientBuilder::new("http://localhost:3000")
///     .ctx_values_to_send(["Truss-Auth-Header"])
///     .build()?;
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    /// Base URL for the service (e.g., "http://localhost:3000").
    base_url: String,
    /// Context keys forwarded as request headers.
    ctx_values_to_send: ContextKeys,
    /// Default timeout for RPC calls.
    default_timeout: Option<Duration>,
    /// Optional pre-configured transport.
    transport: Option<HyperTransport>,
}

impl ClientBuilder {
    /// Create a new builder with the given base URL.
    ///
    /// The base URL holds the scheme, host and an optional path prefix.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            ctx_values_to_send: ContextKeys::new(),
            default_timeout: None,
            transport: None,
        }
    }

    /// Context keys whose values are sent as headers on every call.
    ///
    /// Keys accumulate across calls; duplicates (compared
    /// case-insensitively) are ignored. Context entries not listed here
    /// never leave the process.
    pub fn ctx_values_to_send<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.ctx_values_to_send.extend(keys);
        self
    }

    /// Set the default timeout for all RPC calls.
    ///
    /// Can be overridden per call with [`CallOptions::timeout`].
    ///
    /// [`CallOptions::timeout`]: crate::CallOptions::timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Use a pre-configured transport.
    pub fn transport(mut self, transport: HyperTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the base URL does not parse or
    /// is not an `http` URL.
    pub fn build(self) -> Result<TrussClient, ClientError> {
        let base_url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::Transport(format!("invalid base URL `{}`: {}", self.base_url, e))
        })?;

        if base_url.scheme() != "http" || base_url.cannot_be_a_base() {
            return Err(ClientError::Transport(format!(
                "unsupported base URL `{}`: expected http://host[:port][/prefix]",
                self.base_url
            )));
        }

        Ok(TrussClient::new(
            self.transport.unwrap_or_default(),
            base_url,
            self.ctx_values_to_send,
            self.default_timeout,
        ))
    }
}
