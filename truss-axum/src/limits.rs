//! Message size limits for transcoded requests and responses.
//!
//! - **Receive limit** (`receive_max_bytes`): bounds the request body read
//!   from the wire.
//! - **Send limit** (`send_max_bytes`): bounds the encoded JSON response.

use truss_axum_core::RpcError;

/// Default receive limit (4 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Request and response size limits.
///
/// # Example
///
/// ```rust
/// use truss_axum::MessageLimits;
///
/// let limits = MessageLimits::new()
///     .receive_max_bytes(16 * 1024 * 1024)
///     .send_max_bytes(8 * 1024 * 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageLimits {
    receive_max_bytes: Option<usize>,
    send_max_bytes: Option<usize>,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            receive_max_bytes: Some(DEFAULT_MAX_MESSAGE_SIZE),
            send_max_bytes: None,
        }
    }
}

impl MessageLimits {
    /// Default limits: 4 MB receive, unlimited send.
    pub fn new() -> Self {
        Self::default()
    }

    /// No limits in either direction.
    pub fn unlimited() -> Self {
        Self {
            receive_max_bytes: None,
            send_max_bytes: None,
        }
    }

    pub fn receive_max_bytes(mut self, max: usize) -> Self {
        self.receive_max_bytes = Some(max);
        self
    }

    /// Responses larger than `max` are replaced by a `resource_exhausted`
    /// error envelope.
    pub fn send_max_bytes(mut self, max: usize) -> Self {
        self.send_max_bytes = Some(max);
        self
    }

    pub fn get_receive_max_bytes(&self) -> Option<usize> {
        self.receive_max_bytes
    }

    pub fn get_send_max_bytes(&self) -> Option<usize> {
        self.send_max_bytes
    }

    /// Receive limit for `axum::body::to_bytes`; `usize::MAX` if unlimited.
    pub fn receive_max_bytes_or_max(&self) -> usize {
        self.receive_max_bytes.unwrap_or(usize::MAX)
    }

    /// Check an outgoing message size against the send limit.
    pub fn check_send_size(&self, size: usize) -> Result<(), RpcError> {
        if let Some(max) = self.send_max_bytes
            && size > max
        {
            return Err(RpcError::resource_exhausted(format!(
                "response size {size} bytes exceeds maximum allowed size of {max} bytes"
            )));
        }
        Ok(())
    }
}
