//! Error response parsing.
//!
//! Parses `{"error": "..."}` envelopes from a server into [`ClientError`].

use http::StatusCode;
use truss_axum_core::{Code, ErrorEnvelope};

use crate::ClientError;

/// Parse a non-2xx response body.
///
/// The envelope carries only a message; the code is derived from the HTTP
/// status. A body that is not an envelope becomes a
/// [`ClientError::Transport`] naming the status.
pub fn parse_error_response(status: StatusCode, body: &[u8]) -> ClientError {
    match ErrorEnvelope::decode(body) {
        Some(envelope) => ClientError::Status {
            code: Code::from_http_status(status),
            message: envelope.error,
        },
        None => {
            let reason = status.canonical_reason().unwrap_or("unknown status");
            ClientError::Transport(format!(
                "unexpected response: {} {reason} without an error envelope",
                status.as_u16()
            ))
        }
    }
}
