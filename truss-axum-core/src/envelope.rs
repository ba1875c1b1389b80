//! The JSON error envelope: `{"error": "<message>"}`.
//!
//! Every failed request, whether binding or business, is answered with this
//! body and a non-2xx status derived from the error's [`Code`](crate::Code).

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Content type of every response body.
pub const APPLICATION_JSON: &str = "application/json";

/// Body used when the envelope itself cannot be serialized.
pub const INTERNAL_ERROR_BODY: &[u8] = br#"{"error":"internal error encoding failure"}"#;

/// Canonical failure body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl ErrorEnvelope {
    /// Build the envelope for an error. An empty message falls back to the
    /// code name so the `error` key is never empty.
    pub fn from_error(err: &RpcError) -> Self {
        let error = if err.message().is_empty() {
            err.code().as_str().to_owned()
        } else {
            err.message().to_owned()
        };
        Self { error }
    }

    /// Render an error as status and body. Never fails.
    pub fn encode(err: &RpcError) -> (StatusCode, Bytes) {
        match serde_json::to_vec(&Self::from_error(err)) {
            Ok(body) => (err.http_status(), Bytes::from(body)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode error envelope");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Bytes::from_static(INTERNAL_ERROR_BODY),
                )
            }
        }
    }

    /// Parse an envelope from a response body.
    ///
    /// Returns `None` when the body is not an envelope.
    pub fn decode(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}
