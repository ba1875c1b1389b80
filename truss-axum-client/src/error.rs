//! Client-side error types.
//!
//! This module provides [`ClientError`], the error type for transcoded RPC calls.

use truss_axum_core::{Code, EncodeError};

/// Client-side error variants.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error envelope.
    #[error("{code}: {message}")]
    Status { code: Code, message: String },

    /// Transport-level error (connection failed, unreadable or non-envelope
    /// error response, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request message could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The response body could not be decoded into the response message.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Create a new status error with a code and message.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        ClientError::Status {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    ///
    /// For non-Status variants, returns an appropriate code:
    /// - Transport: `Unavailable`
    /// - Encode/Decode: `Internal`
    pub fn code(&self) -> Code {
        match self {
            ClientError::Status { code, .. } => *code,
            ClientError::Transport(_) => Code::Unavailable,
            ClientError::Encode(_) | ClientError::Decode(_) => Code::Internal,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        match self {
            ClientError::Status { message, .. }
            | ClientError::Transport(message)
            | ClientError::Encode(message)
            | ClientError::Decode(message) => message,
        }
    }

    /// Create a deadline exceeded error.
    pub fn deadline_exceeded<S: Into<String>>(message: S) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }
}

impl From<EncodeError> for ClientError {
    fn from(err: EncodeError) -> Self {
        ClientError::Encode(err.to_string())
    }
}
