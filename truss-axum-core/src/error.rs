//! Error codes and error types shared by client and server.
//!
//! - [`Code`]: Status classification carried by RPC errors
//! - [`RpcError`]: Failure returned by an RPC method
//! - [`BindingError`]: Malformed query, path, header or body input
//! - [`SchemaError`]: Inconsistent message schema or route template
//! - [`EncodeError`]: A message value that does not fit its schema

use std::fmt;

use http::StatusCode;

/// Error classification, matching the canonical RPC status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    /// HTTP status used when an error with this code is written to the wire.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Code::Canceled => StatusCode::REQUEST_TIMEOUT,
            Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::AlreadyExists => StatusCode::CONFLICT,
            Code::PermissionDenied => StatusCode::FORBIDDEN,
            Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            Code::FailedPrecondition => StatusCode::BAD_REQUEST,
            Code::Aborted => StatusCode::CONFLICT,
            Code::OutOfRange => StatusCode::BAD_REQUEST,
            Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
            Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    /// Map an HTTP status back to a code.
    ///
    /// The envelope carries no code of its own, so clients classify failures
    /// by the response status.
    pub fn from_http_status(status: StatusCode) -> Code {
        match status.as_u16() {
            400 => Code::InvalidArgument,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::NotFound,
            405 => Code::Unimplemented,
            408 => Code::DeadlineExceeded,
            409 => Code::AlreadyExists,
            412 => Code::FailedPrecondition,
            416 => Code::OutOfRange,
            429 => Code::ResourceExhausted,
            499 => Code::Canceled, // Client Closed Request (nginx)
            500 => Code::Internal,
            501 => Code::Unimplemented,
            502..=504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RpcError - failure returned by an RPC method
// ============================================================================

/// Failure returned by an RPC method.
///
/// Errors created with [`RpcError::new`] are unclassified ([`Code::Unknown`])
/// and render as HTTP 500. Use [`RpcError::with_code`] or one of the
/// convenience constructors to pick another status.
///
/// # Example
///
/// ```
/// use truss_axum_core::{Code, RpcError};
///
/// let err = RpcError::new("boom");
/// assert_eq!(err.code(), Code::Unknown);
/// assert_eq!(err.http_status().as_u16(), 500);
///
/// let err = RpcError::not_found("no such user");
/// assert_eq!(err.http_status().as_u16(), 404);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcError {
    code: Code,
    message: String,
}

impl RpcError {
    /// Create an unclassified error.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::Unknown, message)
    }

    /// Create an error with an explicit classification.
    pub fn with_code<S: Into<String>>(code: Code, message: S) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status for this error.
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::InvalidArgument, message)
    }

    /// Create a not found error.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::NotFound, message)
    }

    /// Create a permission denied error.
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::PermissionDenied, message)
    }

    /// Create an unauthenticated error.
    pub fn unauthenticated<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::Unauthenticated, message)
    }

    /// Create a deadline exceeded error.
    pub fn deadline_exceeded<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::DeadlineExceeded, message)
    }

    /// Create a resource exhausted error.
    pub fn resource_exhausted<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::ResourceExhausted, message)
    }

    /// Create an unimplemented error.
    pub fn unimplemented<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::Unimplemented, message)
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::Internal, message)
    }

    /// Create an unavailable error.
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::with_code(Code::Unavailable, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<String> for RpcError {
    fn from(message: String) -> Self {
        RpcError::new(message)
    }
}

impl From<&str> for RpcError {
    fn from(message: &str) -> Self {
        RpcError::new(message)
    }
}

impl From<std::convert::Infallible> for RpcError {
    fn from(infallible: std::convert::Infallible) -> Self {
        match infallible {}
    }
}

impl From<BindingError> for RpcError {
    fn from(err: BindingError) -> Self {
        RpcError::invalid_argument(err.to_string())
    }
}

// ============================================================================
// BindingError - malformed request input
// ============================================================================

/// What went wrong while binding a request field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// The value could not be parsed as the field's type.
    TypeMismatch,
    /// A repeated query value is not a JSON array literal.
    MalformedArray,
    /// The request body is not valid JSON.
    MalformedBody,
}

impl BindingErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingErrorKind::TypeMismatch => "type mismatch",
            BindingErrorKind::MalformedArray => "malformed array",
            BindingErrorKind::MalformedBody => "malformed body",
        }
    }
}

impl fmt::Display for BindingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request field that could not be bound.
///
/// Carries the field name and the raw offending value. Binding stops at the
/// first malformed field.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot bind field `{field}`: {kind}: {value:?}")]
pub struct BindingError {
    pub kind: BindingErrorKind,
    pub field: String,
    pub value: String,
}

impl BindingError {
    pub fn new<F, V>(kind: BindingErrorKind, field: F, value: V) -> Self
    where
        F: Into<String>,
        V: Into<String>,
    {
        Self {
            kind,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn type_mismatch<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        Self::new(BindingErrorKind::TypeMismatch, field, value)
    }

    pub fn malformed_array<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        Self::new(BindingErrorKind::MalformedArray, field, value)
    }

    pub fn malformed_body<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        Self::new(BindingErrorKind::MalformedBody, field, value)
    }
}

// ============================================================================
// SchemaError / EncodeError
// ============================================================================

/// A message schema or route template that cannot be served.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("message `{message}` declares field `{field}` more than once")]
    DuplicateField {
        message: &'static str,
        field: &'static str,
    },

    #[error("message `{message}`: body root field `{field}` must be the only body field")]
    BodyRootConflict {
        message: &'static str,
        field: &'static str,
    },

    #[error("route template `{template}` must start with '/' and use whole-segment `{{name}}` placeholders")]
    InvalidTemplate { template: String },

    #[error("route `{template}`: placeholder `{placeholder}` has no path field in `{message}`")]
    UnboundPlaceholder {
        template: String,
        placeholder: String,
        message: &'static str,
    },

    #[error("route `{template}`: path field `{field}` of `{message}` has no placeholder")]
    MissingPlaceholder {
        template: String,
        field: &'static str,
        message: &'static str,
    },

    #[error("route `{method} {template}`: `{message}` has body fields but {method} carries no body")]
    BodyNotAllowed {
        method: http::Method,
        template: String,
        message: &'static str,
    },
}

/// A message value that does not fit its declared field kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("message `{message}` did not serialize to a JSON object")]
    NotAnObject { message: &'static str },

    #[error("field `{field}` cannot be encoded as {expected}")]
    UnexpectedValue {
        field: String,
        expected: &'static str,
    },

    #[error("JSON encoding failed: {0}")]
    Json(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_as_str() {
        assert_eq!(Code::Unknown.as_str(), "unknown");
        assert_eq!(Code::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(Code::Unauthenticated.to_string(), "unauthenticated");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(Code::InvalidArgument.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(Code::Unknown.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Code::Internal.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Code::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(Code::DeadlineExceeded.http_status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(Code::ResourceExhausted.http_status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(Code::Unimplemented.http_status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(Code::Unavailable.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(Code::Unauthenticated.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Code::PermissionDenied.http_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(Code::from_http_status(StatusCode::BAD_REQUEST), Code::InvalidArgument);
        assert_eq!(Code::from_http_status(StatusCode::NOT_FOUND), Code::NotFound);
        assert_eq!(
            Code::from_http_status(StatusCode::INTERNAL_SERVER_ERROR),
            Code::Internal
        );
        assert_eq!(Code::from_http_status(StatusCode::BAD_GATEWAY), Code::Unavailable);
        assert_eq!(Code::from_http_status(StatusCode::IM_A_TEAPOT), Code::Unknown);
    }

    #[test]
    fn test_rpc_error_defaults_to_unknown() {
        let err = RpcError::new("something broke");
        assert_eq!(err.code(), Code::Unknown);
        assert_eq!(err.message(), "something broke");
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "unknown: something broke");
    }

    #[test]
    fn test_rpc_error_from_str() {
        let err: RpcError = "plain".into();
        assert_eq!(err.code(), Code::Unknown);

        let err: RpcError = String::from("owned").into();
        assert_eq!(err.message(), "owned");
    }

    #[test]
    fn test_binding_error_into_rpc_error() {
        let err = BindingError::type_mismatch("A", "abc");
        assert_eq!(err.to_string(), "cannot bind field `A`: type mismatch: \"abc\"");

        let rpc: RpcError = err.into();
        assert_eq!(rpc.code(), Code::InvalidArgument);
        assert_eq!(rpc.http_status(), StatusCode::BAD_REQUEST);
        assert!(rpc.message().contains("`A`"));
    }

    #[test]
    fn test_binding_error_kinds() {
        assert_eq!(
            BindingError::malformed_array("A", "1,2").kind,
            BindingErrorKind::MalformedArray
        );
        assert_eq!(
            BindingError::malformed_body("<body>", "eof").kind,
            BindingErrorKind::MalformedBody
        );
    }
}
