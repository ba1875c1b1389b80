//! HTTP responses for transcoded calls: JSON messages and error envelopes.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use serde::Serialize;
use truss_axum_core::{APPLICATION_JSON, ErrorEnvelope, INTERNAL_ERROR_BODY, RpcError};

use crate::limits::MessageLimits;

/// Encode a response message as a 200 JSON response.
///
/// Oversized responses become a `resource_exhausted` envelope.
pub fn message_response<T: Serialize>(message: &T, limits: &MessageLimits) -> Response {
    let body = match serde_json::to_vec(message) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(target: "truss_axum", error = %e, "failed to encode response message");
            return internal_error_response();
        }
    };
    if let Err(err) = limits.check_send_size(body.len()) {
        return error_response(&err);
    }
    json_response(StatusCode::OK, Bytes::from(body))
}

/// Render an error as its envelope, with the status mapped from its code.
pub fn error_response(err: &RpcError) -> Response {
    let (status, body) = ErrorEnvelope::encode(err);
    json_response(status, body)
}

/// Render an error envelope with an explicit status.
pub(crate) fn envelope_response(status: StatusCode, err: &RpcError) -> Response {
    let (_, body) = ErrorEnvelope::encode(err);
    json_response(status, body)
}

fn json_response(status: StatusCode, body: Bytes) -> Response {
    Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_JSON),
        )
        .body(Body::from(body))
        .unwrap_or_else(|_| internal_error_response())
}

/// A 500 response whose body is fixed and cannot fail to build.
pub(crate) fn internal_error_response() -> Response {
    let mut response = Response::new(Body::from(INTERNAL_ERROR_BODY));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_JSON),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde::ser::{Error as _, Serializer};

    async fn body_bytes(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[derive(Serialize)]
    struct Sum {
        #[serde(rename = "V")]
        v: i64,
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("boom"))
        }
    }

    #[tokio::test]
    async fn test_message_response() {
        let response = message_response(&Sum { v: 45372 }, &MessageLimits::default());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_JSON
        );
        assert_eq!(&body_bytes(response).await[..], br#"{"V":45372}"#);
    }

    #[tokio::test]
    async fn test_message_response_over_send_limit() {
        let limits = MessageLimits::new().send_max_bytes(4);
        let response = message_response(&Sum { v: 45372 }, &limits);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let envelope = ErrorEnvelope::decode(&body_bytes(response).await).unwrap();
        assert!(envelope.error.contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn test_message_response_encoding_failure() {
        let response = message_response(&Unencodable, &MessageLimits::default());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&body_bytes(response).await[..], INTERNAL_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_error_response() {
        let response = error_response(&RpcError::new("always fails"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            &body_bytes(response).await[..],
            br#"{"error":"always fails"}"#
        );
    }

    #[tokio::test]
    async fn test_envelope_response_keeps_status() {
        let response = envelope_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &RpcError::unimplemented("method not allowed"),
        );
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_internal_error_response() {
        let response = internal_error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_JSON
        );
    }
}
