//! Axum handler wrapping one RPC method behind one route.
//!
//! Each request moves through `received -> bound -> invoked -> encoded`:
//! the body is read within the receive limit, the route binder and the
//! context bridge build the call, the RPC function runs (optionally under a
//! timeout), and the result is rendered as JSON or as an error envelope.

use std::{future::Future, pin::Pin, sync::Arc};

use axum::{
    extract::{FromRequestParts, RawPathParams, Request},
    handler::Handler,
    response::Response,
};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use serde::Serialize;
use tracing::Instrument;
use truss_axum_core::{CallContext, HttpMessage, Route, RpcError, from_headers};

use crate::binding::{BindInput, bind};
use crate::config::ServerConfig;
use crate::response::{error_response, message_response};

/// Adapts an RPC function `Fn(CallContext, Req) -> Future<Output = Result<Resp, E>>`
/// to axum's [`Handler`] trait.
#[derive(Clone)]
pub struct TranscodeHandler<F> {
    f: F,
    route: Arc<Route>,
    config: Arc<ServerConfig>,
}

impl<F> TranscodeHandler<F> {
    pub fn new(f: F, route: Route, config: Arc<ServerConfig>) -> Self {
        Self {
            f,
            route: Arc::new(route),
            config,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }
}

impl<F, Fut, Req, Resp, E, S> Handler<(CallContext, Req), S> for TranscodeHandler<F>
where
    F: Fn(CallContext, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, E>> + Send + 'static,
    Req: HttpMessage,
    Resp: Serialize + Send + 'static,
    E: Into<RpcError> + Send + 'static,
    S: Clone + Send + Sync + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, req: Request, state: S) -> Self::Future {
        let span = tracing::debug_span!(target: "truss_axum", "transcode", route = %self.route);
        Box::pin(
            async move {
                let (mut parts, body) = req.into_parts();

                let path_params: Vec<(String, String)> =
                    if self.route.placeholders().next().is_some() {
                        match RawPathParams::from_request_parts(&mut parts, &state).await {
                            Ok(params) => params
                                .iter()
                                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                                .collect(),
                            Err(rejection) => {
                                return error_response(&RpcError::invalid_argument(
                                    rejection.body_text(),
                                ));
                            }
                        }
                    } else {
                        Vec::new()
                    };

                // GET, HEAD and DELETE bodies are never read.
                let body = if self.route.has_body() && Req::SCHEMA.has_body() {
                    let limit = self.config.limits.receive_max_bytes_or_max();
                    match axum::body::to_bytes(body, limit).await {
                        Ok(bytes) => bytes,
                        Err(e) => return error_response(&body_read_error(e)),
                    }
                } else {
                    Bytes::new()
                };

                let ctx = from_headers(&parts.headers, &self.config.context_keys);
                let input = BindInput {
                    method: &parts.method,
                    path_params: &path_params,
                    query: parts.uri.query(),
                    headers: &parts.headers,
                    body: &body,
                };
                let request: Req = match bind(&input) {
                    Ok(request) => request,
                    Err(rejection) => {
                        tracing::debug!(target: "truss_axum", error = %rejection, "binding failed");
                        return error_response(&rejection.into());
                    }
                };
                tracing::debug!(target: "truss_axum", context_keys = ctx.len(), "request bound");

                let call = (self.f)(ctx, request);
                let result = match self.config.timeout {
                    Some(timeout) => match tokio::time::timeout(timeout, call).await {
                        Ok(result) => result.map_err(Into::into),
                        Err(_) => Err(RpcError::deadline_exceeded(format!(
                            "rpc exceeded server timeout of {timeout:?}"
                        ))),
                    },
                    None => call.await.map_err(Into::into),
                };

                match result {
                    Ok(message) => {
                        tracing::debug!(target: "truss_axum", "rpc succeeded");
                        message_response(&message, &self.config.limits)
                    }
                    Err(err) => {
                        tracing::debug!(
                            target: "truss_axum",
                            code = %err.code(),
                            error = err.message(),
                            "rpc failed"
                        );
                        error_response(&err)
                    }
                }
            }
            .instrument(span),
        )
    }
}

/// Classify a failed body read. Only an exceeded receive limit is
/// `ResourceExhausted`; a broken or aborted body is the caller's fault.
fn body_read_error(err: axum::Error) -> RpcError {
    let inner = err.into_inner();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(inner.as_ref());
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return RpcError::resource_exhausted(format!("request body too large: {cause}"));
        }
        source = cause.source();
    }
    tracing::debug!(target: "truss_axum", error = %inner, "request body read failed");
    RpcError::invalid_argument(format!("failed to read request body: {inner}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Method, StatusCode},
        routing::on,
        routing::MethodFilter,
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;
    use truss_axum_core::{ContextKeys, FieldDescriptor, FieldKind, MessageSchema, Scalar};

    use crate::limits::MessageLimits;

    #[derive(Debug, Serialize, Deserialize)]
    struct Sum {
        #[serde(rename = "A")]
        a: i64,
        #[serde(rename = "B")]
        b: i64,
    }

    impl HttpMessage for Sum {
        const SCHEMA: &'static MessageSchema = &MessageSchema {
            name: "Sum",
            fields: &[
                FieldDescriptor::query("A", FieldKind::Scalar(Scalar::Int64)),
                FieldDescriptor::query("B", FieldKind::Scalar(Scalar::Int64)),
            ],
        };
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Echo {
        id: String,
        text: String,
    }

    impl HttpMessage for Echo {
        const SCHEMA: &'static MessageSchema = &MessageSchema {
            name: "Echo",
            fields: &[
                FieldDescriptor::path("id", FieldKind::Scalar(Scalar::String)),
                FieldDescriptor::body("text", FieldKind::Scalar(Scalar::String)),
            ],
        };
    }

    #[derive(Serialize)]
    struct Total {
        #[serde(rename = "V")]
        v: i64,
    }

    async fn sum(_: CallContext, req: Sum) -> Result<Total, RpcError> {
        Ok(Total { v: req.a + req.b })
    }

    async fn echo(ctx: CallContext, req: Echo) -> Result<Echo, RpcError> {
        let text = match ctx.get("x-user") {
            Some(user) => format!("{user}: {}", req.text),
            None => req.text,
        };
        Ok(Echo { id: req.id, text })
    }

    async fn slow(_: CallContext, _: Sum) -> Result<Total, RpcError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Total { v: 0 })
    }

    fn app<F, T>(route: Route, config: ServerConfig, f: F) -> axum::Router
    where
        TranscodeHandler<F>: Handler<T, ()>,
        T: 'static,
    {
        let template = route.template().to_owned();
        let filter = MethodFilter::try_from(route.method().clone()).unwrap();
        axum::Router::new().route(
            &template,
            on(filter, TranscodeHandler::new(f, route, Arc::new(config))),
        )
    }

    async fn send(app: axum::Router, req: Request) -> (StatusCode, String) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_query_bound_call() {
        let app = app(Route::get("/sum"), ServerConfig::default(), sum);
        let req = Request::builder()
            .uri("/sum?A=12&B=45360")
            .body(Body::empty())
            .unwrap();

        assert_eq!(send(app, req).await, (StatusCode::OK, r#"{"V":45372}"#.into()));
    }

    #[tokio::test]
    async fn test_binding_error_skips_rpc() {
        async fn never(_: CallContext, _: Sum) -> Result<Total, RpcError> {
            panic!("rpc must not run on a binding error");
        }

        let app = app(Route::get("/sum"), ServerConfig::default(), never);
        let req = Request::builder()
            .uri("/sum?A=abc")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with(r#"{"error":"#));
        assert!(body.contains("`A`"));
    }

    #[tokio::test]
    async fn test_path_body_and_context() {
        let config = ServerConfig {
            context_keys: ["x-user"].into_iter().collect::<ContextKeys>(),
            ..ServerConfig::default()
        };
        let app = app(Route::post("/echo/{id}"), config, echo);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo/a%20b")
            .header("x-user", "ada")
            .body(Body::from(r#"{"text":"hi"}"#))
            .unwrap();

        assert_eq!(
            send(app, req).await,
            (StatusCode::OK, r#"{"id":"a b","text":"ada: hi"}"#.into())
        );
    }

    #[tokio::test]
    async fn test_unlisted_header_not_in_context() {
        let app = app(Route::post("/echo/{id}"), ServerConfig::default(), echo);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo/1")
            .header("x-user", "ada")
            .body(Body::from(r#"{"text":"hi"}"#))
            .unwrap();

        let (_, body) = send(app, req).await;
        assert_eq!(body, r#"{"id":"1","text":"hi"}"#);
    }

    #[tokio::test]
    async fn test_body_over_receive_limit() {
        let config = ServerConfig {
            limits: MessageLimits::new().receive_max_bytes(8),
            ..ServerConfig::default()
        };
        let app = app(Route::post("/echo/{id}"), config, echo);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo/1")
            .body(Body::from(r#"{"text":"far too long"}"#))
            .unwrap();

        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_server_timeout() {
        let config = ServerConfig {
            timeout: Some(Duration::from_millis(10)),
            ..ServerConfig::default()
        };
        let app = app(Route::get("/slow"), config, slow);
        let req = Request::builder()
            .uri("/slow")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert!(body.contains("server timeout"));
    }

    #[tokio::test]
    async fn test_rpc_error_is_enveloped() {
        async fn fails(_: CallContext, _: Sum) -> Result<Total, &'static str> {
            Err("always fails")
        }

        let app = app(Route::get("/fail"), ServerConfig::default(), fails);
        let req = Request::builder()
            .uri("/fail")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            send(app, req).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"always fails"}"#.into()
            )
        );
    }

    // ---- body read tests ----

    #[tokio::test]
    async fn test_body_limit_is_resource_exhausted() {
        let err = axum::body::to_bytes(Body::from("too long"), 2)
            .await
            .unwrap_err();
        let rpc = body_read_error(err);
        assert_eq!(rpc.code(), truss_axum_core::Code::ResourceExhausted);
        assert!(rpc.message().contains("too large"));
    }

    #[test]
    fn test_broken_body_is_invalid_argument() {
        let err = axum::Error::new(std::io::Error::other("connection reset"));
        let rpc = body_read_error(err);
        assert_eq!(rpc.code(), truss_axum_core::Code::InvalidArgument);
        assert!(rpc.message().contains("connection reset"));
    }

    // ---- schema mismatch tests ----

    #[derive(Debug, Serialize, Deserialize)]
    struct Mislabeled {
        #[serde(rename = "A")]
        a: u8,
    }

    impl HttpMessage for Mislabeled {
        const SCHEMA: &'static MessageSchema = &MessageSchema {
            name: "Mislabeled",
            fields: &[FieldDescriptor::query("A", FieldKind::Scalar(Scalar::Int64))],
        };
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_server_error() {
        async fn never(_: CallContext, _: Mislabeled) -> Result<Total, RpcError> {
            panic!("rpc must not run when the message cannot be built");
        }

        let app = app(Route::get("/mislabeled"), ServerConfig::default(), never);
        let req = Request::builder()
            .uri("/mislabeled?A=4096")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Mislabeled"));
    }
}
