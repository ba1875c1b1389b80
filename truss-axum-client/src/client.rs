//! The transcoding RPC client.

use std::time::Duration;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use truss_axum_core::{CallContext, ContextKeys, HttpMessage, Route, to_headers};
use url::Url;

#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

use crate::builder::ClientBuilder;
use crate::error_parser::parse_error_response;
use crate::options::CallOptions;
use crate::request::encode_request;
use crate::transport::HyperTransport;
use crate::ClientError;

/// Client for services exposed through `truss-axum`.
///
/// A call encodes the request message onto its route (path, query, headers
/// and JSON body), attaches the allow-listed context values as headers and
/// decodes either the response message or the error envelope.
///
/// Use [`ClientBuilder`] or [`TrussClient::builder`] to create an instance.
///
/// # Example
///
/// ```ignore
/// use truss_axum_client::TrussClient;
/// use truss_axum_core::{CallContext, Route};
///
/// let client = TrussClient::builder("http://localhost:3000").build()?;
///
/// let response: SumResponse = client
///     .call(&CallContext::new(), &Route::get("/sum"), &SumRequest { a: 1, b: 2 })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct TrussClient {
    /// HTTP transport.
    transport: HyperTransport,
    /// Base URL for the service.
    base_url: Url,
    /// Context keys forwarded as headers.
    ctx_values_to_send: ContextKeys,
    /// Default timeout for RPC calls.
    default_timeout: Option<Duration>,
}

impl TrussClient {
    /// Create a new ClientBuilder with the given base URL.
    ///
    /// This is a convenience method equivalent to `ClientBuilder::new(base_url)`.
    pub fn builder<S: Into<String>>(base_url: S) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub(crate) fn new(
        transport: HyperTransport,
        base_url: Url,
        ctx_values_to_send: ContextKeys,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            base_url,
            ctx_values_to_send,
            default_timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn ctx_values_to_send(&self) -> &ContextKeys {
        &self.ctx_values_to_send
    }

    /// Call the RPC served at `route`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Status`] when the server answers with an error envelope,
    ///   or when the call outlives the configured timeout (`deadline_exceeded`).
    /// - [`ClientError::Transport`] for connection failures and non-2xx
    ///   responses without an envelope.
    /// - [`ClientError::Encode`] / [`ClientError::Decode`] when a message does
    ///   not fit its schema or the response body is not the expected message.
    pub async fn call<Req, Res>(
        &self,
        ctx: &CallContext,
        route: &Route,
        request: &Req,
    ) -> Result<Res, ClientError>
    where
        Req: HttpMessage,
        Res: DeserializeOwned,
    {
        self.call_with_options(ctx, route, request, CallOptions::default())
            .await
    }

    /// Call the RPC served at `route` with per-call options.
    pub async fn call_with_options<Req, Res>(
        &self,
        ctx: &CallContext,
        route: &Route,
        request: &Req,
        options: CallOptions,
    ) -> Result<Res, ClientError>
    where
        Req: HttpMessage,
        Res: DeserializeOwned,
    {
        let call = self.execute(ctx, route, request, options);

        #[cfg(feature = "tracing")]
        let call = call.instrument(info_span!(
            "rpc.call",
            rpc.method = %route.method(),
            rpc.route = %route.template(),
            rpc.message = Req::SCHEMA.name,
            otel.kind = "client",
        ));

        call.await
    }

    async fn execute<Req, Res>(
        &self,
        ctx: &CallContext,
        route: &Route,
        request: &Req,
        options: CallOptions,
    ) -> Result<Res, ClientError>
    where
        Req: HttpMessage,
        Res: DeserializeOwned,
    {
        // 1. Lay the message out onto the route
        let encoded = encode_request(&self.base_url, route, request)?;

        // 2. Build headers: message fields, then context, then per-call extras
        let mut headers = encoded.headers;
        headers.extend(to_headers(ctx, &self.ctx_values_to_send));
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut req = Request::builder()
            .method(encoded.method)
            .uri(encoded.url.as_str())
            .body(Full::new(encoded.body))
            .map_err(|e| ClientError::Encode(format!("failed to build request: {}", e)))?;
        *req.headers_mut() = headers;

        // 3. Send and read the whole response (with client-side timeout if configured)
        let exchange = self.exchange(req);
        let (status, body) = match options.timeout.or(self.default_timeout) {
            Some(t) => timeout(t, exchange)
                .await
                .map_err(|_| ClientError::deadline_exceeded("client timeout exceeded"))??,
            None => exchange.await?,
        };

        // 4. Decode the message or the error envelope
        if !status.is_success() {
            return Err(parse_error_response(status, &body));
        }
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::Decode(format!("failed to decode response: {}", e)))
    }

    async fn exchange(&self, req: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), ClientError> {
        let response = self.transport.request(req).await?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to read response body: {}", e)))?
            .to_bytes();
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use serde::{Deserialize, Serialize};
    use truss_axum::TrussServiceBuilder;
    use truss_axum_core::{Code, FieldDescriptor, FieldKind, MessageSchema, RpcError, Scalar};

    #[derive(Debug, Serialize, Deserialize)]
    struct Echo {
        #[serde(rename = "Msg")]
        msg: String,
    }

    impl HttpMessage for Echo {
        const SCHEMA: &'static MessageSchema = &MessageSchema {
            name: "Echo",
            fields: &[FieldDescriptor::query("Msg", FieldKind::Scalar(Scalar::String))],
        };
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Whoami {
        #[serde(rename = "V")]
        v: String,
    }

    async fn echo(_: CallContext, req: Echo) -> Result<Echo, RpcError> {
        Ok(req)
    }

    async fn whoami(ctx: CallContext, _: Echo) -> Result<Whoami, RpcError> {
        Ok(Whoami {
            v: ctx.get("X-User").unwrap_or_default().to_owned(),
        })
    }

    async fn slow(_: CallContext, req: Echo) -> Result<Echo, RpcError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(req)
    }

    async fn refuse(_: CallContext, _: Echo) -> Result<Echo, RpcError> {
        Err(RpcError::permission_denied("no"))
    }

    async fn serve() -> String {
        let app: Router = TrussServiceBuilder::new()
            .context_keys(["X-User"])
            .route(Route::get("/echo"), echo)
            .route(Route::get("/whoami"), whoami)
            .route(Route::get("/slow"), slow)
            .route(Route::get("/refuse"), refuse)
            .build()
            .unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn msg(s: &str) -> Echo {
        Echo { msg: s.to_owned() }
    }

    // ---- call tests ----

    #[tokio::test]
    async fn test_call_round_trip() {
        let client = TrussClient::builder(serve().await).build().unwrap();
        let out: Echo = client
            .call(&CallContext::new(), &Route::get("/echo"), &msg("a b&c"))
            .await
            .unwrap();
        assert_eq!(out.msg, "a b&c");
    }

    #[tokio::test]
    async fn test_context_only_sent_when_allow_listed() {
        let base = serve().await;
        let ctx = CallContext::new().with_value("X-User", "ada");

        let client = TrussClient::builder(base.clone())
            .ctx_values_to_send(["X-User"])
            .build()
            .unwrap();
        let out: Whoami = client
            .call(&ctx, &Route::get("/whoami"), &msg(""))
            .await
            .unwrap();
        assert_eq!(out.v, "ada");

        let client = TrussClient::builder(base).build().unwrap();
        let out: Whoami = client
            .call(&ctx, &Route::get("/whoami"), &msg(""))
            .await
            .unwrap();
        assert_eq!(out.v, "");
    }

    #[tokio::test]
    async fn test_error_envelope_becomes_status() {
        let client = TrussClient::builder(serve().await).build().unwrap();
        let err = client
            .call::<_, Echo>(&CallContext::new(), &Route::get("/refuse"), &msg(""))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::new(Code::PermissionDenied, "no"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let client = TrussClient::builder(serve().await).build().unwrap();
        let err = client
            .call::<_, Echo>(&CallContext::new(), &Route::get("/missing"), &msg(""))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_timeout_is_deadline_exceeded() {
        let client = TrussClient::builder(serve().await).build().unwrap();
        let err = client
            .call_with_options::<_, Echo>(
                &CallContext::new(),
                &Route::get("/slow"),
                &msg(""),
                CallOptions::new().timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let client = TrussClient::builder(serve().await).build().unwrap();
        let err = client
            .call::<_, Whoami>(&CallContext::new(), &Route::get("/echo"), &msg("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = TrussClient::builder("http://127.0.0.1:1").build().unwrap();
        let err = client
            .call::<_, Echo>(&CallContext::new(), &Route::get("/echo"), &msg(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
