//! Transport test service.
//!
//! A small service exercising every binding the transport supports: query
//! scalars, repeated query values, a nested message body, context values
//! carried as headers and an always-failing method. The same module provides
//! the server router and a typed client.

use std::net::SocketAddr;

use axum::Router;
use serde::{Deserialize, Serialize};
use truss_axum::prelude::*;
use truss_axum_client::{ClientError, TrussClient};

/// Context key bridged between client and server as an HTTP header.
pub const AUTH_HEADER: &str = "Truss-Auth-Header";

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetWithQueryRequest {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
}

impl HttpMessage for GetWithQueryRequest {
    const SCHEMA: &'static MessageSchema = &MessageSchema {
        name: "GetWithQueryRequest",
        fields: &[
            FieldDescriptor::query("A", FieldKind::Scalar(Scalar::Int64)),
            FieldDescriptor::query("B", FieldKind::Scalar(Scalar::Int64)),
        ],
    };
}

/// Response carrying a single sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SumResponse {
    #[serde(rename = "V")]
    pub v: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetWithRepeatedQueryRequest {
    #[serde(rename = "A")]
    pub a: Vec<i64>,
}

impl HttpMessage for GetWithRepeatedQueryRequest {
    const SCHEMA: &'static MessageSchema = &MessageSchema {
        name: "GetWithRepeatedQueryRequest",
        fields: &[FieldDescriptor::query("A", FieldKind::Repeated(Scalar::Int64))],
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedMessage {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
}

const NESTED_MESSAGE: MessageSchema = MessageSchema {
    name: "NestedMessage",
    fields: &[
        FieldDescriptor::body("A", FieldKind::Scalar(Scalar::Int64)),
        FieldDescriptor::body("B", FieldKind::Scalar(Scalar::Int64)),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostWithNestedMessageBodyRequest {
    #[serde(rename = "NM")]
    pub nm: Option<NestedMessage>,
}

impl HttpMessage for PostWithNestedMessageBodyRequest {
    const SCHEMA: &'static MessageSchema = &MessageSchema {
        name: "PostWithNestedMessageBodyRequest",
        fields: &[FieldDescriptor::body(
            "NM",
            FieldKind::Message(&NESTED_MESSAGE),
        )],
    };
}

/// Names the context key whose value the server echoes back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaRequest {
    #[serde(rename = "Key")]
    pub key: String,
}

impl HttpMessage for MetaRequest {
    const SCHEMA: &'static MessageSchema = &MessageSchema {
        name: "MetaRequest",
        fields: &[FieldDescriptor::body("Key", FieldKind::Scalar(Scalar::String))],
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaResponse {
    #[serde(rename = "V")]
    pub v: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

impl HttpMessage for Empty {
    const SCHEMA: &'static MessageSchema = &MessageSchema {
        name: "Empty",
        fields: &[],
    };
}

// ============================================================================
// Routes
// ============================================================================

pub mod routes {
    use truss_axum::truss_axum_core::Route;

    pub fn get_with_query() -> Route {
        Route::get("/getwithquery")
    }

    pub fn get_with_repeated_query() -> Route {
        Route::get("/getwithrepeatedquery")
    }

    pub fn post_with_nested_message_body() -> Route {
        Route::post("/postwithnestedmessagebody")
    }

    pub fn ctx_to_ctx() -> Route {
        Route::post("/ctxtoctx")
    }

    pub fn error_rpc() -> Route {
        Route::get("/error")
    }
}

// ============================================================================
// Handlers
// ============================================================================

// Sums wrap on overflow, two's complement.

pub async fn get_with_query(
    _ctx: CallContext,
    req: GetWithQueryRequest,
) -> Result<SumResponse, RpcError> {
    Ok(SumResponse {
        v: req.a.wrapping_add(req.b),
    })
}

pub async fn get_with_repeated_query(
    _ctx: CallContext,
    req: GetWithRepeatedQueryRequest,
) -> Result<SumResponse, RpcError> {
    Ok(SumResponse {
        v: req.a.iter().fold(0, |acc, n| acc.wrapping_add(*n)),
    })
}

pub async fn post_with_nested_message_body(
    _ctx: CallContext,
    req: PostWithNestedMessageBodyRequest,
) -> Result<SumResponse, RpcError> {
    let nm = req
        .nm
        .ok_or_else(|| RpcError::invalid_argument("NM is required"))?;
    Ok(SumResponse {
        v: nm.a.wrapping_add(nm.b),
    })
}

/// Echo the context value stored under `req.key`; empty when absent.
pub async fn ctx_to_ctx(ctx: CallContext, req: MetaRequest) -> Result<MetaResponse, RpcError> {
    let v = ctx.get(&req.key).unwrap_or_default().to_owned();
    tracing::debug!(key = %req.key, present = !v.is_empty(), "ctx_to_ctx");
    Ok(MetaResponse { v })
}

pub async fn error_rpc(_ctx: CallContext, _req: Empty) -> Result<Empty, RpcError> {
    Err(RpcError::new("this error is intentional"))
}

// ============================================================================
// Server
// ============================================================================

/// The service with every route registered and [`AUTH_HEADER`] bridged.
pub fn service() -> TrussServiceBuilder {
    TrussServiceBuilder::new()
        .context_keys([AUTH_HEADER])
        .route(routes::get_with_query(), get_with_query)
        .route(routes::get_with_repeated_query(), get_with_repeated_query)
        .route(
            routes::post_with_nested_message_body(),
            post_with_nested_message_body,
        )
        .route(routes::ctx_to_ctx(), ctx_to_ctx)
        .route(routes::error_rpc(), error_rpc)
}

pub fn router() -> Result<Router, RouteError> {
    service().build()
}

/// Returns the server address from PORT env var, defaulting to 3000.
pub fn server_addr() -> Result<SocketAddr, std::net::AddrParseError> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    format!("0.0.0.0:{port}").parse()
}

// ============================================================================
// Client
// ============================================================================

/// Typed client for the transport test service.
#[derive(Debug, Clone)]
pub struct TransportServiceClient {
    inner: TrussClient,
}

impl TransportServiceClient {
    pub fn new(inner: TrussClient) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &TrussClient {
        &self.inner
    }

    pub async fn get_with_query(
        &self,
        ctx: &CallContext,
        req: &GetWithQueryRequest,
    ) -> Result<SumResponse, ClientError> {
        self.inner.call(ctx, &routes::get_with_query(), req).await
    }

    pub async fn get_with_repeated_query(
        &self,
        ctx: &CallContext,
        req: &GetWithRepeatedQueryRequest,
    ) -> Result<SumResponse, ClientError> {
        self.inner
            .call(ctx, &routes::get_with_repeated_query(), req)
            .await
    }

    pub async fn post_with_nested_message_body(
        &self,
        ctx: &CallContext,
        req: &PostWithNestedMessageBodyRequest,
    ) -> Result<SumResponse, ClientError> {
        self.inner
            .call(ctx, &routes::post_with_nested_message_body(), req)
            .await
    }

    pub async fn ctx_to_ctx(
        &self,
        ctx: &CallContext,
        req: &MetaRequest,
    ) -> Result<MetaResponse, ClientError> {
        self.inner.call(ctx, &routes::ctx_to_ctx(), req).await
    }

    pub async fn error_rpc(&self, ctx: &CallContext, req: &Empty) -> Result<Empty, ClientError> {
        self.inner.call(ctx, &routes::error_rpc(), req).await
    }
}
