//! Service builder: assembles RPC methods into one axum [`Router`].
//!
//! # Example
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use truss_axum::prelude::*;
//!
//! #[derive(Serialize, Deserialize)]
//! struct SumRequest {
//!     #[serde(rename = "A")]
//!     a: i64,
//!     #[serde(rename = "B")]
//!     b: i64,
//! }
//!
//! impl HttpMessage for SumRequest {
//!     const SCHEMA: &'static MessageSchema = &MessageSchema {
//!         name: "SumRequest",
//!         fields: &[
//!             FieldDescriptor::query("A", FieldKind::Scalar(Scalar::Int64)),
//!             FieldDescriptor::query("B", FieldKind::Scalar(Scalar::Int64)),
//!         ],
//!     };
//! }
//!
//! #[derive(Serialize)]
//! struct SumResponse {
//!     #[serde(rename = "V")]
//!     v: i64,
//! }
//!
//! async fn sum(_ctx: CallContext, req: SumRequest) -> Result<SumResponse, RpcError> {
//!     Ok(SumResponse { v: req.a + req.b })
//! }
//!
//! let app = TrussServiceBuilder::new()
//!     .route(Route::get("/sum"), sum)
//!     .build()
//!     .expect("valid routes");
//! # let _: axum::Router = app;
//! ```

use std::{any::Any, future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    http::StatusCode,
    response::Response,
    routing::{MethodFilter, MethodRouter},
};
use serde::Serialize;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use truss_axum_core::{CallContext, ContextKeys, HttpMessage, Route, RpcError};

use crate::config::ServerConfig;
use crate::error::RouteError;
use crate::handler::TranscodeHandler;
use crate::limits::MessageLimits;
use crate::response::{envelope_response, error_response};

type MakeMethodRouter<S> = Box<dyn FnOnce(Arc<ServerConfig>) -> MethodRouter<S> + Send>;

struct PendingRoute<S> {
    route: Route,
    make: MakeMethodRouter<S>,
}

/// Builder collecting routes and server settings.
///
/// Route problems (schema mismatches, duplicate or conflicting routes) are reported by
/// [`build`](Self::build), so routes can be chained freely.
pub struct TrussServiceBuilder<S = ()> {
    routes: Vec<PendingRoute<S>>,
    config: ServerConfig,
    error: Option<RouteError>,
}

impl<S> Default for TrussServiceBuilder<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> TrussServiceBuilder<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            config: ServerConfig::default(),
            error: None,
        }
    }

    /// Context keys read from request headers into each call's
    /// [`CallContext`]. Other headers are ignored.
    pub fn context_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.config.context_keys = keys.into_iter().collect::<ContextKeys>();
        self
    }

    /// Set custom message size limits.
    ///
    /// Default is 4 MB receive, unlimited send.
    pub fn message_limits(mut self, limits: MessageLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Bound each RPC invocation. Calls running longer fail with
    /// `deadline_exceeded`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Serve an RPC function on `route`.
    pub fn route<F, Fut, Req, Resp, E>(mut self, route: Route, handler: F) -> Self
    where
        F: Fn(CallContext, Req) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, E>> + Send + 'static,
        Req: HttpMessage,
        Resp: Serialize + Send + 'static,
        E: Into<RpcError> + Send + 'static,
    {
        if self.error.is_some() {
            return self;
        }

        if let Err(source) = route.check(Req::SCHEMA) {
            self.error = Some(RouteError::Schema { route, source });
            return self;
        }

        if self.routes.iter().any(|p| p.route == route) {
            self.error = Some(RouteError::DuplicateRoute(route));
            return self;
        }

        let conflict = self.routes.iter().find_map(|p| {
            route
                .placeholder_conflict(&p.route)
                .map(|(name, existing_name)| RouteError::ConflictingTemplate {
                    route: route.clone(),
                    name: name.to_owned(),
                    existing: p.route.clone(),
                    existing_name: existing_name.to_owned(),
                })
        });
        if let Some(err) = conflict {
            self.error = Some(err);
            return self;
        }

        let Ok(filter) = MethodFilter::try_from(route.method().clone()) else {
            self.error = Some(RouteError::UnsupportedMethod(route));
            return self;
        };

        let handler_route = route.clone();
        let make: MakeMethodRouter<S> = Box::new(move |config| {
            axum::routing::on::<_, (CallContext, Req), S>(
                filter,
                TranscodeHandler::new(handler, handler_route, config),
            )
        });
        self.routes.push(PendingRoute { route, make });
        self
    }

    /// Build the router.
    ///
    /// Methods sharing a template are merged onto one path. Unmatched methods
    /// on a known path answer 405 and unknown paths answer 404, both with an
    /// error envelope. A panicking RPC answers 500 with an envelope instead of
    /// dropping the connection. Requests are traced with `tower_http`'s
    /// `TraceLayer`.
    pub fn build(self) -> Result<Router<S>, RouteError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let config = Arc::new(self.config);

        let mut by_template: Vec<(String, MethodRouter<S>)> = Vec::new();
        for pending in self.routes {
            let method_router = (pending.make)(config.clone());
            let template = pending.route.template();
            match by_template.iter().position(|(t, _)| t == template) {
                Some(i) => {
                    let (t, existing) = by_template.swap_remove(i);
                    by_template.push((t, existing.merge(method_router)));
                }
                None => by_template.push((template.to_owned(), method_router)),
            }
            tracing::debug!(target: "truss_axum", route = %pending.route, "route registered");
        }

        let router = by_template
            .into_iter()
            .fold(Router::new(), |router, (template, method_router)| {
                router.route(&template, method_router.fallback(method_not_allowed))
            });

        Ok(router
            .fallback(not_found)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http()))
    }
}

async fn method_not_allowed() -> Response {
    envelope_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &RpcError::unimplemented("method not allowed"),
    )
}

async fn not_found() -> Response {
    envelope_response(StatusCode::NOT_FOUND, &RpcError::not_found("no such route"))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(target: "truss_axum", panic = detail, "rpc panicked");
    error_response(&RpcError::internal("internal error"))
}
