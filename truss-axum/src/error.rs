//! Errors raised while assembling a service.

use truss_axum_core::{Route, SchemaError};

/// A route that cannot be served.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route `{route}`: {source}")]
    Schema {
        route: Route,
        #[source]
        source: SchemaError,
    },

    #[error("route `{0}` is registered more than once")]
    DuplicateRoute(Route),

    #[error("route `{0}`: unsupported HTTP method")]
    UnsupportedMethod(Route),

    #[error("route `{route}` names placeholder `{{{name}}}` where `{existing}` names `{{{existing_name}}}`")]
    ConflictingTemplate {
        route: Route,
        name: String,
        existing: Route,
        existing_name: String,
    },
}
