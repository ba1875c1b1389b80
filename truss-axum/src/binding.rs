//! Route binder: HTTP request parts to a typed request message.
//!
//! Fields are filled in schema order from their declared wire location.
//! Binding stops at the first malformed field, and a request either binds
//! completely or not at all.

use std::collections::HashMap;

use axum::http::{HeaderMap, Method};
use serde_json::{Map, Value};
use truss_axum_core::{
    Binding, BindingError, FieldDescriptor, FieldKind, HttpMessage, MessageSchema, RpcError,
    decode_json, decode_repeated, decode_scalar, method_has_body, zero_value,
};

/// Field name reported when a JSON object body is malformed.
const BODY_FIELD: &str = "body";

const BODY_EXCERPT_CHARS: usize = 256;

/// Everything the binder reads from one request.
#[derive(Clone, Copy, Debug)]
pub struct BindInput<'a> {
    pub method: &'a Method,
    /// Percent-decoded path captures, by placeholder name.
    pub path_params: &'a [(String, String)],
    /// Raw query string, without the leading `?`.
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

/// Why a request could not be bound.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindRejection {
    /// The request carries a malformed field.
    #[error(transparent)]
    Input(#[from] BindingError),

    /// The bound fields do not deserialize into the message type: the schema
    /// table and the Rust type disagree.
    #[error("message `{message}` does not match its schema: {reason}")]
    SchemaMismatch { message: &'static str, reason: String },
}

impl From<BindRejection> for RpcError {
    fn from(rejection: BindRejection) -> Self {
        match rejection {
            BindRejection::Input(err) => err.into(),
            BindRejection::SchemaMismatch { message, .. } => {
                RpcError::internal(format!("message `{message}` could not be materialized"))
            }
        }
    }
}

/// Bind a request to `T`.
pub fn bind<T: HttpMessage>(input: &BindInput<'_>) -> Result<T, BindRejection> {
    let fields = bind_fields(T::SCHEMA, input)?;
    serde_json::from_value(Value::Object(fields)).map_err(|e| {
        tracing::error!(
            target: "truss_axum",
            schema = T::SCHEMA.name,
            error = %e,
            "bound fields do not match the message type"
        );
        BindRejection::SchemaMismatch {
            message: T::SCHEMA.name,
            reason: e.to_string(),
        }
    })
}

/// Bind a request to a JSON object keyed by field name.
pub fn bind_fields(
    schema: &MessageSchema,
    input: &BindInput<'_>,
) -> Result<Map<String, Value>, BindingError> {
    // Later occurrences of a key overwrite earlier ones.
    let query: HashMap<String, String> = input
        .query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let mut body = if method_has_body(input.method) && schema.has_body() {
        parse_body(schema, input.body)?
    } else {
        None
    };

    let mut out = Map::new();
    for field in schema.fields {
        let value = match field.binding {
            Binding::Query => query
                .get(field.name)
                .map(|raw| decode_text(field, raw))
                .transpose()?,
            Binding::Path => input
                .path_params
                .iter()
                .find(|(name, _)| name == field.name)
                .map(|(_, raw)| decode_text(field, raw))
                .transpose()?,
            Binding::Header(name) => match input.headers.get(name) {
                Some(raw) => {
                    let raw = raw.to_str().map_err(|_| {
                        BindingError::type_mismatch(
                            field.name,
                            String::from_utf8_lossy(raw.as_bytes()),
                        )
                    })?;
                    if raw.is_empty() {
                        None
                    } else {
                        Some(decode_text(field, raw)?)
                    }
                }
                None => None,
            },
            Binding::Body => match body.as_mut() {
                Some(Value::Object(map)) => match map.remove(field.name) {
                    Some(raw) => decode_json(field.name, raw, field.kind)?,
                    None => None,
                },
                Some(other) => {
                    return Err(BindingError::malformed_body(BODY_FIELD, other.to_string()));
                }
                None => None,
            },
            Binding::BodyRoot => match body.take() {
                Some(raw) => decode_json(field.name, raw, field.kind)?,
                None => None,
            },
        };

        if let Some(value) = value.or_else(|| zero_value(field.kind)) {
            out.insert(field.name.to_owned(), value);
        }
    }

    Ok(out)
}

/// Decode a field from text: a query value, path capture or header.
fn decode_text(field: &FieldDescriptor, raw: &str) -> Result<Value, BindingError> {
    match field.kind {
        FieldKind::Scalar(scalar) => decode_scalar(field.name, raw, scalar),
        FieldKind::Repeated(scalar) => decode_repeated(field.name, raw, scalar),
        FieldKind::Message(_) => {
            let value = serde_json::from_str::<Value>(raw)
                .map_err(|_| BindingError::type_mismatch(field.name, raw))?;
            decode_json(field.name, value, field.kind)?
                .ok_or_else(|| BindingError::type_mismatch(field.name, raw))
        }
    }
}

/// Parse the request body. An empty or whitespace-only body yields `None`.
fn parse_body(schema: &MessageSchema, body: &[u8]) -> Result<Option<Value>, BindingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let field = schema.body_root().map_or(BODY_FIELD, |f| f.name);
    serde_json::from_slice(body).map(Some).map_err(|e| {
        tracing::debug!(target: "truss_axum", error = %e, "request body is not JSON");
        BindingError::malformed_body(field, body_excerpt(body))
    })
}

/// Body text for error reports, cut to [`BODY_EXCERPT_CHARS`] characters.
fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}
