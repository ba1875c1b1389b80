//! Request encoding: a message value laid out onto an HTTP request.
//!
//! Each field goes where its [`Binding`] says: path fields fill their
//! template placeholders, query fields become `key=value` pairs in
//! declaration order, header fields become headers and body fields form the
//! JSON body. Repeated fields are written as JSON array literals. Fields whose
//! value serializes to `null` are left out.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use serde_json::{Map, Value};
use truss_axum_core::{
    APPLICATION_JSON, Binding, EncodeError, FieldDescriptor, FieldKind, HttpMessage, Route,
    Segment, encode_repeated, encode_scalar,
};
use url::Url;

use crate::ClientError;

/// The HTTP shape of one request message.
#[derive(Debug, Clone)]
pub struct EncodedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Encode `message` for `route`, resolving the path against `base`.
pub fn encode_request<Req: HttpMessage>(
    base: &Url,
    route: &Route,
    message: &Req,
) -> Result<EncodedRequest, ClientError> {
    let schema = Req::SCHEMA;
    route
        .check(schema)
        .map_err(|e| ClientError::Encode(e.to_string()))?;

    let value = serde_json::to_value(message).map_err(|e| EncodeError::Json(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(EncodeError::NotAnObject {
            message: schema.name,
        }
        .into());
    };

    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ClientError::Encode(format!("base URL `{base}` cannot carry a path")))?;
        segments.pop_if_empty();
        for segment in route.segments() {
            match segment {
                Segment::Literal(literal) => {
                    segments.push(literal);
                }
                Segment::Placeholder(name) => {
                    let text = schema
                        .field(name)
                        .map(|field| encode_text(field, fields.get(name).unwrap_or(&Value::Null)))
                        .transpose()?
                        .flatten()
                        .ok_or_else(|| EncodeError::UnexpectedValue {
                            field: name.to_owned(),
                            expected: "a value for its path placeholder",
                        })?;
                    segments.push(&text);
                }
            }
        }
    }

    let mut query = Vec::new();
    let mut headers = HeaderMap::new();
    for field in schema.fields {
        let value = fields.get(field.name).unwrap_or(&Value::Null);
        match field.binding {
            Binding::Query => {
                if let Some(text) = encode_text(field, value)? {
                    query.push((field.name, text));
                }
            }
            Binding::Header(name) => {
                if let Some(text) = encode_text(field, value)? {
                    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                        ClientError::Encode(format!("invalid header name `{name}`"))
                    })?;
                    let value = HeaderValue::from_str(&text).map_err(|_| {
                        ClientError::Encode(format!(
                            "field `{}` is not a valid header value",
                            field.name
                        ))
                    })?;
                    headers.insert(name, value);
                }
            }
            Binding::Path | Binding::Body | Binding::BodyRoot => {}
        }
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let body = match schema.body_root() {
        Some(root) => match fields.remove(root.name) {
            Some(value) if !value.is_null() => Some(strip_nulls(value)),
            _ => None,
        },
        None if schema.has_body() => {
            let mut object = Map::new();
            for field in schema.fields.iter().filter(|f| f.binding == Binding::Body) {
                if let Some(value) = fields.remove(field.name).filter(|v| !v.is_null()) {
                    object.insert(field.name.to_owned(), strip_nulls(value));
                }
            }
            Some(Value::Object(object))
        }
        None => None,
    };

    let body = match body {
        Some(value) => {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
            serde_json::to_vec(&value)
                .map(Bytes::from)
                .map_err(|e| EncodeError::Json(e.to_string()))?
        }
        None => Bytes::new(),
    };

    Ok(EncodedRequest {
        method: route.method().clone(),
        url,
        headers,
        body,
    })
}

/// Text form of a field bound outside the body.
fn encode_text(field: &FieldDescriptor, value: &Value) -> Result<Option<String>, EncodeError> {
    match field.kind {
        FieldKind::Scalar(_) => encode_scalar(field.name, value),
        FieldKind::Repeated(_) => encode_repeated(field.name, value),
        FieldKind::Message(_) => match strip_nulls(value.clone()) {
            Value::Null => Ok(None),
            value => serde_json::to_string(&value)
                .map(Some)
                .map_err(|e| EncodeError::Json(e.to_string())),
        },
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}
