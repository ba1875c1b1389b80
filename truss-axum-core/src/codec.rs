//! Field codec: message field values to and from their text and JSON forms.
//!
//! Field values are handled as [`serde_json::Value`]s, the common shape of a
//! serde message before it is materialized into its Rust type.
//!
//! - Scalars travel as plain text (`A=12`, `true`, `hello`).
//! - Repeated scalars travel as a JSON array literal (`A=[12,45360]`),
//!   never as comma-separated text or repeated keys.
//! - Body values are JSON, checked against the field kind and recursing into
//!   nested message schemas.

use serde_json::{Map, Number, Value};

use crate::error::{BindingError, EncodeError};
use crate::schema::{FieldKind, MessageSchema, Scalar};

// ============================================================================
// Encoding (client side)
// ============================================================================

/// Render a scalar field value as text.
///
/// Returns `Ok(None)` for `null`, meaning the field is not sent.
pub fn encode_scalar(field: &str, value: &Value) -> Result<Option<String>, EncodeError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(EncodeError::UnexpectedValue {
            field: field.to_owned(),
            expected: "a scalar",
        }),
    }
}

/// Render a repeated field value as a compact JSON array literal.
///
/// An empty sequence renders as `[]`. Returns `Ok(None)` for `null`.
pub fn encode_repeated(field: &str, value: &Value) -> Result<Option<String>, EncodeError> {
    let unexpected = || EncodeError::UnexpectedValue {
        field: field.to_owned(),
        expected: "an array of scalars",
    };

    match value {
        Value::Null => Ok(None),
        Value::Array(items) => {
            if items
                .iter()
                .any(|v| matches!(v, Value::Null | Value::Array(_) | Value::Object(_)))
            {
                return Err(unexpected());
            }
            serde_json::to_string(value)
                .map(Some)
                .map_err(|e| EncodeError::Json(e.to_string()))
        }
        _ => Err(unexpected()),
    }
}

// ============================================================================
// Decoding (server side)
// ============================================================================

/// Parse a scalar from text (query string, path segment or header).
pub fn decode_scalar(field: &str, raw: &str, kind: Scalar) -> Result<Value, BindingError> {
    parse_scalar(raw, kind).ok_or_else(|| BindingError::type_mismatch(field, raw))
}

/// Parse a repeated field from its JSON array literal.
///
/// Text that is not a JSON array (e.g. `12,45360`) is a malformed array.
/// Elements that do not fit `kind` are a type mismatch; both errors carry the
/// whole raw text.
pub fn decode_repeated(field: &str, raw: &str, kind: Scalar) -> Result<Value, BindingError> {
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        _ => return Err(BindingError::malformed_array(field, raw)),
    };

    items
        .iter()
        .map(|item| coerce_scalar(item, kind))
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
        .ok_or_else(|| BindingError::type_mismatch(field, raw))
}

/// Check a JSON body value against a field kind.
///
/// `path` names the field in errors; nested fields use dotted paths such as
/// `NM.A`. `null` yields `Ok(None)` (the field takes its zero value).
pub fn decode_json(path: &str, value: Value, kind: FieldKind) -> Result<Option<Value>, BindingError> {
    if value.is_null() {
        return Ok(None);
    }

    match kind {
        FieldKind::Scalar(scalar) => coerce_scalar(&value, scalar)
            .map(Some)
            .ok_or_else(|| BindingError::type_mismatch(path, value.to_string())),
        FieldKind::Repeated(scalar) => {
            let Value::Array(items) = &value else {
                return Err(BindingError::type_mismatch(path, value.to_string()));
            };
            items
                .iter()
                .map(|item| coerce_scalar(item, scalar))
                .collect::<Option<Vec<_>>>()
                .map(|items| Some(Value::Array(items)))
                .ok_or_else(|| BindingError::type_mismatch(path, value.to_string()))
        }
        FieldKind::Message(schema) => match value {
            Value::Object(map) => decode_message(path, schema, map).map(|m| Some(Value::Object(m))),
            other => Err(BindingError::type_mismatch(path, other.to_string())),
        },
    }
}

/// Check every field of a nested message, filling zero values for absent
/// fields. Keys not declared by `schema` are dropped.
fn decode_message(
    path: &str,
    schema: &MessageSchema,
    mut map: Map<String, Value>,
) -> Result<Map<String, Value>, BindingError> {
    let mut out = Map::new();
    for field in schema.fields {
        let field_path = format!("{path}.{}", field.name);
        let value = match map.remove(field.name) {
            Some(raw) => decode_json(&field_path, raw, field.kind)?,
            None => None,
        };
        if let Some(value) = value.or_else(|| zero_value(field.kind)) {
            out.insert(field.name.to_owned(), value);
        }
    }
    Ok(out)
}

/// Zero value of a field kind.
///
/// Nested messages have no zero value and stay absent, so their Rust fields
/// should be `Option`s.
pub fn zero_value(kind: FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Scalar(scalar) => Some(match scalar {
            Scalar::Int32 | Scalar::Int64 | Scalar::Uint32 | Scalar::Uint64 => Value::from(0),
            Scalar::Float | Scalar::Double => Value::from(0.0),
            Scalar::Bool => Value::Bool(false),
            Scalar::String => Value::String(String::new()),
        }),
        FieldKind::Repeated(_) => Some(Value::Array(Vec::new())),
        FieldKind::Message(_) => None,
    }
}

fn parse_scalar(raw: &str, kind: Scalar) -> Option<Value> {
    match kind {
        Scalar::Int32 => raw.parse::<i32>().ok().map(Value::from),
        Scalar::Int64 => raw.parse::<i64>().ok().map(Value::from),
        Scalar::Uint32 => raw.parse::<u32>().ok().map(Value::from),
        Scalar::Uint64 => raw.parse::<u64>().ok().map(Value::from),
        Scalar::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.abs() <= f64::from(f32::MAX))
            .and_then(float),
        Scalar::Double => raw.parse::<f64>().ok().and_then(float),
        Scalar::Bool => parse_bool(raw).map(Value::Bool),
        Scalar::String => Some(Value::String(raw.to_owned())),
    }
}

/// Accepts the same spellings as Go's `strconv.ParseBool`.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn float(v: f64) -> Option<Value> {
    Number::from_f64(v).map(Value::Number)
}

/// Coerce one JSON value to a scalar kind. Numeric kinds also accept numbers
/// quoted as strings.
fn coerce_scalar(value: &Value, kind: Scalar) -> Option<Value> {
    match (kind, value) {
        (Scalar::Int32, Value::Number(n)) => n
            .as_i64()
            .filter(|v| i32::try_from(*v).is_ok())
            .map(Value::from),
        (Scalar::Int64, Value::Number(n)) => n.as_i64().map(Value::from),
        (Scalar::Uint32, Value::Number(n)) => n
            .as_u64()
            .filter(|v| u32::try_from(*v).is_ok())
            .map(Value::from),
        (Scalar::Uint64, Value::Number(n)) => n.as_u64().map(Value::from),
        (Scalar::Float, Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.abs() <= f64::from(f32::MAX))
            .and_then(float),
        (Scalar::Double, Value::Number(n)) => n.as_f64().and_then(float),
        (
            Scalar::Int32 | Scalar::Int64 | Scalar::Uint32 | Scalar::Uint64 | Scalar::Float
            | Scalar::Double,
            Value::String(s),
        ) => parse_scalar(s, kind),
        (Scalar::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (Scalar::String, Value::String(s)) => Some(Value::String(s.clone())),
        _ => None,
    }
}
