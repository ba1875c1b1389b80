//! Static field tables describing how message fields map onto HTTP.
//!
//! Each message type carries one [`MessageSchema`] listing its fields in
//! declaration order. Binding and encoding dispatch on these tables.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use truss_axum_core::{FieldDescriptor, FieldKind, HttpMessage, MessageSchema, Scalar};
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
//! assert!(SumRequest::SCHEMA.validate().is_ok());
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SchemaError;

/// Scalar field types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scalar {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    Bool,
    String,
}

impl Scalar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scalar::Int32 => "int32",
            Scalar::Int64 => "int64",
            Scalar::Uint32 => "uint32",
            Scalar::Uint64 => "uint64",
            Scalar::Float => "float",
            Scalar::Double => "double",
            Scalar::Bool => "bool",
            Scalar::String => "string",
        }
    }
}

/// Shape of a message field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    Scalar(Scalar),
    /// Sequence of scalars. Sent in query strings as a JSON array literal.
    Repeated(Scalar),
    /// Nested message, only representable in a JSON body.
    Message(&'static MessageSchema),
}

/// Wire location of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    /// `?name=value` in the query string.
    Query,
    /// A `{name}` placeholder in the route template.
    Path,
    /// A key of the JSON object body.
    Body,
    /// The whole request body.
    BodyRoot,
    /// The named request header.
    Header(&'static str),
}

/// One field of a message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub binding: Binding,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind, binding: Binding) -> Self {
        Self {
            name,
            kind,
            binding,
        }
    }

    pub const fn query(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Binding::Query)
    }

    pub const fn path(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Binding::Path)
    }

    pub const fn body(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Binding::Body)
    }

    pub const fn body_root(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Binding::BodyRoot)
    }

    pub const fn header(name: &'static str, kind: FieldKind, header: &'static str) -> Self {
        Self::new(name, kind, Binding::Header(header))
    }

    /// Whether this field is read from the request body.
    pub fn is_body(&self) -> bool {
        matches!(self.binding, Binding::Body | Binding::BodyRoot)
    }
}

/// Field table of one message type.
#[derive(Debug, PartialEq)]
pub struct MessageSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl MessageSchema {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether any field is bound to the request body.
    pub fn has_body(&self) -> bool {
        self.fields.iter().any(FieldDescriptor::is_body)
    }

    /// The field occupying the whole body, if any.
    pub fn body_root(&self) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| matches!(f.binding, Binding::BodyRoot))
    }

    /// Fields bound to path placeholders.
    pub fn path_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| matches!(f.binding, Binding::Path))
    }

    /// Check that field names are unique and that a body root field is the
    /// only body field.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    message: self.name,
                    field: field.name,
                });
            }
        }

        if let Some(root) = self.body_root() {
            let body_fields = self.fields.iter().filter(|f| f.is_body()).count();
            if body_fields > 1 {
                return Err(SchemaError::BodyRootConflict {
                    message: self.name,
                    field: root.name,
                });
            }
        }

        Ok(())
    }
}

/// A message type that can travel over the JSON/HTTP transport.
///
/// The serde representation must use the schema's field names as JSON keys.
pub trait HttpMessage: Serialize + DeserializeOwned + Send + 'static {
    const SCHEMA: &'static MessageSchema;
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &MessageSchema = &MessageSchema {
        name: "Nested",
        fields: &[
            FieldDescriptor::body("A", FieldKind::Scalar(Scalar::Int64)),
            FieldDescriptor::body("B", FieldKind::Scalar(Scalar::Int64)),
        ],
    };

    #[test]
    fn test_field_lookup() {
        const OUTER: MessageSchema = MessageSchema {
            name: "Outer",
            fields: &[
                FieldDescriptor::path("id", FieldKind::Scalar(Scalar::String)),
                FieldDescriptor::body("NM", FieldKind::Message(NESTED)),
            ],
        };
        let schema = &OUTER;

        assert!(schema.has_body());
        assert_eq!(
            schema.field("NM").map(|f| f.kind),
            Some(FieldKind::Message(NESTED))
        );
        assert!(schema.field("missing").is_none());
        assert_eq!(schema.path_fields().count(), 1);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        const DUP: MessageSchema = MessageSchema {
            name: "Dup",
            fields: &[
                FieldDescriptor::query("A", FieldKind::Scalar(Scalar::Int64)),
                FieldDescriptor::body("A", FieldKind::Scalar(Scalar::Int64)),
            ],
        };
        let schema = &DUP;

        assert_eq!(
            schema.validate(),
            Err(SchemaError::DuplicateField {
                message: "Dup",
                field: "A"
            })
        );
    }

    #[test]
    fn test_body_root_must_be_alone() {
        const CONFLICT: MessageSchema = MessageSchema {
            name: "Root",
            fields: &[
                FieldDescriptor::body_root("payload", FieldKind::Message(NESTED)),
                FieldDescriptor::body("extra", FieldKind::Scalar(Scalar::Bool)),
            ],
        };
        assert!(matches!(
            CONFLICT.validate(),
            Err(SchemaError::BodyRootConflict { field: "payload", .. })
        ));

        const ALONE: MessageSchema = MessageSchema {
            name: "Root",
            fields: &[
                FieldDescriptor::body_root("payload", FieldKind::Message(NESTED)),
                FieldDescriptor::query("page", FieldKind::Scalar(Scalar::Uint32)),
            ],
        };
        assert!(ALONE.validate().is_ok());
    }

    #[test]
    fn test_query_only_schema_has_no_body() {
        const QUERY: MessageSchema = MessageSchema {
            name: "Query",
            fields: &[
                FieldDescriptor::query("A", FieldKind::Repeated(Scalar::Int64)),
                FieldDescriptor::header("auth", FieldKind::Scalar(Scalar::String), "x-auth"),
            ],
        };
        assert!(!QUERY.has_body());
        assert!(QUERY.body_root().is_none());
    }
}
