//! Route descriptors: an HTTP method plus a path template.

use std::fmt;

use http::Method;

use crate::error::SchemaError;
use crate::schema::{Binding, MessageSchema};

/// GET, HEAD and DELETE requests never carry a body.
pub fn method_has_body(method: &Method) -> bool {
    *method != Method::GET && *method != Method::HEAD && *method != Method::DELETE
}

/// One segment of a route template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// `{name}`, a whole path segment bound to a `Path` field.
    Placeholder(&'a str),
}

/// An HTTP method and path template, e.g. `GET /users/{id}`.
///
/// Templates use the `{name}` placeholder syntax that axum routes accept,
/// so a template doubles as the axum route path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Route {
    method: Method,
    template: String,
}

impl Route {
    pub fn new<S: Into<String>>(method: Method, template: S) -> Self {
        Self {
            method,
            template: template.into(),
        }
    }

    pub fn get<S: Into<String>>(template: S) -> Self {
        Self::new(Method::GET, template)
    }

    pub fn post<S: Into<String>>(template: S) -> Self {
        Self::new(Method::POST, template)
    }

    pub fn put<S: Into<String>>(template: S) -> Self {
        Self::new(Method::PUT, template)
    }

    pub fn patch<S: Into<String>>(template: S) -> Self {
        Self::new(Method::PATCH, template)
    }

    pub fn delete<S: Into<String>>(template: S) -> Self {
        Self::new(Method::DELETE, template)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Non-empty template segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Placeholder(name),
                None => Segment::Literal(s),
            })
    }

    /// Placeholder names in template order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
    }

    /// First pair of placeholders that sit at the same position of a shared
    /// prefix under different names, as in `/items/{id}` and `/items/{name}`.
    /// A router cannot serve both templates.
    pub fn placeholder_conflict<'a>(&'a self, other: &'a Route) -> Option<(&'a str, &'a str)> {
        for pair in self.segments().zip(other.segments()) {
            match pair {
                (Segment::Literal(a), Segment::Literal(b)) if a == b => {}
                (Segment::Placeholder(a), Segment::Placeholder(b)) if a == b => {}
                (Segment::Placeholder(a), Segment::Placeholder(b)) => return Some((a, b)),
                _ => return None,
            }
        }
        None
    }

    /// Whether requests on this route carry a body.
    pub fn has_body(&self) -> bool {
        method_has_body(&self.method)
    }

    /// Check that `schema` can be served on this route.
    pub fn check(&self, schema: &MessageSchema) -> Result<(), SchemaError> {
        schema.validate()?;

        let malformed_literal = self.segments().any(|s| match s {
            Segment::Literal(lit) => {
                lit.contains(['{', '}']) || lit.starts_with([':', '*'])
            }
            Segment::Placeholder(name) => name.is_empty(),
        });
        if !self.template.starts_with('/') || malformed_literal {
            return Err(SchemaError::InvalidTemplate {
                template: self.template.clone(),
            });
        }

        for placeholder in self.placeholders() {
            let bound = schema
                .field(placeholder)
                .is_some_and(|f| f.binding == Binding::Path);
            if !bound {
                return Err(SchemaError::UnboundPlaceholder {
                    template: self.template.clone(),
                    placeholder: placeholder.to_owned(),
                    message: schema.name,
                });
            }
        }

        for field in schema.path_fields() {
            if !self.placeholders().any(|p| p == field.name) {
                return Err(SchemaError::MissingPlaceholder {
                    template: self.template.clone(),
                    field: field.name,
                    message: schema.name,
                });
            }
        }

        if !self.has_body() && schema.has_body() {
            return Err(SchemaError::BodyNotAllowed {
                method: self.method.clone(),
                template: self.template.clone(),
                message: schema.name,
            });
        }

        Ok(())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind, Scalar};

    const USER: MessageSchema = MessageSchema {
        name: "GetUser",
        fields: &[
            FieldDescriptor::path("id", FieldKind::Scalar(Scalar::Uint64)),
            FieldDescriptor::query("verbose", FieldKind::Scalar(Scalar::Bool)),
        ],
    };

    const CREATE: MessageSchema = MessageSchema {
        name: "CreateUser",
        fields: &[FieldDescriptor::body("name", FieldKind::Scalar(Scalar::String))],
    };

    #[test]
    fn test_segments() {
        let route = Route::get("/users/{id}/posts");
        let segments: Vec<_> = route.segments().collect();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("users"),
                Segment::Placeholder("id"),
                Segment::Literal("posts"),
            ]
        );
        assert_eq!(route.placeholders().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_placeholder_conflict() {
        let get = Route::get("/items/{id}");
        assert_eq!(
            get.placeholder_conflict(&Route::delete("/items/{name}")),
            Some(("id", "name"))
        );
        assert_eq!(
            get.placeholder_conflict(&Route::get("/items/{name}/parts")),
            Some(("id", "name"))
        );
        assert_eq!(get.placeholder_conflict(&Route::delete("/items/{id}")), None);
        assert_eq!(get.placeholder_conflict(&Route::get("/items/{id}/parts")), None);
        assert_eq!(get.placeholder_conflict(&Route::get("/items/latest")), None);
        assert_eq!(get.placeholder_conflict(&Route::get("/users/{name}")), None);
    }

    #[test]
    fn test_has_body() {
        assert!(!Route::get("/a").has_body());
        assert!(!Route::delete("/a").has_body());
        assert!(!Route::new(Method::HEAD, "/a").has_body());
        assert!(Route::post("/a").has_body());
        assert!(Route::put("/a").has_body());
        assert!(Route::patch("/a").has_body());
    }

    #[test]
    fn test_check_accepts_matching_schema() {
        assert!(Route::get("/users/{id}").check(&USER).is_ok());
        assert!(Route::post("/users").check(&CREATE).is_ok());
    }

    #[test]
    fn test_check_rejects_unbound_placeholder() {
        let err = Route::get("/users/{uid}").check(&USER).unwrap_err();
        assert!(matches!(err, SchemaError::UnboundPlaceholder { .. }));
    }

    #[test]
    fn test_check_rejects_missing_placeholder() {
        let err = Route::get("/users").check(&USER).unwrap_err();
        assert!(matches!(err, SchemaError::MissingPlaceholder { field: "id", .. }));
    }

    #[test]
    fn test_check_rejects_body_on_get() {
        let err = Route::get("/users").check(&CREATE).unwrap_err();
        assert!(matches!(err, SchemaError::BodyNotAllowed { .. }));
    }

    #[test]
    fn test_check_rejects_relative_template() {
        let err = Route::post("users").check(&CREATE).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidTemplate { .. }));

        let err = Route::post("/users/:id").check(&CREATE).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidTemplate { .. }));

        let err = Route::post("/users/x{id}").check(&CREATE).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(Route::get("/users/{id}").to_string(), "GET /users/{id}");
    }
}
