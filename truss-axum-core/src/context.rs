//! Call context and its bridge onto HTTP headers.
//!
//! Only keys listed in a [`ContextKeys`] set cross the wire. Each bridged
//! key is sent as a header of the same name.

use std::collections::BTreeMap;

use http::{HeaderMap, HeaderName, HeaderValue};

/// Ordered set of context keys eligible for header bridging.
///
/// Keys are compared case-insensitively, like HTTP header names; the first
/// spelling inserted is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextKeys {
    keys: Vec<String>,
}

impl ContextKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns `false` if an equal key was already present.
    pub fn insert<S: Into<String>>(&mut self, key: S) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ContextKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut keys = ContextKeys::new();
        keys.extend(iter);
        keys
    }
}

impl<S: Into<String>> Extend<S> for ContextKeys {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

/// Per-call metadata passed alongside a request message.
///
/// # Example
///
/// ```
/// use truss_axum_core::CallContext;
///
/// let ctx = CallContext::new().with_value("Truss-Auth-Header", "SECRET");
/// assert_eq!(ctx.get("Truss-Auth-Header"), Some("SECRET"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallContext {
    values: BTreeMap<String, String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_value<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Exact lookup first, then a case-insensitive scan.
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.values
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }
}

/// Write the context values for `keys` as request headers.
///
/// Absent or empty values are omitted. Keys that are not valid header names
/// and values that are not valid header values are skipped.
pub fn to_headers(ctx: &CallContext, keys: &ContextKeys) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for key in keys.iter() {
        let Some(value) = ctx.lookup(key).filter(|v| !v.is_empty()) else {
            continue;
        };
        let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
            tracing::debug!(key, "skipping context key: not a valid header name");
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            tracing::debug!(key, "skipping context value: not a valid header value");
            continue;
        };
        headers.insert(name, value);
    }
    headers
}

/// Read the headers named by `keys` into a context.
///
/// Only non-empty header values are materialized, stored under the
/// configured key spelling.
pub fn from_headers(headers: &HeaderMap, keys: &ContextKeys) -> CallContext {
    let mut ctx = CallContext::new();
    for key in keys.iter() {
        let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
            tracing::debug!(key, "skipping context key: not a valid header name");
            continue;
        };
        let Some(value) = headers.get(&name) else {
            continue;
        };
        match value.to_str() {
            Ok(v) if !v.is_empty() => {
                ctx.insert(key, v);
            }
            Ok(_) => {}
            Err(_) => tracing::debug!(key, "skipping header: value is not visible ASCII"),
        }
    }
    ctx
}
