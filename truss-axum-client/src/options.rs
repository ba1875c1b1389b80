//! Per-call options.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};

/// Options for a single RPC call.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use truss_axum_client::CallOptions;
///
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(5))
///     .header("x-request-id", "abc-123");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Timeout for this call; overrides the client default.
    pub(crate) timeout: Option<Duration>,
    /// Extra headers sent with this call.
    pub(crate) headers: HeaderMap,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a timeout for this call.
    ///
    /// An expired call fails with a `deadline_exceeded` status.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Add a custom header for this call.
    ///
    /// Invalid names or values are skipped; use [`try_header`](Self::try_header)
    /// to detect them.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Try to add a custom header for this call.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header<K, V>(mut self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        self.headers.insert(name, value);
        Some(self)
    }

    /// Get a reference to the custom headers.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CallOptions::new();
        assert_eq!(options.get_timeout(), None);
        assert!(options.get_headers().is_empty());
    }

    #[test]
    fn test_timeout_and_headers() {
        let options = CallOptions::new()
            .timeout(Duration::from_millis(250))
            .header("x-request-id", "abc-123");
        assert_eq!(options.get_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(options.get_headers().get("x-request-id").unwrap(), "abc-123");
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let options = CallOptions::new().header("bad header", "v");
        assert!(options.get_headers().is_empty());
        assert!(CallOptions::new().try_header("x-ok", "bad\nvalue").is_none());
    }
}
