//! Origin HTTP client port
//!
//! The engine never talks to the network directly; it asks an
//! [`OriginClient`] for the resource and receives an [`OriginResponse`]
//! value. Adapters own connection pooling, timeouts, and transport errors.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

/// A response fetched from the origin server
#[derive(Debug, Clone)]
pub struct OriginResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase accompanying the status code
    pub reason: String,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Bytes,
}

impl OriginResponse {
    /// Whether the response is OK for caching purposes (status below 400)
    pub fn ok(&self) -> bool {
        self.status < 400
    }

    /// Status line in `"200 OK"` form
    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, self.reason)
    }

    /// Get a header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }
}

/// Case-insensitive header lookup over a plain string map
///
/// Works for any map iterating as `(&String, &String)`, notably both
/// `HashMap` and `BTreeMap`.
pub fn header_lookup<'a, I>(headers: I, name: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    headers
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Origin fetch port
///
/// `url` is the request path (plus query) of the resource; the adapter
/// resolves it against its configured origin base address. Request headers
/// are forwarded verbatim.
#[async_trait]
pub trait OriginClient: Send + Sync {
    async fn fetch(&self, url: &str, headers: &HashMap<String, String>) -> Result<OriginResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, reason: &str) -> OriginResponse {
        OriginResponse {
            status,
            reason: reason.to_string(),
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_ok_threshold() {
        assert!(response(200, "OK").ok());
        assert!(response(304, "Not Modified").ok());
        assert!(!response(404, "Not Found").ok());
        assert!(!response(500, "Internal Server Error").ok());
    }

    #[test]
    fn test_status_line() {
        assert_eq!(response(200, "OK").status_line(), "200 OK");
        assert_eq!(response(500, "UNAVAILABLE").status_line(), "500 UNAVAILABLE");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut resp = response(200, "OK");
        resp.headers
            .insert("last-modified".to_string(), "yesterday".to_string());
        assert_eq!(resp.header("Last-Modified"), Some("yesterday"));
        assert_eq!(resp.header("LAST-MODIFIED"), Some("yesterday"));
        assert_eq!(resp.header("Expires"), None);
    }
}
