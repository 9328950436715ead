//! Outbound response assembly
//!
//! A cached response is rebuilt from a metadata + content pair: the stored
//! headers minus the hop-by-hop and cache-managed set, with a single
//! synthesized `Last-Modified` prepended. Bodies captured from the origin
//! are already decoded, which is why the encoding headers are stripped.

use bytes::Bytes;
use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::record::{ContentRecord, MetadataRecord};

/// Headers removed from the origin -> cache/client response
static DROP_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "last-modified",
        "vary",
        "server",
        "keep-alive",
        "connection",
        "transfer-encoding",
        "content-encoding",
    ]
    .into_iter()
    .collect()
});

/// A complete response ready for the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientResponse {
    /// Status line, e.g. `"200 OK"`
    pub status: String,
    /// Ordered header list
    pub headers: Vec<(String, String)>,
    /// Body as a single chunk
    pub body: Bytes,
}

impl ClientResponse {
    /// Assemble a response from a cached metadata + content pair
    pub fn from_cache_entry(metadata: &MetadataRecord, content: &ContentRecord) -> Self {
        let mut headers = Vec::with_capacity(content.headers.len() + 1);
        if let Some(last_modified) = &metadata.last_modified {
            headers.push(("Last-Modified".to_string(), last_modified.clone()));
        }
        for (name, value) in &content.headers {
            if !DROP_HEADERS.contains(name.to_ascii_lowercase().as_str()) {
                headers.push((name.clone(), value.clone()));
            }
        }
        Self {
            status: content.status.clone(),
            headers,
            body: Bytes::from(content.content.clone()),
        }
    }

    /// Status-only `304 Not Modified`
    pub fn not_modified() -> Self {
        Self {
            status: "304 Not Modified".to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Empty `500 Internal Server Error`
    pub fn internal_error() -> Self {
        Self {
            status: "500 Internal Server Error".to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Numeric status code parsed from the status line
    pub fn status_code(&self) -> Option<u16> {
        self.status.split_whitespace().next()?.parse().ok()
    }
}
