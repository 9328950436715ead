//! reqwest-based origin client adapter
//!
//! Issues GETs against the configured origin base with the inbound
//! request's headers forwarded verbatim. Compressed bodies are decoded by
//! the client, which is why the engine strips the encoding headers when it
//! replays a capture.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use webcache_types::{Error, OriginClient, OriginResponse, Result};

/// [`OriginClient`] backed by a pooled reqwest client
pub struct ReqwestOrigin {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestOrigin {
    /// Build a client against `base_url` with the given connect and total
    /// read timeouts
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()
            .map_err(|e| Error::origin(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OriginClient for ReqwestOrigin {
    async fn fetch(&self, url: &str, headers: &HashMap<String, String>) -> Result<OriginResponse> {
        debug!(url, "issuing request to origin server");

        let mut request = self.client.get(format!("{}{}", self.base_url, url));
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                request = request.header(name, value);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::origin(e.to_string()))?;

        let status = response.status();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::origin(e.to_string()))?;

        debug!(url, status = status.as_u16(), bytes = body.len(), "origin response");

        Ok(OriginResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers: response_headers,
            body,
        })
    }
}
