//! The request orchestrator
//!
//! Composes the serve-from-cache predicate, the reservation protocol, the
//! origin fetch, and the publication protocol. All collaborators are
//! explicit ports handed in at construction, so transports and tests wire
//! in whatever implementations they need.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use webcache_types::{Clock, Entropy, Error, KvStore, OriginClient, Result};

use crate::config::EngineConfig;
use crate::response::ClientResponse;
use crate::{reserve, serve, update};

/// An inbound request as the engine sees it
#[derive(Debug, Clone)]
pub struct CacheRequest {
    /// Request path plus query
    pub url: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Arrival wall-clock time, unix seconds
    pub time: i64,
}

/// The cache coordination engine
///
/// One engine is shared by all in-process workers; cross-process
/// coordination happens entirely through the KV store.
pub struct CacheEngine {
    kv: Arc<dyn KvStore>,
    origin: Arc<dyn OriginClient>,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn Entropy>,
    config: EngineConfig,
}

impl CacheEngine {
    pub fn new(
        kv: Arc<dyn KvStore>,
        origin: Arc<dyn OriginClient>,
        clock: Arc<dyn Clock>,
        entropy: Arc<dyn Entropy>,
        config: EngineConfig,
    ) -> Self {
        Self {
            kv,
            origin,
            clock,
            entropy,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle one request, serving from cache when possible and
    /// coordinating an origin refetch otherwise
    ///
    /// `Error::Consistency` is the only expected failure of the protocol
    /// itself; the transport maps it to an empty 500.
    pub async fn handle(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> Result<ClientResponse> {
        let request = CacheRequest {
            url: url.to_string(),
            headers,
            time: self.clock.timestamp(),
        };

        if let Some(response) =
            serve::check_for_cache_response(self.kv.as_ref(), &request, &self.config).await?
        {
            debug!(url = %request.url, "serving from cache");
            return Ok(response);
        }

        // can't serve from the cache -- compete for the update
        let (won, token) = reserve::compete_for_cache_update(
            self.kv.as_ref(),
            self.clock.as_ref(),
            self.entropy.as_ref(),
            &self.config,
            &request.url,
        )
        .await?;

        if !won {
            // a competing worker may have published while we backed off
            if let Some(response) =
                serve::check_for_cache_response(self.kv.as_ref(), &request, &self.config).await?
            {
                debug!(url = %request.url, "serving parallel update from cache");
                return Ok(response);
            }
        }

        debug!(url = %request.url, "cache not servable, fetching origin");
        let origin_response = self.origin.fetch(&request.url, &request.headers).await?;

        let mut metadata = update::update_cache(
            self.kv.as_ref(),
            self.clock.as_ref(),
            &self.config,
            &request,
            &origin_response,
            token,
        )
        .await?;

        let record = metadata.record.clone();
        match metadata.content_entry(self.kv.as_ref()).await? {
            Some(content) => Ok(ClientResponse::from_cache_entry(&record, &content.record)),
            None => Err(Error::store(format!(
                "published content for {} disappeared",
                request.url
            ))),
        }
    }
}
