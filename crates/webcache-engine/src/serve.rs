//! The serve-from-cache predicate
//!
//! Decides whether the current store state can satisfy a request without
//! contacting the origin. A request can be served when the metadata is
//! valid and unexpired and either the client's `If-Modified-Since`
//! condition holds (304, no body pulled) or the content body is present.

use tracing::debug;
use webcache_types::{header_lookup, KvStore, Result};

use crate::config::EngineConfig;
use crate::engine::CacheRequest;
use crate::httpdate::parse_http_date;
use crate::record::MetadataEntry;
use crate::response::ClientResponse;

/// Check the store for a servable response, loading the metadata itself
pub async fn check_for_cache_response(
    kv: &dyn KvStore,
    request: &CacheRequest,
    config: &EngineConfig,
) -> Result<Option<ClientResponse>> {
    match MetadataEntry::load(kv, &request.url).await? {
        None => {
            debug!(url = %request.url, "no cache entry");
            Ok(None)
        }
        Some(mut metadata) => check_with_metadata(kv, request, config, &mut metadata).await,
    }
}

/// Check an already-loaded metadata entry for a servable response
///
/// The entry's lazy content view is populated as a side effect, so a
/// caller that goes on to use the entry does not reload the body.
pub async fn check_with_metadata(
    kv: &dyn KvStore,
    request: &CacheRequest,
    config: &EngineConfig,
    metadata: &mut MetadataEntry,
) -> Result<Option<ClientResponse>> {
    if !metadata.record.valid {
        debug!(url = %request.url, "no valid cache entry");
        return Ok(None);
    }

    let Some(fetched) = metadata.record.fetched else {
        debug!(url = %request.url, "valid entry without fetch time");
        return Ok(None);
    };
    if request.time > fetched + config.expire_secs {
        debug!(url = %request.url, "expired cache entry");
        return Ok(None);
    }

    // client-side caching: a malformed header counts as absent
    if let Some(condition) = header_lookup(&request.headers, "If-Modified-Since") {
        let client_date = parse_http_date(condition);
        let cache_date = metadata
            .record
            .last_modified
            .as_deref()
            .and_then(parse_http_date);
        if let (Some(client), Some(cached)) = (client_date, cache_date) {
            if client >= cached {
                debug!(url = %request.url, "client copy still current");
                return Ok(Some(ClientResponse::not_modified()));
            }
        }
    }

    if metadata.content_entry(kv).await?.is_some() {
        debug!(url = %request.url, "serving cached body");
        let metadata_record = metadata.record.clone();
        let content = metadata.content_entry(kv).await?.unwrap();
        return Ok(Some(ClientResponse::from_cache_entry(
            &metadata_record,
            &content.record,
        )));
    }

    debug!(url = %request.url, "no cache body");
    Ok(None)
}
