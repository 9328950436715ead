//! The update-cache protocol
//!
//! After an origin fetch, the worker publishes: the content record goes in
//! under a key derived from the worker's reservation token, then the
//! metadata is CAS'd (or inserted) to reference it. A worker that
//! discovers a parallel winner already published keeps the winner's entry
//! and deletes its own, now unreferenced, blob. A worker holding a not-OK
//! origin response gives up instead: it deletes the metadata to release
//! any waiters and hands back an unstored view of the response.

use tracing::debug;
use webcache_types::{Clock, Error, KvStore, OriginResponse, Result};

use crate::config::EngineConfig;
use crate::engine::CacheRequest;
use crate::key;
use crate::record::{ContentEntry, MetadataEntry, ReservationToken};
use crate::serve::check_with_metadata;

/// Publish an origin response, resolving races against parallel winners
///
/// Returns the metadata entry the caller should serve from. On the not-OK
/// drop path that entry is virtual: it was never stored, and the metadata
/// key has been deleted.
pub async fn update_cache(
    kv: &dyn KvStore,
    clock: &dyn Clock,
    config: &EngineConfig,
    request: &CacheRequest,
    response: &OriginResponse,
    token: ReservationToken,
) -> Result<MetadataEntry> {
    let content_key = key::content_key(&request.url, &token);
    let content = ContentEntry::from_origin_response(&request.url, response, content_key);

    if config.drop_not_ok_status && !response.ok() {
        debug!(url = %request.url, status = response.status, "origin response not OK, dropping");
        let metadata = MetadataEntry::from_origin_response(&request.url, content, clock.now_utc());
        // deleting the metadata tells waiting workers the blocking worker
        // has given up
        metadata.delete(kv).await?;
        return Ok(metadata);
    }

    if !content.store(kv).await? {
        return Err(Error::consistency(format!(
            "could not store content for {}",
            request.url
        )));
    }

    for attempt in 0..config.update_max_attempts {
        match MetadataEntry::load(kv, &request.url).await? {
            Some(mut metadata) => {
                if check_with_metadata(kv, request, config, &mut metadata)
                    .await?
                    .is_some()
                {
                    // a parallel winner already published; our blob is garbage
                    debug!(url = %request.url, "parallel update already servable");
                    content.delete(kv).await?;
                    return Ok(metadata);
                }

                let our_key = content.key.clone();
                // keeping the existing content reference requires the blob
                // to still be there, so probe it when the digests match
                let digests_match =
                    metadata.record.sha256_digest.as_deref() == Some(content.digest());
                let existing_present =
                    digests_match && metadata.content_entry(kv).await?.is_some();

                metadata.update_for_origin_response(content.clone(), clock.now_utc(), existing_present);
                if metadata.store(kv).await? {
                    if metadata.record.content_key.as_deref() != Some(our_key.as_str()) {
                        // the key stayed stable; our fresh blob is unreferenced
                        kv.delete(&our_key).await?;
                    }
                    return Ok(metadata);
                }
            }
            None => {
                let metadata = MetadataEntry::from_origin_response(
                    &request.url,
                    content.clone(),
                    clock.now_utc(),
                );
                if metadata.store(kv).await? {
                    return Ok(metadata);
                }
            }
        }
        debug!(url = %request.url, attempt, "metadata publication lost, retrying");
    }

    Err(Error::consistency(format!(
        "could not publish {} within {} attempts",
        request.url, config.update_max_attempts
    )))
}
