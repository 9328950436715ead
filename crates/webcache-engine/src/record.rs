//! Persistent cache records and their in-memory envelopes
//!
//! Two records exist per URL. The metadata record carries freshness and
//! coordination state; the content record carries the captured origin
//! response. Each has an envelope type holding the state that is never
//! serialized: the CAS token from the read that produced the record, and a
//! one-shot lazily loaded view of the referenced content.
//!
//! A metadata record with `valid == false` is a *reservation*: a
//! placeholder owned by a worker that is refetching the origin, kept in
//! the store so concurrent workers can count themselves by bumping
//! `reservation`. `last_noted` records the value `reservation` had when
//! content was last successfully published, so `reservation - last_noted`
//! approximates the number of workers currently waiting for an answer.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;
use webcache_types::ports::kv::{CasResult, CasToken};
use webcache_types::{KvStore, OriginResponse, Result};

use crate::httpdate::time_or_last_modified;
use crate::key;

/// Identity of one write attempt within a metadata lifetime
///
/// `session` is the wall-clock instant (microseconds) at which the
/// metadata record was first created; `reservation` is the worker's slot
/// in that record's contention counter. The pair keys the content record,
/// so stale content from an evicted-and-recreated metadata lifetime can
/// never be mistaken for current content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationToken {
    pub session: i64,
    pub reservation: u64,
}

/// Serialized metadata describing one URL's cache state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// The request URL this entry describes
    pub url: String,
    /// `false` marks a reservation, `true` a fully populated entry
    pub valid: bool,
    /// Microsecond wall-clock nonce fixed at first insertion
    pub session: i64,
    /// Contention counter, bumped by every successful metadata write
    pub reservation: u64,
    /// Value of `reservation` when content was last published
    pub last_noted: u64,
    /// Unix seconds of the last origin fetch; absent while a reservation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched: Option<i64>,
    /// Advertised modification time, RFC 1123 GMT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Hex SHA-256 of the referenced content; absent while a reservation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_digest: Option<String>,
    /// KV key of the current content record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_key: Option<String>,
}

/// Serialized capture of an origin response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// The URL the content is about
    pub url: String,
    /// Status line, e.g. `"200 OK"`
    pub status: String,
    /// Response headers as captured from the origin
    pub headers: BTreeMap<String, String>,
    /// The body itself
    pub content: Vec<u8>,
}

/// Content record plus the key it lives under and its lazily computed
/// digest
#[derive(Debug, Clone)]
pub struct ContentEntry {
    pub key: String,
    pub record: ContentRecord,
    digest: OnceCell<String>,
}

impl ContentEntry {
    /// Capture an origin response under the given content key
    pub fn from_origin_response(url: &str, response: &OriginResponse, key: String) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            key,
            record: ContentRecord {
                url: url.to_string(),
                status: response.status_line(),
                headers,
                content: response.body.to_vec(),
            },
            digest: OnceCell::new(),
        }
    }

    /// Load the content record stored under `key`, `None` when evicted
    pub async fn load(kv: &dyn KvStore, key: &str) -> Result<Option<Self>> {
        let Some(raw) = kv.get(key).await? else {
            return Ok(None);
        };
        let record: ContentRecord = serde_json::from_slice(&raw)?;
        Ok(Some(Self {
            key: key.to_string(),
            record,
            digest: OnceCell::new(),
        }))
    }

    /// Commit the record to the store; overwrite is fine because the key
    /// already encodes a unique reservation token
    pub async fn store(&self, kv: &dyn KvStore) -> Result<bool> {
        debug!(key = %self.key, bytes = self.record.content.len(), "writing content record");
        let payload = serde_json::to_vec(&self.record)?;
        kv.set(&self.key, &payload).await
    }

    /// Remove the record from the store
    pub async fn delete(&self, kv: &dyn KvStore) -> Result<bool> {
        debug!(key = %self.key, "deleting content record");
        kv.delete(&self.key).await
    }

    /// Hex SHA-256 of the body, computed on first use
    pub fn digest(&self) -> &str {
        self.digest.get_or_init(|| {
            let mut hasher = Sha256::new();
            hasher.update(&self.record.content);
            hex::encode(hasher.finalize())
        })
    }
}

/// Metadata record plus its envelope: the CAS token from the read that
/// produced it and the one-shot lazily loaded content view
#[derive(Debug, Clone)]
pub struct MetadataEntry {
    pub record: MetadataRecord,
    cas_token: Option<CasToken>,
    content: Option<ContentEntry>,
}

impl MetadataEntry {
    /// Load the metadata for `url` together with a CAS token, `None` when
    /// absent
    pub async fn load(kv: &dyn KvStore, url: &str) -> Result<Option<Self>> {
        let Some((raw, token)) = kv.gets(&key::metadata_key(url)).await? else {
            return Ok(None);
        };
        let record: MetadataRecord = serde_json::from_slice(&raw)?;
        Ok(Some(Self {
            record,
            cas_token: Some(token),
            content: None,
        }))
    }

    /// Build the placeholder a worker inserts when no metadata exists yet
    ///
    /// The inserting worker is first in line, so `reservation` starts at 1
    /// with `last_noted` 0 and the entry marked not valid.
    pub fn new_reservation(url: &str, now: DateTime<Utc>) -> Self {
        Self {
            record: MetadataRecord {
                url: url.to_string(),
                valid: false,
                session: now.timestamp_micros(),
                reservation: 1,
                last_noted: 0,
                fetched: None,
                last_modified: None,
                sha256_digest: None,
                content_key: None,
            },
            cas_token: None,
            content: None,
        }
    }

    /// Build a fresh, valid metadata record from an origin response
    pub fn from_origin_response(url: &str, content: ContentEntry, now: DateTime<Utc>) -> Self {
        let record = MetadataRecord {
            url: url.to_string(),
            valid: true,
            session: now.timestamp_micros(),
            reservation: 0,
            last_noted: 0,
            fetched: Some(now.timestamp()),
            last_modified: Some(time_or_last_modified(now, &content.record.headers)),
            sha256_digest: Some(content.digest().to_string()),
            content_key: Some(content.key.clone()),
        };
        Self {
            record,
            cas_token: None,
            content: Some(content),
        }
    }

    /// Fold a new origin response into an existing record
    ///
    /// Always advances `fetched`, notes the publication, and marks the
    /// entry valid. The digest and `last_modified` only change when the
    /// body bytes changed, so an unchanged resource advertises a stable
    /// `Last-Modified` across refetches. The `content_key` likewise stays
    /// put on a digest match, but only while the referenced blob is known
    /// to still exist (`existing_content_present`); a dangling reference
    /// would make the entry unservable until it expired.
    pub fn update_for_origin_response(
        &mut self,
        content: ContentEntry,
        now: DateTime<Utc>,
        existing_content_present: bool,
    ) {
        self.record.fetched = Some(now.timestamp());
        self.record.last_noted = self.record.reservation;
        self.record.valid = true;

        if self.record.sha256_digest.as_deref() != Some(content.digest()) {
            self.record.last_modified = Some(time_or_last_modified(now, &content.record.headers));
            self.record.sha256_digest = Some(content.digest().to_string());
            self.record.content_key = Some(content.key.clone());
        } else if !existing_content_present {
            self.record.content_key = Some(content.key.clone());
        }

        self.content = Some(content);
    }

    /// KV key this metadata lives under
    pub fn metadata_key(&self) -> String {
        key::metadata_key(&self.record.url)
    }

    /// The write-attempt identity carried by this record
    pub fn reservation_token(&self) -> ReservationToken {
        ReservationToken {
            session: self.record.session,
            reservation: self.record.reservation,
        }
    }

    /// Commit this metadata, using the CAS token from loading or
    /// inserting when the entry does not exist
    ///
    /// A CAS that finds the key evicted falls through to a single insert
    /// attempt. Returns whether the write took.
    pub async fn store(&self, kv: &dyn KvStore) -> Result<bool> {
        let payload = serde_json::to_vec(&self.record)?;
        debug!(key = %self.metadata_key(), reservation = self.record.reservation, valid = self.record.valid, "writing metadata");

        if let Some(token) = self.cas_token {
            match kv.cas(&self.metadata_key(), &payload, token).await? {
                CasResult::Stored => return Ok(true),
                CasResult::Mismatch => return Ok(false),
                // entry evicted since the read; try a fresh insert
                CasResult::NotFound => {}
            }
        }
        kv.add(&self.metadata_key(), &payload).await
    }

    /// Remove this metadata from the store
    pub async fn delete(&self, kv: &dyn KvStore) -> Result<bool> {
        debug!(key = %self.metadata_key(), "deleting metadata");
        kv.delete(&self.metadata_key()).await
    }

    /// The referenced content, loaded from the store on first access
    ///
    /// Entries constructed from an origin response already carry their
    /// content. `None` means the content key is unset or the blob has
    /// been evicted.
    pub async fn content_entry(&mut self, kv: &dyn KvStore) -> Result<Option<&ContentEntry>> {
        if self.content.is_none() {
            if let Some(content_key) = self.record.content_key.clone() {
                self.content = ContentEntry::load(kv, &content_key).await?;
            }
        }
        Ok(self.content.as_ref())
    }
}
