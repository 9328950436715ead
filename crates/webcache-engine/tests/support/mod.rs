//! Test doubles for the engine integration tests
//!
//! `ScriptedOrigin` replays canned responses per URL; `ContestKv` wraps
//! the in-memory store and injects a competing worker's writes the first
//! time a chosen key is written, which is how the contention scenarios are
//! reproduced deterministically.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use webcache_types::ports::kv::{CasResult, CasToken};
use webcache_types::{Error, KvStore, MemoryKv, OriginClient, OriginResponse, Result};

/// Origin stub replaying a queue of canned responses per URL
#[derive(Default)]
pub struct ScriptedOrigin {
    responses: Mutex<HashMap<String, VecDeque<OriginResponse>>>,
    fetches: AtomicUsize,
}

impl ScriptedOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, url: &str, response: OriginResponse) {
        self.responses
            .lock()
            .expect("origin mutex poisoned")
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OriginClient for ScriptedOrigin {
    async fn fetch(
        &self,
        url: &str,
        _headers: &HashMap<String, String>,
    ) -> Result<OriginResponse> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.responses
            .lock()
            .expect("origin mutex poisoned")
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| Error::origin(format!("no scripted response for {url}")))
    }
}

/// Build a canned origin response
pub fn origin_response(
    status: u16,
    reason: &str,
    body: &str,
    headers: &[(&str, &str)],
) -> OriginResponse {
    OriginResponse {
        status,
        reason: reason.to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: Bytes::from(body.to_string()),
    }
}

/// KV wrapper injecting a peer's writes at a contested key
///
/// The first `add` or `cas` against a key with a registered contest
/// applies the peer's writes to the inner store and fails the caller's
/// write, exactly as if the peer had gotten there first.
pub struct ContestKv {
    inner: MemoryKv,
    contests: Mutex<HashMap<String, Vec<(String, Vec<u8>)>>>,
}

impl ContestKv {
    pub fn new(inner: MemoryKv) -> Self {
        Self {
            inner,
            contests: Mutex::new(HashMap::new()),
        }
    }

    /// Register a peer's writes to apply when `key` is next written
    pub fn push_contest(&self, key: &str, writes: Vec<(String, Vec<u8>)>) {
        self.contests
            .lock()
            .expect("contest mutex poisoned")
            .insert(key.to_string(), writes);
    }

    pub fn inner(&self) -> &MemoryKv {
        &self.inner
    }

    fn take_contest(&self, key: &str) -> Option<Vec<(String, Vec<u8>)>> {
        self.contests
            .lock()
            .expect("contest mutex poisoned")
            .remove(key)
    }

    async fn apply(&self, writes: Vec<(String, Vec<u8>)>) -> Result<()> {
        for (key, value) in writes {
            self.inner.set(&key, &value).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for ContestKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn gets(&self, key: &str) -> Result<Option<(Vec<u8>, CasToken)>> {
        self.inner.gets(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<bool> {
        self.inner.set(key, value).await
    }

    async fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        if let Some(writes) = self.take_contest(key) {
            self.apply(writes).await?;
            return Ok(false);
        }
        self.inner.add(key, value).await
    }

    async fn cas(&self, key: &str, value: &[u8], token: CasToken) -> Result<CasResult> {
        if let Some(writes) = self.take_contest(key) {
            self.apply(writes).await?;
            return Ok(CasResult::Mismatch);
        }
        self.inner.cas(key, value, token).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }
}
