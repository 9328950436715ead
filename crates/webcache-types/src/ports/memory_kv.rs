//! In-memory KV store implementation for testing and development
//!
//! Thread-safe implementation of [`KvStore`] backed by a `HashMap`. CAS
//! tokens are drawn from a process-wide counter, so any write to a key
//! invalidates tokens handed out for its previous value. Suitable for unit
//! and integration tests and for single-process deployments; it never
//! evicts on its own.

use crate::error::Result;
use crate::ports::kv::{CasResult, CasToken, KvStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemEntry {
    data: Vec<u8>,
    token: CasToken,
}

/// Thread-safe in-memory [`KvStore`]
#[derive(Clone, Default)]
pub struct MemoryKv {
    store: Arc<RwLock<HashMap<String, MemEntry>>>,
    next_token: Arc<AtomicU64>,
}

impl MemoryKv {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Drop every entry, simulating a full eviction
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    fn fresh_token(&self) -> CasToken {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.read().await.get(key).map(|e| e.data.clone()))
    }

    async fn gets(&self, key: &str) -> Result<Option<(Vec<u8>, CasToken)>> {
        Ok(self
            .store
            .read()
            .await
            .get(key)
            .map(|e| (e.data.clone(), e.token)))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<bool> {
        let token = self.fresh_token();
        self.store.write().await.insert(
            key.to_string(),
            MemEntry {
                data: value.to_vec(),
                token,
            },
        );
        Ok(true)
    }

    async fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        let token = self.fresh_token();
        let mut store = self.store.write().await;
        if store.contains_key(key) {
            return Ok(false);
        }
        store.insert(
            key.to_string(),
            MemEntry {
                data: value.to_vec(),
                token,
            },
        );
        Ok(true)
    }

    async fn cas(&self, key: &str, value: &[u8], token: CasToken) -> Result<CasResult> {
        let mut store = self.store.write().await;
        let current = match store.get(key) {
            None => return Ok(CasResult::NotFound),
            Some(entry) => entry.token,
        };
        if current != token {
            return Ok(CasResult::Mismatch);
        }
        store.insert(
            key.to_string(),
            MemEntry {
                data: value.to_vec(),
                token: self.fresh_token(),
            },
        );
        Ok(CasResult::Stored)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.store.write().await.remove(key).is_some())
    }
}
