//! Backend-agnostic key-value store interface
//!
//! This trait narrows the external store down to the six primitives the
//! cache coordination protocol relies on: plain reads, token reads,
//! unconditional writes, insert-if-absent, compare-and-swap, and delete.
//! The store is allowed to evict any key at any time; callers must treat
//! every read as potentially missing.
//!
//! # Example
//!
//! ```rust,ignore
//! use webcache_types::ports::{CasResult, KvStore};
//!
//! async fn example(kv: &dyn KvStore) -> webcache_types::Result<()> {
//!     if kv.add("lock", b"holder").await? {
//!         // we inserted the key first
//!     }
//!     if let Some((value, token)) = kv.gets("lock").await? {
//!         match kv.cas("lock", &value, token).await? {
//!             CasResult::Stored => {}
//!             CasResult::Mismatch => {}  // someone wrote in between
//!             CasResult::NotFound => {}  // key evicted mid-update
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use async_trait::async_trait;

/// Opaque write-serialization token returned by [`KvStore::gets`]
///
/// A token is valid for exactly one generation of a key's value; any write
/// to the key invalidates outstanding tokens.
pub type CasToken = u64;

/// Outcome of a compare-and-swap attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasResult {
    /// The token was current and the value was written
    Stored,
    /// The key exists but the token is stale
    Mismatch,
    /// The key is absent (deleted or evicted since the token was read)
    NotFound,
}

/// Narrow facade over the shared external store
///
/// Implementations must be thread-safe (`Send + Sync`). Values are opaque
/// bytes; serialization is the caller's concern. Per key, all operations
/// are linearized by the backing server.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Retrieve a value by key, `None` when absent or evicted
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Retrieve a value together with its CAS token, `None` when absent
    async fn gets(&self, key: &str) -> Result<Option<(Vec<u8>, CasToken)>>;

    /// Store a value unconditionally, invalidating outstanding tokens
    async fn set(&self, key: &str, value: &[u8]) -> Result<bool>;

    /// Insert a value only if the key is absent; `false` when present
    async fn add(&self, key: &str, value: &[u8]) -> Result<bool>;

    /// Store a value only if `token` is still current for the key
    async fn cas(&self, key: &str, value: &[u8], token: CasToken) -> Result<CasResult>;

    /// Remove a key, returning whether it was present
    async fn delete(&self, key: &str) -> Result<bool>;
}
