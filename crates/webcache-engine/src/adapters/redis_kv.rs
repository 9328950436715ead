//! Redis implementation of the KvStore port
//!
//! Redis has no memcached-style CAS token, so each logical entry is a
//! Redis hash with two fields: `data` (the opaque value) and `ver` (a
//! monotonically increasing generation counter). `gets` hands `ver` out as
//! the token; `add`, `cas`, and `set` run small Lua scripts so the
//! existence/token check and the write are atomic server-side. Every
//! successful write bumps `ver`, invalidating outstanding tokens.
//!
//! Eviction is Redis's concern (maxmemory policies); callers already treat
//! every key as evictable.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, Script};
use tracing::debug;
use webcache_types::ports::kv::{CasResult, CasToken, KvStore};
use webcache_types::{Error, Result};

/// Lua script for insert-if-absent
const ADD_SCRIPT: &str = r#"
    if redis.call("EXISTS", KEYS[1]) == 1 then
        return 0
    end
    redis.call("HSET", KEYS[1], "data", ARGV[1], "ver", 1)
    return 1
"#;

/// Lua script for compare-and-swap on the generation counter
///
/// Returns -1 when the key is absent, 0 on a stale token, 1 when stored.
const CAS_SCRIPT: &str = r#"
    if redis.call("EXISTS", KEYS[1]) == 0 then
        return -1
    end
    if redis.call("HGET", KEYS[1], "ver") ~= ARGV[2] then
        return 0
    end
    redis.call("HSET", KEYS[1], "data", ARGV[1])
    redis.call("HINCRBY", KEYS[1], "ver", 1)
    return 1
"#;

/// Lua script for an unconditional write that still bumps the generation
const SET_SCRIPT: &str = r#"
    if redis.call("EXISTS", KEYS[1]) == 1 then
        redis.call("HSET", KEYS[1], "data", ARGV[1])
        redis.call("HINCRBY", KEYS[1], "ver", 1)
    else
        redis.call("HSET", KEYS[1], "data", ARGV[1], "ver", 1)
    end
    return 1
"#;

/// Redis-backed [`KvStore`]
///
/// Uses a multiplexed connection for efficient concurrent access; cloning
/// is cheap and shares the connection.
#[derive(Clone)]
pub struct RedisKv {
    conn: MultiplexedConnection,
}

impl RedisKv {
    /// Connect to a Redis instance
    ///
    /// # Arguments
    ///
    /// * `redis_url` - connection URL, e.g. `"redis://127.0.0.1:6379"`
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(Self::convert_error)?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(Self::convert_error)?;
        Ok(Self { conn })
    }

    fn convert_error(err: RedisError) -> Error {
        Error::store(format!("redis error: {}", err))
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = redis::cmd("HGET")
            .arg(key)
            .arg("data")
            .query_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        debug!(key, hit = data.is_some(), "kv get");
        Ok(data)
    }

    async fn gets(&self, key: &str) -> Result<Option<(Vec<u8>, CasToken)>> {
        let mut conn = self.conn.clone();
        let (data, ver): (Option<Vec<u8>>, Option<u64>) = redis::cmd("HMGET")
            .arg(key)
            .arg("data")
            .arg("ver")
            .query_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        debug!(key, hit = data.is_some(), "kv gets");
        match (data, ver) {
            (Some(data), Some(ver)) => Ok(Some((data, ver))),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut conn = self.conn.clone();
        let stored: i32 = Script::new(SET_SCRIPT)
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        debug!(key, "kv set");
        Ok(stored == 1)
    }

    async fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut conn = self.conn.clone();
        let inserted: i32 = Script::new(ADD_SCRIPT)
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        debug!(key, inserted = inserted == 1, "kv add");
        Ok(inserted == 1)
    }

    async fn cas(&self, key: &str, value: &[u8], token: CasToken) -> Result<CasResult> {
        let mut conn = self.conn.clone();
        let outcome: i32 = Script::new(CAS_SCRIPT)
            .key(key)
            .arg(value)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        let result = match outcome {
            1 => CasResult::Stored,
            0 => CasResult::Mismatch,
            _ => CasResult::NotFound,
        };
        debug!(key, ?result, "kv cas");
        Ok(result)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        debug!(key, existed = removed > 0, "kv delete");
        Ok(removed > 0)
    }
}
