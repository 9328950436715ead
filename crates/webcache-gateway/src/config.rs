//! Environment-driven gateway configuration
//!
//! Every knob has a default matching a local single-host deployment: the
//! store and the origin both on loopback, with the origin treated as
//! privileged (the paired server must fully resolve requests arriving
//! from localhost, or the cache would chase its own tail).

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use webcache_engine::EngineConfig;

/// Gateway process configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address
    pub bind: String,
    /// Redis connection URL for the shared store
    pub redis_url: String,
    /// Base URL of the origin server
    pub origin_url: String,
    /// Origin connect timeout
    pub connect_timeout: Duration,
    /// Origin total read timeout
    pub read_timeout: Duration,
    /// Coordination engine knobs
    pub engine: EngineConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            origin_url: "http://127.0.0.1".to_string(),
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_secs(15),
            engine: EngineConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from `WEBCACHE_*` environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var("WEBCACHE_BIND") {
            config.bind = value;
        }
        if let Ok(value) = env::var("WEBCACHE_REDIS_URL") {
            config.redis_url = value;
        }
        if let Ok(value) = env::var("WEBCACHE_ORIGIN_URL") {
            config.origin_url = value;
        }
        if let Some(ms) = env_parse::<u64>("WEBCACHE_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("WEBCACHE_READ_TIMEOUT_SECS") {
            config.read_timeout = Duration::from_secs(secs);
        }

        if let Some(ms) = env_parse::<u64>("WEBCACHE_POLL_INTERVAL_MS") {
            config.engine.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("WEBCACHE_BACKOFF_MULTIPLY_SECS") {
            config.engine.backoff_multiply_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("WEBCACHE_BACKOFF_MAX_SECS") {
            config.engine.backoff_max_secs = secs;
        }
        if let Some(attempts) = env_parse::<u32>("WEBCACHE_UPDATE_MAX_ATTEMPTS") {
            config.engine.update_max_attempts = attempts;
        }
        if let Some(secs) = env_parse::<i64>("WEBCACHE_EXPIRE_SECS") {
            config.engine.expire_secs = secs;
        }
        if let Some(drop) = env_parse::<bool>("WEBCACHE_DROP_NOT_OK") {
            config.engine.drop_not_ok_status = drop;
        }

        config
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(%name, %raw, "ignoring unparseable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.origin_url, "http://127.0.0.1");
        assert_eq!(config.connect_timeout, Duration::from_millis(500));
        assert_eq!(config.read_timeout, Duration::from_secs(15));
        assert_eq!(config.engine.expire_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("WEBCACHE_ORIGIN_URL", "http://10.0.0.1:8081");
        env::set_var("WEBCACHE_EXPIRE_SECS", "120");
        env::set_var("WEBCACHE_UPDATE_MAX_ATTEMPTS", "not a number");

        let config = GatewayConfig::from_env();
        assert_eq!(config.origin_url, "http://10.0.0.1:8081");
        assert_eq!(config.engine.expire_secs, 120);
        // unparseable values fall back to the default
        assert_eq!(config.engine.update_max_attempts, 20);

        env::remove_var("WEBCACHE_ORIGIN_URL");
        env::remove_var("WEBCACHE_EXPIRE_SECS");
        env::remove_var("WEBCACHE_UPDATE_MAX_ATTEMPTS");
    }
}
