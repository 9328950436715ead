//! Infrastructure adapters implementing port traits

pub mod redis_kv;

pub use redis_kv::RedisKv;
