//! # Webcache Engine
//!
//! The cache-coordination engine behind the webcache intermediary. Given
//! only `get`/`gets`/`add`/`cas`/`set`/`delete` primitives on a shared
//! store that may evict any key at any time, it guarantees at-most-one
//! worker fetches the origin per URL while other workers wait for that
//! result or correctly fall through to the origin when coordination state
//! is lost.
//!
//! ## Modules
//!
//! - [`key`]: deterministic metadata/content key derivation
//! - [`record`]: the persisted metadata and content records and their
//!   in-memory envelopes
//! - [`httpdate`]: RFC 1123 date handling for `Last-Modified`
//! - [`serve`]: the serve-from-cache predicate
//! - [`reserve`]: the reservation (contention) protocol
//! - [`update`]: the publication protocol
//! - [`engine`]: the orchestrator composing all of the above
//! - [`response`]: outbound response assembly
//! - [`adapters`]: Redis implementation of the KV port

pub mod adapters;
pub mod config;
pub mod engine;
pub mod httpdate;
pub mod key;
pub mod record;
pub mod reserve;
pub mod response;
pub mod serve;
pub mod update;

// Re-exports for convenience
pub use adapters::RedisKv;
pub use config::EngineConfig;
pub use engine::{CacheEngine, CacheRequest};
pub use record::{ContentEntry, ContentRecord, MetadataEntry, MetadataRecord, ReservationToken};
pub use response::ClientResponse;
