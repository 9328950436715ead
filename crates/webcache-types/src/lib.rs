//! # Webcache Types
//!
//! Shared types and port traits for the webcache intermediary. This crate
//! holds what every other crate needs to agree on: the error type, the
//! narrow KV store contract, the origin client contract, and the clock and
//! entropy abstractions that keep the coordination protocol testable.
//!
//! ## Organization
//!
//! - `error`: the workspace error enum and `Result` alias
//! - `ports`: trait definitions plus the in-memory KV implementation

pub mod error;
pub mod ports;

// Re-export commonly used types
pub use error::{Error, Result};
pub use ports::{
    header_lookup, CasResult, CasToken, Clock, DeterministicEntropy, Entropy, FakeClock, KvStore,
    MemoryKv, OriginClient, OriginResponse, SystemClock, SystemEntropy,
};
