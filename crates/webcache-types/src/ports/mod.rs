//! Port interfaces for dependency inversion
//!
//! Backend-agnostic trait definitions for the shared store, the origin
//! client, and system-level concerns (time, randomness). Concrete
//! implementations live next to the subsystems that own them; the
//! in-memory KV store lives here so tests everywhere can use it.

pub mod infrastructure;
pub mod kv;
pub mod memory_kv;
pub mod origin;

// Re-export for convenience
pub use infrastructure::{
    Clock, DeterministicEntropy, Entropy, FakeClock, SystemClock, SystemEntropy,
};
pub use kv::{CasResult, CasToken, KvStore};
pub use memory_kv::MemoryKv;
pub use origin::{header_lookup, OriginClient, OriginResponse};
