//! # Webcache Gateway
//!
//! The HTTP surface of the webcache intermediary: an axum server that
//! turns inbound GETs into engine calls, a reqwest adapter for origin
//! fetches, and environment-driven configuration. Mount it behind a
//! rewrite rule that routes external (non-loopback) requests here, with
//! the origin resolving loopback requests directly.

pub mod config;
pub mod handler;
pub mod origin;

pub use config::GatewayConfig;
pub use handler::{router, AppState};
pub use origin::ReqwestOrigin;
