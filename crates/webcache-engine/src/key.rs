//! Deterministic cache key derivation
//!
//! Two keys exist per URL: the metadata key, derived from the URL alone,
//! and the content key, which additionally encodes the reservation token so
//! that every publication attempt within a metadata lifetime lands on its
//! own key. The session component is rendered as seconds with exactly six
//! fractional digits so the layout is byte-stable across workers.

use crate::record::ReservationToken;

/// Key of the metadata record for a URL
pub fn metadata_key(url: &str) -> String {
    format!("metadata_{}", url)
}

/// Key of the content record for a URL and reservation token
pub fn content_key(url: &str, token: &ReservationToken) -> String {
    format!(
        "body_{}_{}-{}",
        url,
        format_session(token.session),
        token.reservation
    )
}

/// Render a microsecond session nonce as `<secs>.<6-digit-frac>`
pub fn format_session(session_micros: i64) -> String {
    format!(
        "{}.{:06}",
        session_micros / 1_000_000,
        session_micros.rem_euclid(1_000_000)
    )
}
