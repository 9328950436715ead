//! HTTP date handling for the synthesized `Last-Modified` header
//!
//! Formatting is RFC 1123 in GMT. Parsing accepts the `GMT` and `UTC`
//! timezone literals; any other timezone name, or any parse failure, makes
//! the date count as absent so malformed client headers fail open.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use webcache_types::header_lookup;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// Format a time as an RFC 1123 GMT date string
pub fn make_http_date(time: DateTime<Utc>) -> String {
    format!("{} GMT", time.format(HTTP_DATE_FORMAT))
}

/// Parse an RFC 1123 date string, `None` when malformed
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let rest = value
        .trim()
        .strip_suffix(" GMT")
        .or_else(|| value.trim().strip_suffix(" UTC"))?;
    let naive = NaiveDateTime::parse_from_str(rest, HTTP_DATE_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// The given time or the `Last-Modified` header, whichever is older,
/// formatted for the wire
///
/// Never advertises a modification time newer than the origin's own claim,
/// nor newer than the moment this cache observed it.
pub fn time_or_last_modified(now: DateTime<Utc>, headers: &BTreeMap<String, String>) -> String {
    if let Some(value) = header_lookup(headers, "Last-Modified") {
        if let Some(claimed) = parse_http_date(value) {
            return make_http_date(now.min(claimed));
        }
    }
    make_http_date(now)
}
