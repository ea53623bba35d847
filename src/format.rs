//! Date/time formatting for the `Date` response header and the per-request
//! log line.
//!
//! Grounded on `http/http.c`'s `get_http_datetime`/`get_local_datetime`. The
//! source formats into a hidden `static char buffer[256]`, which is flagged
//! in the spec's design notes as not safely reusable across two live
//! callers; here both functions return an owned `String` instead.

use std::time::SystemTime;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

/// `Date: <WWW>, <DD> <MMM> <YYYY> <HH>:<MM>:<SS> GMT`, RFC 1123 style.
pub fn http_date(now: SystemTime) -> String {
    let dt: OffsetDateTime = now.into();
    // Rfc2822 renders the identical "Thu, 01 Jan 1970 00:00:00 +0000" shape
    // the wire format needs; swap the zone suffix for the literal "GMT".
    let rfc2822 = dt.format(&Rfc2822).expect("formattable timestamp");
    let body = rfc2822.trim_end_matches("+0000");
    format!("{body}GMT")
}

/// `[YYYY-MM-DD HH:MM:SS]` local-time prefix for the one-line-per-request
/// access log. Reuses the ambient logging crate's timestamp so the access
/// log and the `info!`/`debug!` lines share one clock source.
pub fn log_timestamp(now: SystemTime) -> String {
    proxy_log::format_time(now)
}
