//! The `YYYYMMDDTHHMMSS` UTC expiry stamp.
//!
//! The stamp appears verbatim in both the wire token and the digest
//! input, so formatting and parsing must agree byte-for-byte.

use chrono::{DateTime, NaiveDateTime, Utc};

/// strftime form of the wire stamp. Second resolution, always UTC, no
/// timezone suffix.
pub const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Length of a well-formed stamp.
pub const STAMP_LEN: usize = 15;

/// Format an instant as a wire stamp, dropping sub-second precision.
pub fn format_stamp(at: DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Parse a wire stamp.
///
/// Strict: exactly 15 bytes, `T` at offset 8, ASCII digits everywhere
/// else, and a real calendar moment. Returns `None` otherwise.
pub fn parse_stamp(value: &str) -> Option<DateTime<Utc>> {
    let bytes = value.as_bytes();
    if bytes.len() != STAMP_LEN || bytes[8] != b'T' {
        return None;
    }
    if !bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 8 || b.is_ascii_digit())
    {
        return None;
    }
    NaiveDateTime::parse_from_str(value, STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
