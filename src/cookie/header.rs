//! Extraction of the token from a Cookie request header.

use percent_encoding::percent_decode_str;

/// Find the named cookie in a `Cookie` header value and return its
/// percent-decoded value.
///
/// Pairs are matched on the exact name; the first match wins. Bytes
/// that do not decode as UTF-8 come back lossily, which downstream
/// structural parsing then rejects.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    for pair in header.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key.trim() != name {
            continue;
        }
        let value = value.trim();
        return Some(percent_decode_str(value).decode_utf8_lossy().into_owned());
    }
    None
}
