//! Construction of Set-Cookie header values.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Escape set for cookie values: everything outside the unreserved
/// characters, so the raw token's commas survive transport.
const VALUE_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Scoping and security attributes stamped onto every Set-Cookie this
/// crate produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    /// `Path=` attribute, omitted when `None`.
    pub path: Option<String>,
    /// `Domain=` attribute, omitted when `None`.
    pub domain: Option<String>,
    /// Emit the `Secure` flag.
    pub secure: bool,
    /// Emit the `HttpOnly` flag.
    pub http_only: bool,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: None,
            domain: None,
            secure: false,
            http_only: true,
        }
    }
}

/// How long the cookie should live in the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieLifetime {
    /// No `Expires` attribute; the agent drops the cookie when the
    /// session ends.
    Session,
    /// `Expires` at the given instant.
    Until(DateTime<Utc>),
}

/// Build a Set-Cookie value carrying `value` under `name`.
pub fn set_cookie(
    name: &str,
    value: &str,
    lifetime: CookieLifetime,
    attrs: &CookieAttributes,
) -> String {
    let mut header = format!("{}={}", name, utf8_percent_encode(value, VALUE_ESCAPE));
    if let CookieLifetime::Until(at) = lifetime {
        header.push_str("; Expires=");
        header.push_str(&http_date(at));
    }
    push_scope(&mut header, attrs);
    header
}

/// Build a Set-Cookie value that removes the named cookie: empty value
/// and an epoch expiry.
pub fn clear_cookie(name: &str, attrs: &CookieAttributes) -> String {
    let mut header = format!("{name}=; Expires=");
    header.push_str(&httpdate::fmt_http_date(UNIX_EPOCH));
    push_scope(&mut header, attrs);
    header
}

fn push_scope(header: &mut String, attrs: &CookieAttributes) {
    if let Some(path) = &attrs.path {
        header.push_str("; Path=");
        header.push_str(path);
    }
    if let Some(domain) = &attrs.domain {
        header.push_str("; Domain=");
        header.push_str(domain);
    }
    if attrs.secure {
        header.push_str("; Secure");
    }
    if attrs.http_only {
        header.push_str("; HttpOnly");
    }
}

/// RFC 1123 date for the `Expires` attribute. Instants before the
/// epoch clamp to the epoch.
fn http_date(at: DateTime<Utc>) -> String {
    let since_epoch = u64::try_from(at.timestamp()).unwrap_or(0);
    httpdate::fmt_http_date(SystemTime::UNIX_EPOCH + Duration::from_secs(since_epoch))
}
