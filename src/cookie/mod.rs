//! Cookie transport.
//!
//! Pulls the token out of a Cookie request header and builds the
//! Set-Cookie values that install, refresh, or remove it.

mod attributes;
mod header;

pub use attributes::{CookieAttributes, CookieLifetime, clear_cookie, set_cookie};
pub use header::find_cookie;
