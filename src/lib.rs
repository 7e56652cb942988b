//! Tollgate Library
//!
//! Stateless, address-bound cookie authentication tokens sealed with
//! a keyed digest: a wire codec and validator at the core, with cookie
//! transport, configuration, and an audit trail around them.

pub mod audit;
pub mod clock;
pub mod config;
pub mod cookie;
pub mod error;
pub mod gate;
pub mod nonce;
pub mod token;
