//! Audit logging module.
//!
//! Provides structured audit logging for token issuance and checks.
//! Logs are written in JSON lines format for easy parsing by log
//! analysis tools.
//!
//! ## Features
//!
//! - Structured JSON records per issuance and per presented token
//! - Digests reduced to a short prefix before they reach a record
//! - Thread-safe file writing with sync for durability

mod entry;
mod logger;

pub use entry::{AuditEntry, AuditOutcome};
pub use logger::AuditLogger;
