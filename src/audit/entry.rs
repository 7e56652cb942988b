//! Audit entry types.
//!
//! Defines the structure of audit log entries.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A single audit log entry.
///
/// One record per issuance and per presented token. Digests never
/// appear whole; only an 8-character prefix is kept for correlation.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp when the record was made.
    pub timestamp: String,
    /// Unique identifier for the record.
    pub record_id: Uuid,
    /// Cookie name the record belongs to.
    pub cookie_name: String,
    /// Subject named by the token, when one could be read. Only
    /// granted records carry an authenticated subject; denied records
    /// carry the token's claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Address observed on the request, or minted into the token.
    pub address: String,
    /// Leading characters of the token digest, when one was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_prefix: Option<String>,
    /// What happened.
    pub outcome: AuditOutcome,
}

impl AuditEntry {
    /// Record a freshly minted token.
    pub fn issued(
        cookie_name: &str,
        subject: &str,
        address: &str,
        expires_at: &str,
        digest_prefix: &str,
    ) -> Self {
        Self {
            timestamp: now_rfc3339(),
            record_id: Uuid::new_v4(),
            cookie_name: cookie_name.to_string(),
            subject: Some(subject.to_string()),
            address: address.to_string(),
            digest_prefix: Some(digest_prefix.to_string()),
            outcome: AuditOutcome::Issued {
                expires_at: expires_at.to_string(),
            },
        }
    }

    /// Record an accepted token.
    pub fn granted(
        cookie_name: &str,
        subject: &str,
        address: &str,
        digest_prefix: &str,
        refreshed: bool,
    ) -> Self {
        Self {
            timestamp: now_rfc3339(),
            record_id: Uuid::new_v4(),
            cookie_name: cookie_name.to_string(),
            subject: Some(subject.to_string()),
            address: address.to_string(),
            digest_prefix: Some(digest_prefix.to_string()),
            outcome: AuditOutcome::Granted { refreshed },
        }
    }

    /// Record a presented token that was turned away.
    pub fn denied(
        cookie_name: &str,
        address: &str,
        reason: &str,
        subject: Option<&str>,
        token_address: Option<&str>,
        digest_prefix: Option<&str>,
    ) -> Self {
        Self {
            timestamp: now_rfc3339(),
            record_id: Uuid::new_v4(),
            cookie_name: cookie_name.to_string(),
            subject: subject.map(str::to_string),
            address: address.to_string(),
            digest_prefix: digest_prefix.map(str::to_string),
            outcome: AuditOutcome::Denied {
                reason: reason.to_string(),
                token_address: token_address.map(str::to_string),
            },
        }
    }
}

/// Outcome of the audited event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum AuditOutcome {
    /// A token was minted.
    #[serde(rename = "issued")]
    Issued {
        /// Wire stamp the token expires at.
        expires_at: String,
    },
    /// A presented token was accepted.
    #[serde(rename = "granted")]
    Granted {
        /// Whether a refreshed cookie was minted alongside.
        refreshed: bool,
    },
    /// A presented token was rejected or unreadable.
    #[serde(rename = "denied")]
    Denied {
        /// Stable reason name.
        reason: String,
        /// Address carried inside the token, when it could be read.
        #[serde(skip_serializing_if = "Option::is_none")]
        token_address: Option<String>,
    },
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
