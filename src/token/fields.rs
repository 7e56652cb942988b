//! Decoded wire fields of a token.

use chrono::{DateTime, Utc};

/// The five fields carried by a token, in wire order.
///
/// A value is built once at issuance (digest filled in by the codec)
/// or reconstructed by parsing, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFields {
    /// Authenticated subject (user id).
    pub subject: String,
    /// Client address the token is bound to, as text.
    pub client_address: String,
    /// Expiry instant, second resolution.
    pub expires_at: DateTime<Utc>,
    /// Per-issuance nonce.
    pub nonce: u64,
    /// Keyed digest over the other fields, lowercase hex when minted
    /// here.
    pub digest: String,
}

impl TokenFields {
    /// Fields for a token about to be minted. The digest is computed
    /// by the codec at encode time and left empty here.
    pub fn new(
        subject: impl Into<String>,
        client_address: impl Into<String>,
        expires_at: DateTime<Utc>,
        nonce: u64,
    ) -> Self {
        Self {
            subject: subject.into(),
            client_address: client_address.into(),
            expires_at,
            nonce,
            digest: String::new(),
        }
    }

    /// Leading digest characters, safe for logs and audit records.
    pub fn digest_prefix(&self) -> &str {
        self.digest.get(..8).unwrap_or(&self.digest)
    }
}
