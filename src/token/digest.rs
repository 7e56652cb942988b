//! Keyed digest schemes sealing a token.

use md5::{Digest as _, Md5};
use ring::{hmac, rand::SystemRandom};

/// Available sealing schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestScheme {
    /// HMAC-SHA256 keyed by the shared secret. The default.
    HmacSha256,
    /// Historical secret-suffix MD5 seal, kept for interoperating
    /// with already-deployed issuers and their live tokens.
    LegacyMd5,
}

impl DigestScheme {
    /// Parse a configured scheme name.
    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "hmac-sha256" => Some(Self::HmacSha256),
            "legacy-md5" => Some(Self::LegacyMd5),
            _ => None,
        }
    }

    /// Configured name of the scheme.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::LegacyMd5 => "legacy-md5",
        }
    }

    /// Length of the lowercase hex seal this scheme produces.
    pub const fn digest_hex_len(&self) -> usize {
        match self {
            Self::HmacSha256 => 64,
            Self::LegacyMd5 => 32,
        }
    }

    /// Compute the lowercase hex seal over the cleartext fields.
    pub fn compute(
        &self,
        subject: &str,
        client_address: &str,
        stamp: &str,
        nonce: u64,
        namespace: &str,
        secret: &str,
    ) -> String {
        let message = digest_input(subject, client_address, stamp, nonce, namespace);
        match self {
            Self::HmacSha256 => {
                let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
                hex::encode(hmac::sign(&key, message.as_bytes()).as_ref())
            }
            Self::LegacyMd5 => {
                let mut hasher = Md5::new();
                hasher.update(message.as_bytes());
                hasher.update([b' ']);
                hasher.update(secret.as_bytes());
                hex::encode(hasher.finalize())
            }
        }
    }

    /// Verify a presented hex seal.
    ///
    /// Comparison happens on the decoded bytes in constant time, so
    /// hex case does not matter.
    pub fn verify(
        &self,
        subject: &str,
        client_address: &str,
        stamp: &str,
        nonce: u64,
        namespace: &str,
        secret: &str,
        presented: &str,
    ) -> bool {
        let Ok(presented) = hex::decode(presented) else {
            return false;
        };
        let message = digest_input(subject, client_address, stamp, nonce, namespace);
        match self {
            Self::HmacSha256 => {
                let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
                hmac::verify(&key, message.as_bytes(), &presented).is_ok()
            }
            Self::LegacyMd5 => {
                let mut hasher = Md5::new();
                hasher.update(message.as_bytes());
                hasher.update([b' ']);
                hasher.update(secret.as_bytes());
                constant_time_eq(hasher.finalize().as_slice(), &presented)
            }
        }
    }
}

/// Digest input: the cleartext fields space-joined in wire order, then
/// the namespace label. The legacy scheme appends the secret after one
/// more space; HMAC keys on the secret instead.
fn digest_input(
    subject: &str,
    client_address: &str,
    stamp: &str,
    nonce: u64,
    namespace: &str,
) -> String {
    format!("{subject} {client_address} {stamp} {nonce} {namespace}")
}

/// Slice equality without data-dependent timing. Both sides are
/// tagged under a single-use random key and the tags go through
/// `hmac::verify`; a key generation failure reads as a mismatch.
fn constant_time_eq(computed: &[u8], presented: &[u8]) -> bool {
    let Ok(key) = hmac::Key::generate(hmac::HMAC_SHA256, &SystemRandom::new()) else {
        return false;
    };
    let tag = hmac::sign(&key, computed);
    hmac::verify(&key, presented, tag.as_ref()).is_ok()
}
