//! Nonce draws for minted tokens.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of per-token nonces.
///
/// A nonce disambiguates tokens minted for the same subject within the
/// same second; it carries no replay defense on its own.
pub trait NonceSource: Send + Sync {
    /// Draw the next nonce.
    fn next_nonce(&self) -> u64;
}

/// Nonce source backed by the thread-local RNG.
pub struct SystemNonce;

impl NonceSource for SystemNonce {
    fn next_nonce(&self) -> u64 {
        rand::random()
    }
}

/// Deterministic nonce source counting up from a starting value.
pub struct SequenceNonce {
    next: AtomicU64,
}

impl SequenceNonce {
    /// Create a sequence starting at `first`.
    pub fn new(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl NonceSource for SequenceNonce {
    fn next_nonce(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_counts_up() {
        let source = SequenceNonce::new(41);
        assert_eq!(source.next_nonce(), 41);
        assert_eq!(source.next_nonce(), 42);
        assert_eq!(source.next_nonce(), 43);
    }

    #[test]
    fn test_system_nonce_varies() {
        let source = SystemNonce;
        let draws: std::collections::HashSet<u64> =
            (0..4).map(|_| source.next_nonce()).collect();
        assert!(draws.len() > 1);
    }
}
