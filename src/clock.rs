//! Injectable time source for minting and validation.

use chrono::{DateTime, Utc};

/// Source of the current moment, UTC.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
///
/// Used by tests and by the CLI to replay a validation at a chosen
/// moment.
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    /// Create a clock frozen at the given instant.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}
