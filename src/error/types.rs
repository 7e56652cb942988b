//! Error types for tollgate.

use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Token encoding errors.
    #[error("Encoding error: {kind}")]
    Encode { kind: EncodeErrorKind },

    /// Token parsing errors.
    #[error("Malformed token: {kind}")]
    Malformed { kind: MalformedErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Encoding error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeErrorKind {
    #[error("Field '{field}' is empty")]
    EmptyField { field: &'static str },

    #[error("Field '{field}' contains the ',' separator: {value}")]
    SeparatorInField { field: &'static str, value: String },

    #[error("Expiry '{value}' does not fit the YYYYMMDDTHHMMSS stamp")]
    ExpiryOutOfRange { value: String },
}

/// Parsing error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedErrorKind {
    #[error("Expected 5 comma-separated fields, found {count}")]
    FieldCount { count: usize },

    #[error("Field '{field}' is empty")]
    EmptyField { field: &'static str },

    #[error("Expiry stamp is not in YYYYMMDDTHHMMSS form: {value}")]
    BadStamp { value: String },

    #[error("Nonce is not a decimal integer: {value}")]
    BadNonce { value: String },

    #[error("Digest is not {expected_len} hex characters: {value}")]
    BadDigest { value: String, expected_len: usize },
}

/// Result type alias for crate operations.
pub type GateResult<T> = Result<T, GateError>;
