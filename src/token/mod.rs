//! Token core.
//!
//! Wire codec for the comma-joined token form, the digest schemes
//! sealing it, and the validator producing verdicts.

mod codec;
mod digest;
mod fields;
mod stamp;
mod validator;

pub use codec::{FIELD_SEPARATOR, TokenCodec};
pub use digest::DigestScheme;
pub use fields::TokenFields;
pub use stamp::{STAMP_FORMAT, STAMP_LEN, format_stamp, parse_stamp};
pub use validator::{RejectReason, TokenValidator, Verdict};
