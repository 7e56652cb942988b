//! Wire codec for the comma-joined token form.

use crate::error::{EncodeErrorKind, GateError, GateResult, MalformedErrorKind};
use crate::token::digest::DigestScheme;
use crate::token::fields::TokenFields;
use crate::token::stamp::{format_stamp, parse_stamp};

/// Separator between wire fields.
pub const FIELD_SEPARATOR: char = ',';

/// Number of wire fields.
const FIELD_COUNT: usize = 5;

/// Wire-order field names, used in parse errors.
const FIELD_NAMES: [&str; FIELD_COUNT] =
    ["subject", "client_address", "expiry", "nonce", "digest"];

/// Encoder/decoder for the five-field wire form:
///
/// `subject,client_address,expiry_stamp,nonce,digest`
///
/// Encoding seals the token; parsing is purely structural and never
/// consults the secret or the clock.
#[derive(Debug, Clone, Copy)]
pub struct TokenCodec {
    scheme: DigestScheme,
}

impl TokenCodec {
    pub fn new(scheme: DigestScheme) -> Self {
        Self { scheme }
    }

    /// The sealing scheme this codec encodes and parses for.
    pub fn scheme(&self) -> DigestScheme {
        self.scheme
    }

    /// Seal and encode a token.
    ///
    /// The digest is computed here from the cleartext fields, the
    /// namespace label, and the secret; any digest already present in
    /// `fields` is ignored.
    pub fn encode(
        &self,
        fields: &TokenFields,
        namespace: &str,
        secret: &str,
    ) -> GateResult<String> {
        if fields.subject.is_empty() {
            return Err(encode_error(EncodeErrorKind::EmptyField { field: "subject" }));
        }
        if fields.client_address.is_empty() {
            return Err(encode_error(EncodeErrorKind::EmptyField {
                field: "client_address",
            }));
        }
        require_no_separator("subject", &fields.subject)?;
        require_no_separator("client_address", &fields.client_address)?;
        require_no_separator("namespace", namespace)?;

        let stamp = format_stamp(fields.expires_at);
        // A year outside 0000-9999 cannot render as a 15-byte stamp
        if parse_stamp(&stamp).is_none() {
            return Err(encode_error(EncodeErrorKind::ExpiryOutOfRange {
                value: stamp,
            }));
        }
        let digest = self.scheme.compute(
            &fields.subject,
            &fields.client_address,
            &stamp,
            fields.nonce,
            namespace,
            secret,
        );
        Ok(format!(
            "{subject}{sep}{address}{sep}{stamp}{sep}{nonce}{sep}{digest}",
            subject = fields.subject,
            address = fields.client_address,
            nonce = fields.nonce,
            sep = FIELD_SEPARATOR,
        ))
    }

    /// Parse a wire token into its fields.
    pub fn parse(&self, token: &str) -> GateResult<TokenFields> {
        self.parse_fields(token)
            .map_err(|kind| GateError::Malformed { kind })
    }

    /// Parse, surfacing the malformed kind directly. Gate-level
    /// callers keep the kind as a deny cause instead of an error.
    pub(crate) fn parse_fields(&self, token: &str) -> Result<TokenFields, MalformedErrorKind> {
        let parts: Vec<&str> = token.split(FIELD_SEPARATOR).collect();
        if parts.len() != FIELD_COUNT {
            return Err(MalformedErrorKind::FieldCount {
                count: parts.len(),
            });
        }
        for (name, part) in FIELD_NAMES.into_iter().zip(parts.iter()) {
            if part.is_empty() {
                return Err(MalformedErrorKind::EmptyField { field: name });
            }
        }

        let expires_at = parse_stamp(parts[2]).ok_or_else(|| MalformedErrorKind::BadStamp {
            value: parts[2].to_string(),
        })?;
        let nonce = parse_nonce(parts[3]).ok_or_else(|| MalformedErrorKind::BadNonce {
            value: parts[3].to_string(),
        })?;

        let digest = parts[4];
        let expected_len = self.scheme.digest_hex_len();
        if digest.len() != expected_len || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MalformedErrorKind::BadDigest {
                value: digest.to_string(),
                expected_len,
            });
        }

        Ok(TokenFields {
            subject: parts[0].to_string(),
            client_address: parts[1].to_string(),
            expires_at,
            nonce,
            digest: digest.to_string(),
        })
    }
}

/// Parse the nonce field: canonical decimal only. Leading zeros are
/// rejected so that re-rendering the numeric value for the digest
/// input always reproduces the wire bytes.
fn parse_nonce(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.len() > 1 && value.starts_with('0') {
        return None;
    }
    value.parse().ok()
}

fn require_no_separator(field: &'static str, value: &str) -> GateResult<()> {
    if value.contains(FIELD_SEPARATOR) {
        return Err(encode_error(EncodeErrorKind::SeparatorInField {
            field,
            value: value.to_string(),
        }));
    }
    Ok(())
}

fn encode_error(kind: EncodeErrorKind) -> GateError {
    GateError::Encode { kind }
}
