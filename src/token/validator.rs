//! Semantic validation of parsed tokens.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::token::digest::DigestScheme;
use crate::token::fields::TokenFields;
use crate::token::stamp::format_stamp;

/// Outcome of validating one token. Rejection is an expected outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The token is authentic, bound to the observed address, and
    /// unexpired. Carries the authenticated subject.
    Accepted(String),
    /// The token failed one check. The first failing check wins.
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

/// Why a structurally valid token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The seal does not verify under the given namespace and secret.
    DigestMismatch,
    /// The token is bound to a different client address.
    AddressMismatch,
    /// The token's expiry instant lies in the past.
    ExpiredToken,
}

impl RejectReason {
    /// Stable snake_case name, used in logs and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::DigestMismatch => "digest_mismatch",
            RejectReason::AddressMismatch => "address_mismatch",
            RejectReason::ExpiredToken => "expired_token",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates parsed tokens against the observed address and the clock.
///
/// Checks run in a fixed order: seal, then address binding, then
/// expiry. The seal is checked first so that no other field is trusted
/// before the token is known to be authentic.
#[derive(Debug, Clone, Copy)]
pub struct TokenValidator {
    scheme: DigestScheme,
    skew_tolerance_seconds: u64,
}

impl TokenValidator {
    /// Create a validator for the given scheme.
    ///
    /// `skew_tolerance_seconds` widens only the expiry check, to
    /// absorb clock drift between issuer and validator. Zero keeps the
    /// literal expiry.
    pub fn new(scheme: DigestScheme, skew_tolerance_seconds: u64) -> Self {
        Self {
            scheme,
            skew_tolerance_seconds,
        }
    }

    /// Validate one token.
    ///
    /// The secret and namespace arrive per call; nothing is cached, so
    /// secret rotation takes effect immediately and a caller may retry
    /// the same fields against a previous secret generation.
    pub fn validate(
        &self,
        fields: &TokenFields,
        observed_address: &str,
        now: DateTime<Utc>,
        namespace: &str,
        secret: &str,
    ) -> Verdict {
        let stamp = format_stamp(fields.expires_at);
        let authentic = self.scheme.verify(
            &fields.subject,
            &fields.client_address,
            &stamp,
            fields.nonce,
            namespace,
            secret,
            &fields.digest,
        );
        if !authentic {
            return Verdict::Rejected(RejectReason::DigestMismatch);
        }

        if fields.client_address != observed_address {
            return Verdict::Rejected(RejectReason::AddressMismatch);
        }

        // Inclusive boundary: a token expiring exactly now is accepted.
        let skew = i64::try_from(self.skew_tolerance_seconds).unwrap_or(i64::MAX);
        let deadline = fields.expires_at.timestamp().saturating_add(skew);
        if now.timestamp() > deadline {
            return Verdict::Rejected(RejectReason::ExpiredToken);
        }

        Verdict::Accepted(fields.subject.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::codec::TokenCodec;
    use chrono::{Duration, TimeZone};

    const SECRET: &str = "b8fe1a14004fde480179819713badeca";
    const NAMESPACE: &str = "ud-nss-auth";

    fn expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2009, 11, 10, 17, 43, 33).unwrap()
    }

    fn sealed_fields(scheme: DigestScheme) -> TokenFields {
        let codec = TokenCodec::new(scheme);
        let fields = TokenFields::new("frey", "203.0.113.5", expiry(), 123456);
        let token = codec.encode(&fields, NAMESPACE, SECRET).unwrap();
        codec.parse(&token).unwrap()
    }

    fn validator(scheme: DigestScheme) -> TokenValidator {
        TokenValidator::new(scheme, 0)
    }

    #[test]
    fn test_accepts_valid_token_before_expiry() {
        for scheme in [DigestScheme::HmacSha256, DigestScheme::LegacyMd5] {
            let fields = sealed_fields(scheme);
            let now = expiry() - Duration::seconds(10);
            let verdict =
                validator(scheme).validate(&fields, "203.0.113.5", now, NAMESPACE, SECRET);
            assert_eq!(verdict, Verdict::Accepted("frey".to_string()));
        }
    }

    #[test]
    fn test_accepts_at_exact_expiry_instant() {
        let fields = sealed_fields(DigestScheme::HmacSha256);
        let verdict = validator(DigestScheme::HmacSha256).validate(
            &fields,
            "203.0.113.5",
            expiry(),
            NAMESPACE,
            SECRET,
        );
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_rejects_one_second_past_expiry() {
        let fields = sealed_fields(DigestScheme::HmacSha256);
        let now = expiry() + Duration::seconds(1);
        let verdict = validator(DigestScheme::HmacSha256).validate(
            &fields,
            "203.0.113.5",
            now,
            NAMESPACE,
            SECRET,
        );
        assert_eq!(verdict, Verdict::Rejected(RejectReason::ExpiredToken));
    }

    #[test]
    fn test_skew_tolerance_widens_expiry_only() {
        let fields = sealed_fields(DigestScheme::HmacSha256);
        let lenient = TokenValidator::new(DigestScheme::HmacSha256, 5);

        let inside = expiry() + Duration::seconds(5);
        assert!(lenient
            .validate(&fields, "203.0.113.5", inside, NAMESPACE, SECRET)
            .is_accepted());

        let outside = expiry() + Duration::seconds(6);
        assert_eq!(
            lenient.validate(&fields, "203.0.113.5", outside, NAMESPACE, SECRET),
            Verdict::Rejected(RejectReason::ExpiredToken)
        );
    }

    #[test]
    fn test_rejects_wrong_address() {
        let fields = sealed_fields(DigestScheme::HmacSha256);
        let now = expiry() - Duration::seconds(10);
        let verdict = validator(DigestScheme::HmacSha256).validate(
            &fields,
            "203.0.113.6",
            now,
            NAMESPACE,
            SECRET,
        );
        assert_eq!(verdict, Verdict::Rejected(RejectReason::AddressMismatch));
    }

    #[test]
    fn test_rejects_wrong_secret_as_digest_mismatch() {
        let fields = sealed_fields(DigestScheme::HmacSha256);
        let now = expiry() - Duration::seconds(10);
        let verdict = validator(DigestScheme::HmacSha256).validate(
            &fields,
            "203.0.113.5",
            now,
            NAMESPACE,
            "0123456789abcdef0123456789abcdef",
        );
        assert_eq!(verdict, Verdict::Rejected(RejectReason::DigestMismatch));
    }

    #[test]
    fn test_digest_check_runs_first() {
        // Wrong secret, wrong address, and expired: the seal verdict
        // must win so decoy fields never shape the outcome.
        let fields = sealed_fields(DigestScheme::HmacSha256);
        let now = expiry() + Duration::days(400);
        let verdict = validator(DigestScheme::HmacSha256).validate(
            &fields,
            "198.51.100.99",
            now,
            NAMESPACE,
            "0123456789abcdef0123456789abcdef",
        );
        assert_eq!(verdict, Verdict::Rejected(RejectReason::DigestMismatch));
    }

    #[test]
    fn test_address_check_runs_before_expiry() {
        let fields = sealed_fields(DigestScheme::HmacSha256);
        let now = expiry() + Duration::days(400);
        let verdict = validator(DigestScheme::HmacSha256).validate(
            &fields,
            "198.51.100.99",
            now,
            NAMESPACE,
            SECRET,
        );
        assert_eq!(verdict, Verdict::Rejected(RejectReason::AddressMismatch));
    }

    #[test]
    fn test_accepts_uppercased_digest_field() {
        let mut fields = sealed_fields(DigestScheme::LegacyMd5);
        fields.digest = fields.digest.to_uppercase();
        let now = expiry() - Duration::seconds(10);
        let verdict = validator(DigestScheme::LegacyMd5).validate(
            &fields,
            "203.0.113.5",
            now,
            NAMESPACE,
            SECRET,
        );
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_mutated_subject_breaks_the_seal() {
        let mut fields = sealed_fields(DigestScheme::HmacSha256);
        fields.subject = "trey".to_string();
        let now = expiry() - Duration::seconds(10);
        let verdict = validator(DigestScheme::HmacSha256).validate(
            &fields,
            "203.0.113.5",
            now,
            NAMESPACE,
            SECRET,
        );
        assert_eq!(verdict, Verdict::Rejected(RejectReason::DigestMismatch));
    }

    #[test]
    fn test_reject_reason_names_are_stable() {
        assert_eq!(RejectReason::DigestMismatch.as_str(), "digest_mismatch");
        assert_eq!(RejectReason::AddressMismatch.as_str(), "address_mismatch");
        assert_eq!(RejectReason::ExpiredToken.as_str(), "expired_token");
    }
}
