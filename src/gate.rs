//! The authentication gate: cookie transport over the token core.
//!
//! `AuthGate` owns the configured policy and the moving parts (codec,
//! validator, clock, nonce source, audit trail) and turns a request's
//! Cookie header into a grant or a denial, minting and refreshing
//! tokens along the way.

use std::net::IpAddr;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::audit::{AuditEntry, AuditLogger};
use crate::clock::{Clock, SystemClock};
use crate::config::{Settings, TokenTtl};
use crate::cookie::{CookieAttributes, CookieLifetime, clear_cookie, find_cookie, set_cookie};
use crate::error::{GateError, GateResult, MalformedErrorKind};
use crate::nonce::{NonceSource, SystemNonce};
use crate::token::{
    DigestScheme, RejectReason, TokenCodec, TokenFields, TokenValidator, Verdict, format_stamp,
};

/// Wire lifetime of a token backing a session cookie. The cookie dies
/// with the browser session; the token inside must outlive any
/// realistic one.
const SESSION_TOKEN_DAYS: i64 = 3653;

/// A freshly minted token and the Set-Cookie that installs it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The raw token string.
    pub token: String,
    /// Set-Cookie header value carrying the token.
    pub set_cookie: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of authenticating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request carries a valid token.
    Granted {
        /// The authenticated subject.
        subject: String,
        /// Replacement Set-Cookie when refresh-on-success is
        /// configured.
        refresh_cookie: Option<String>,
    },
    /// The request carries no usable token.
    Denied {
        cause: DenyCause,
        /// Whether this denial is final or other authentication may
        /// still run.
        authoritative: bool,
        /// Set-Cookie that removes the offending cookie, when
        /// expire-invalid is configured.
        clear_cookie: Option<String>,
    },
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted { .. })
    }

    /// The authenticated subject, when granted.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Decision::Granted { subject, .. } => Some(subject),
            Decision::Denied { .. } => None,
        }
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyCause {
    /// No cookie of the configured name was presented.
    NoCookie,
    /// A cookie was presented but its value is not a token.
    Malformed(MalformedErrorKind),
    /// A well-formed token failed validation.
    Rejected(RejectReason),
}

impl DenyCause {
    /// Stable snake_case name, used in logs and audit records.
    pub fn reason_name(&self) -> &'static str {
        match self {
            DenyCause::NoCookie => "no_cookie",
            DenyCause::Malformed(_) => "malformed_token",
            DenyCause::Rejected(reason) => reason.as_str(),
        }
    }
}

/// The gate. Built once from settings, then shared freely; every
/// method takes `&self` and the core does no I/O besides the optional
/// audit trail.
pub struct AuthGate {
    cookie_name: String,
    attributes: CookieAttributes,
    ttl: TokenTtl,
    refresh_on_success: bool,
    authoritative: bool,
    expire_invalid: bool,
    codec: TokenCodec,
    validator: TokenValidator,
    secret: String,
    previous_secret: Option<String>,
    clock: Box<dyn Clock>,
    nonces: Box<dyn NonceSource>,
    audit: Option<AuditLogger>,
}

impl AuthGate {
    /// Build a gate from settings with the system clock and RNG.
    pub fn from_settings(settings: &Settings) -> GateResult<Self> {
        Self::with_capabilities(settings, Box::new(SystemClock), Box::new(SystemNonce))
    }

    /// Build a gate with explicit time and nonce sources, for tests
    /// and for replaying decisions at a chosen moment.
    pub fn with_capabilities(
        settings: &Settings,
        clock: Box<dyn Clock>,
        nonces: Box<dyn NonceSource>,
    ) -> GateResult<Self> {
        settings.validate()?;

        let scheme =
            DigestScheme::parse_name(&settings.token.digest_scheme).ok_or_else(|| {
                GateError::Config {
                    message: format!(
                        "Invalid digest scheme '{}'",
                        settings.token.digest_scheme
                    ),
                }
            })?;
        let ttl = settings.token.ttl.resolve().ok_or_else(|| GateError::Config {
            message: format!("Invalid ttl '{:?}'", settings.token.ttl),
        })?;
        let secrets = settings.secrets.resolve(scheme)?;
        let audit = if settings.audit.enabled {
            Some(AuditLogger::new(&settings.audit.log_path)?)
        } else {
            None
        };

        Ok(Self {
            cookie_name: settings.cookie.name.clone(),
            attributes: CookieAttributes {
                path: settings.cookie.path.clone(),
                domain: settings.cookie.domain.clone(),
                secure: settings.cookie.secure,
                http_only: settings.cookie.http_only,
            },
            ttl,
            refresh_on_success: settings.token.refresh_on_success,
            authoritative: settings.token.authoritative,
            expire_invalid: settings.token.expire_invalid,
            codec: TokenCodec::new(scheme),
            validator: TokenValidator::new(scheme, settings.token.skew_tolerance_seconds),
            secret: secrets.current,
            previous_secret: secrets.previous,
            clock,
            nonces,
            audit,
        })
    }

    /// The configured cookie name, which is also the digest namespace.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Mint a token for `subject` bound to `client_address` and build
    /// the Set-Cookie that installs it.
    pub fn issue(&self, subject: &str, client_address: &str) -> GateResult<IssuedToken> {
        let address = canonical_address(client_address);
        let now = self.clock.now();
        let (expires_at, lifetime) = match self.ttl {
            TokenTtl::Seconds(ttl) => {
                let at = now + Duration::seconds(ttl as i64);
                (at, CookieLifetime::Until(at))
            }
            TokenTtl::Session => (
                now + Duration::days(SESSION_TOKEN_DAYS),
                CookieLifetime::Session,
            ),
        };

        let fields = TokenFields::new(subject, address.as_str(), expires_at, self.nonces.next_nonce());
        let token = self.codec.encode(&fields, &self.cookie_name, &self.secret)?;
        let minted = self.codec.parse(&token)?;
        let set_cookie = set_cookie(&self.cookie_name, &token, lifetime, &self.attributes);

        info!(
            subject = %subject,
            address = %address,
            expires_at = %format_stamp(expires_at),
            "Token issued"
        );
        if let Some(audit) = &self.audit {
            let entry = AuditEntry::issued(
                &self.cookie_name,
                subject,
                &address,
                &format_stamp(expires_at),
                minted.digest_prefix(),
            );
            if let Err(e) = audit.log(&entry) {
                warn!(error = %e, "Failed to write audit record");
            }
        }

        Ok(IssuedToken {
            token,
            set_cookie,
            expires_at,
        })
    }

    /// Decide a request from its Cookie header and observed address.
    ///
    /// `cookie_header` is the raw value of the `Cookie` request
    /// header, if the request had one.
    pub fn authenticate(&self, cookie_header: Option<&str>, observed_address: &str) -> Decision {
        let raw = cookie_header.and_then(|header| find_cookie(header, &self.cookie_name));
        let Some(raw) = raw else {
            debug!(cookie = %self.cookie_name, "No token cookie presented");
            return Decision::Denied {
                cause: DenyCause::NoCookie,
                authoritative: self.authoritative,
                clear_cookie: None,
            };
        };
        self.check_token(&raw, observed_address)
    }

    /// Decide a bare token, outside any Cookie header. Useful where
    /// the surrounding framework already extracts cookie values.
    pub fn check_token(&self, token: &str, observed_address: &str) -> Decision {
        let observed = canonical_address(observed_address);

        let fields = match self.codec.parse_fields(token) {
            Ok(fields) => fields,
            Err(kind) => {
                warn!(address = %observed, error = %kind, "Malformed token presented");
                self.audit_denied(&observed, "malformed_token", None, None, None);
                return self.denied(DenyCause::Malformed(kind));
            }
        };

        let now = self.clock.now();
        let mut verdict =
            self.validator
                .validate(&fields, &observed, now, &self.cookie_name, &self.secret);
        // A digest minted under the previous secret generation is
        // still honored until rotation completes.
        if let (Verdict::Rejected(RejectReason::DigestMismatch), Some(previous)) =
            (&verdict, &self.previous_secret)
        {
            verdict = self
                .validator
                .validate(&fields, &observed, now, &self.cookie_name, previous);
        }

        match verdict {
            Verdict::Accepted(subject) => self.grant(subject, &fields, &observed),
            Verdict::Rejected(reason) => self.reject(reason, &fields, &observed),
        }
    }

    /// Value for an `Authorization: Basic` header asserting `subject`
    /// with an empty password, for backends that only speak Basic.
    pub fn basic_authorization(subject: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{subject}:")))
    }

    fn grant(&self, subject: String, fields: &TokenFields, observed: &str) -> Decision {
        let refresh_cookie = if self.refresh_on_success {
            // Refreshes are sealed under the current secret, so a
            // rotation heals live sessions as they come through.
            match self.issue(&subject, &fields.client_address) {
                Ok(issued) => Some(issued.set_cookie),
                Err(e) => {
                    warn!(error = %e, subject = %subject, "Failed to refresh token");
                    None
                }
            }
        } else {
            None
        };

        info!(
            subject = %subject,
            address = %observed,
            digest_prefix = %fields.digest_prefix(),
            refreshed = refresh_cookie.is_some(),
            "Token accepted"
        );
        if let Some(audit) = &self.audit {
            let entry = AuditEntry::granted(
                &self.cookie_name,
                &subject,
                observed,
                fields.digest_prefix(),
                refresh_cookie.is_some(),
            );
            if let Err(e) = audit.log(&entry) {
                warn!(error = %e, "Failed to write audit record");
            }
        }

        Decision::Granted {
            subject,
            refresh_cookie,
        }
    }

    fn reject(&self, reason: RejectReason, fields: &TokenFields, observed: &str) -> Decision {
        warn!(
            address = %observed,
            subject = %fields.subject,
            reason = %reason,
            digest_prefix = %fields.digest_prefix(),
            "Token rejected"
        );
        self.audit_denied(
            observed,
            reason.as_str(),
            Some(&fields.subject),
            Some(&fields.client_address),
            Some(fields.digest_prefix()),
        );
        self.denied(DenyCause::Rejected(reason))
    }

    fn denied(&self, cause: DenyCause) -> Decision {
        let clear_cookie = if self.expire_invalid {
            Some(clear_cookie(&self.cookie_name, &self.attributes))
        } else {
            None
        };
        Decision::Denied {
            cause,
            authoritative: self.authoritative,
            clear_cookie,
        }
    }

    fn audit_denied(
        &self,
        address: &str,
        reason: &str,
        subject: Option<&str>,
        token_address: Option<&str>,
        digest_prefix: Option<&str>,
    ) {
        if let Some(audit) = &self.audit {
            let entry = AuditEntry::denied(
                &self.cookie_name,
                address,
                reason,
                subject,
                token_address,
                digest_prefix,
            );
            if let Err(e) = audit.log(&entry) {
                warn!(error = %e, "Failed to write audit record");
            }
        }
    }
}

/// Canonical textual form of an address: IP literals round-trip
/// through the parser so equivalent spellings compare equal; anything
/// else passes through untouched.
fn canonical_address(address: &str) -> String {
    match address.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::{
        AuditSection, CookieSection, LoggingSection, SecretsSection, TokenSection, TtlSetting,
    };
    use crate::nonce::SequenceNonce;
    use chrono::TimeZone;

    const SECRET: &str = "b8fe1a14004fde480179819713badeca";

    fn test_settings() -> Settings {
        Settings {
            cookie: CookieSection {
                name: "gate".to_string(),
                path: Some("/".to_string()),
                domain: None,
                secure: false,
                http_only: true,
            },
            token: TokenSection::default(),
            secrets: SecretsSection {
                secret: Some(SECRET.to_string()),
                ..Default::default()
            },
            logging: LoggingSection::default(),
            audit: AuditSection::default(),
        }
    }

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn test_gate(settings: &Settings, now: DateTime<Utc>) -> AuthGate {
        AuthGate::with_capabilities(
            settings,
            Box::new(FixedClock::new(now)),
            Box::new(SequenceNonce::new(700)),
        )
        .unwrap()
    }

    /// The Cookie header a browser would send back after receiving
    /// the given Set-Cookie.
    fn echo(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn test_issue_then_authenticate_grants() {
        let settings = test_settings();
        let gate = test_gate(&settings, test_now());

        let issued = gate.issue("frey", "203.0.113.5").unwrap();
        assert_eq!(issued.expires_at, test_now() + Duration::seconds(300));

        let decision = gate.authenticate(Some(&echo(&issued.set_cookie)), "203.0.113.5");
        assert_eq!(decision.subject(), Some("frey"));
    }

    #[test]
    fn test_no_cookie_is_denied_without_clearing() {
        let settings = test_settings();
        let gate = test_gate(&settings, test_now());

        let decision = gate.authenticate(None, "203.0.113.5");
        assert_eq!(
            decision,
            Decision::Denied {
                cause: DenyCause::NoCookie,
                authoritative: false,
                clear_cookie: None,
            }
        );

        let decision = gate.authenticate(Some("theme=dark"), "203.0.113.5");
        assert!(matches!(
            decision,
            Decision::Denied {
                cause: DenyCause::NoCookie,
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_cookie_is_malformed_and_cleared_when_configured() {
        let mut settings = test_settings();
        settings.token.expire_invalid = true;
        let gate = test_gate(&settings, test_now());

        let decision = gate.authenticate(Some("gate=not-a-token"), "203.0.113.5");
        match decision {
            Decision::Denied {
                cause: DenyCause::Malformed(_),
                clear_cookie: Some(clear),
                ..
            } => {
                assert!(clear.starts_with("gate=; Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn test_moved_client_is_denied() {
        let settings = test_settings();
        let gate = test_gate(&settings, test_now());

        let issued = gate.issue("frey", "203.0.113.5").unwrap();
        let decision = gate.authenticate(Some(&echo(&issued.set_cookie)), "203.0.113.6");
        assert!(matches!(
            decision,
            Decision::Denied {
                cause: DenyCause::Rejected(RejectReason::AddressMismatch),
                ..
            }
        ));
    }

    #[test]
    fn test_rotation_honors_previous_secret() {
        let old = test_settings();
        let old_gate = test_gate(&old, test_now());
        let issued = old_gate.issue("frey", "203.0.113.5").unwrap();
        let header = echo(&issued.set_cookie);

        let mut rotated = test_settings();
        rotated.secrets.secret = Some("0123456789abcdef0123456789abcdef".to_string());
        rotated.secrets.previous_secret = Some(SECRET.to_string());
        let rotated_gate = test_gate(&rotated, test_now());
        assert!(rotated_gate.authenticate(Some(&header), "203.0.113.5").is_granted());

        let mut completed = test_settings();
        completed.secrets.secret = Some("0123456789abcdef0123456789abcdef".to_string());
        let completed_gate = test_gate(&completed, test_now());
        assert!(matches!(
            completed_gate.authenticate(Some(&header), "203.0.113.5"),
            Decision::Denied {
                cause: DenyCause::Rejected(RejectReason::DigestMismatch),
                ..
            }
        ));
    }

    #[test]
    fn test_refresh_reseals_under_current_secret() {
        let mut settings = test_settings();
        settings.token.refresh_on_success = true;
        settings.secrets.secret = Some("0123456789abcdef0123456789abcdef".to_string());
        settings.secrets.previous_secret = Some(SECRET.to_string());
        let gate = test_gate(&settings, test_now());

        // A token still sealed under the previous secret comes in.
        let mut old_issuer = test_settings();
        old_issuer.secrets.secret = Some(SECRET.to_string());
        let old_gate = test_gate(&old_issuer, test_now());
        let issued = old_gate.issue("frey", "203.0.113.5").unwrap();

        let decision = gate.authenticate(Some(&echo(&issued.set_cookie)), "203.0.113.5");
        let Decision::Granted {
            refresh_cookie: Some(refreshed),
            ..
        } = decision
        else {
            panic!("expected a refreshed grant");
        };

        // The refreshed cookie must validate without the previous
        // secret.
        let mut completed = test_settings();
        completed.secrets.secret = Some("0123456789abcdef0123456789abcdef".to_string());
        let completed_gate = test_gate(&completed, test_now());
        assert!(completed_gate
            .authenticate(Some(&echo(&refreshed)), "203.0.113.5")
            .is_granted());
    }

    #[test]
    fn test_session_ttl_mints_session_cookie() {
        let mut settings = test_settings();
        settings.token.ttl = TtlSetting::Named("session".to_string());
        let gate = test_gate(&settings, test_now());

        let issued = gate.issue("frey", "203.0.113.5").unwrap();
        assert!(!issued.set_cookie.contains("Expires="));
        assert_eq!(
            issued.expires_at,
            test_now() + Duration::days(SESSION_TOKEN_DAYS)
        );
    }

    #[test]
    fn test_ipv6_spellings_meet_in_canonical_form() {
        let settings = test_settings();
        let gate = test_gate(&settings, test_now());

        let issued = gate.issue("frey", "2001:DB8::1").unwrap();
        assert!(issued.token.contains(",2001:db8::1,"));

        let decision =
            gate.authenticate(Some(&echo(&issued.set_cookie)), "2001:0db8:0000::0001");
        assert!(decision.is_granted());
    }

    #[test]
    fn test_non_ip_addresses_pass_through() {
        assert_eq!(canonical_address("gateway-7"), "gateway-7");
        assert_eq!(canonical_address("203.0.113.5"), "203.0.113.5");
        assert_eq!(canonical_address("2001:DB8::1"), "2001:db8::1");
    }

    #[test]
    fn test_basic_authorization_value() {
        assert_eq!(AuthGate::basic_authorization("frey"), "Basic ZnJleTo=");
    }

    #[test]
    fn test_tampered_subject_is_a_digest_mismatch() {
        let settings = test_settings();
        let gate = test_gate(&settings, test_now());

        let issued = gate.issue("frey", "203.0.113.5").unwrap();
        let tampered = issued.token.replacen("frey", "root", 1);
        let decision = gate.check_token(&tampered, "203.0.113.5");
        assert!(matches!(
            decision,
            Decision::Denied {
                cause: DenyCause::Rejected(RejectReason::DigestMismatch),
                ..
            }
        ));
    }
}
