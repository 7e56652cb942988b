//! Configuration settings for tollgate.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::GateError;
use crate::token::DigestScheme;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cookie: CookieSection,
    #[serde(default)]
    pub token: TokenSection,
    pub secrets: SecretsSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub audit: AuditSection,
}

/// Cookie transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieSection {
    /// Cookie name. Doubles as the namespace label sealed into every
    /// digest, so tokens cannot be replayed across cookie names.
    pub name: String,
    /// `Path=` attribute for minted cookies.
    pub path: Option<String>,
    /// `Domain=` attribute for minted cookies.
    pub domain: Option<String>,
    /// Emit the `Secure` flag.
    #[serde(default)]
    pub secure: bool,
    /// Emit the `HttpOnly` flag.
    #[serde(default = "default_http_only")]
    pub http_only: bool,
}

/// Token lifetime and validation policy.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSection {
    /// Token lifetime: seconds, or `"session"` for a browser-session
    /// cookie backed by a long-lived token.
    #[serde(default = "default_ttl")]
    pub ttl: TtlSetting,
    /// Sealing scheme ("hmac-sha256" or "legacy-md5").
    #[serde(default = "default_digest_scheme")]
    pub digest_scheme: String,
    /// Extra seconds of validity granted past expiry, to absorb clock
    /// drift between issuer and validator.
    #[serde(default)]
    pub skew_tolerance_seconds: u64,
    /// Re-mint the cookie on every accepted request, sliding the
    /// expiry window forward.
    #[serde(default)]
    pub refresh_on_success: bool,
    /// Whether a denial is final or other authentication may still
    /// run. Off by default, so the gate declines quietly alongside
    /// other providers until made the sole authority.
    #[serde(default)]
    pub authoritative: bool,
    /// Send a clearing Set-Cookie when a presented token is rejected
    /// or malformed.
    #[serde(default)]
    pub expire_invalid: bool,
}

/// Shared-secret configuration. Exactly one of `secret` and
/// `secret_path` must be set; the `previous_*` pair is optional and
/// lets validation retry tokens sealed under the prior generation.
/// Debug output masks the inline values.
#[derive(Clone, Default, Deserialize)]
pub struct SecretsSection {
    pub secret: Option<String>,
    pub secret_path: Option<PathBuf>,
    pub previous_secret: Option<String>,
    pub previous_secret_path: Option<PathBuf>,
}

impl fmt::Debug for SecretsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsSection")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_path", &self.secret_path)
            .field(
                "previous_secret",
                &self.previous_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("previous_secret_path", &self.previous_secret_path)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditSection {
    /// Whether audit logging is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

/// Raw `ttl` value as configured.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TtlSetting {
    Seconds(u64),
    Named(String),
}

impl TtlSetting {
    /// Resolve the configured value, `None` when unrecognized.
    pub fn resolve(&self) -> Option<TokenTtl> {
        match self {
            TtlSetting::Seconds(n) => Some(TokenTtl::Seconds(*n)),
            TtlSetting::Named(name) if name == "session" => Some(TokenTtl::Session),
            TtlSetting::Named(_) => None,
        }
    }
}

/// Resolved token lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTtl {
    /// Session cookie in the agent, long-lived token on the wire.
    Session,
    /// Fixed lifetime in seconds.
    Seconds(u64),
}

/// Secrets after file indirection is resolved. Debug output masks
/// the values.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub current: String,
    pub previous: Option<String>,
}

impl fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("current", &"<redacted>")
            .field("previous", &self.previous.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// Default value functions
fn default_http_only() -> bool {
    true
}

fn default_ttl() -> TtlSetting {
    TtlSetting::Seconds(300)
}

fn default_digest_scheme() -> String {
    "hmac-sha256".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/tollgate/audit.log")
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            digest_scheme: default_digest_scheme(),
            skew_tolerance_seconds: 0,
            refresh_on_success: false,
            authoritative: false,
            expire_invalid: false,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GateError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| GateError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), GateError> {
        // Validate the cookie name: it travels in headers and doubles
        // as the digest namespace
        if self.cookie.name.is_empty() {
            return Err(GateError::Config {
                message: "Cookie name must not be empty".to_string(),
            });
        }
        if !self
            .cookie
            .name
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, ';' | ',' | '='))
        {
            return Err(GateError::Config {
                message: format!(
                    "Invalid cookie name '{}'. Must be printable ASCII without ';', ',' or '='",
                    self.cookie.name
                ),
            });
        }

        // Validate the ttl
        match self.token.ttl.resolve() {
            None => {
                return Err(GateError::Config {
                    message: format!(
                        "Invalid ttl '{:?}'. Use a number of seconds or \"session\"",
                        self.token.ttl
                    ),
                });
            }
            Some(TokenTtl::Seconds(0)) => {
                return Err(GateError::Config {
                    message: "ttl must be at least 1 second".to_string(),
                });
            }
            // Session tokens already get ten years; a fixed ttl past
            // that is a misconfiguration
            Some(TokenTtl::Seconds(n)) if n > 315_360_000 => {
                return Err(GateError::Config {
                    message: format!("ttl {n} exceeds the maximum of 315360000 seconds"),
                });
            }
            Some(_) => {}
        }

        // Validate the digest scheme
        if DigestScheme::parse_name(&self.token.digest_scheme).is_none() {
            return Err(GateError::Config {
                message: format!(
                    "Invalid digest scheme '{}'. Valid schemes: \"hmac-sha256\", \"legacy-md5\"",
                    self.token.digest_scheme
                ),
            });
        }

        // Keep skew tolerance within a sane bound
        if self.token.skew_tolerance_seconds > 86_400 {
            return Err(GateError::Config {
                message: format!(
                    "skew_tolerance_seconds {} exceeds the maximum of 86400",
                    self.token.skew_tolerance_seconds
                ),
            });
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        // Validate secret source shape; contents are checked when the
        // secrets are resolved
        if self.secrets.secret.is_some() && self.secrets.secret_path.is_some() {
            return Err(GateError::Config {
                message: "Set either [secrets] secret or secret_path, not both".to_string(),
            });
        }
        if self.secrets.secret.is_none() && self.secrets.secret_path.is_none() {
            return Err(GateError::Config {
                message: "[secrets] needs either 'secret' or 'secret_path'".to_string(),
            });
        }
        if self.secrets.previous_secret.is_some() && self.secrets.previous_secret_path.is_some() {
            return Err(GateError::Config {
                message: "Set either [secrets] previous_secret or previous_secret_path, not both"
                    .to_string(),
            });
        }

        Ok(())
    }
}

impl SecretsSection {
    /// Resolve inline values and file indirections into usable
    /// secrets, enforcing the length rules of the given scheme.
    pub fn resolve(&self, scheme: DigestScheme) -> Result<ResolvedSecrets, GateError> {
        let current = materialize("secret", self.secret.as_deref(), self.secret_path.as_deref())?
            .ok_or_else(|| GateError::Config {
                message: "[secrets] needs either 'secret' or 'secret_path'".to_string(),
            })?;
        check_secret(scheme, "secret", &current)?;

        let previous = materialize(
            "previous_secret",
            self.previous_secret.as_deref(),
            self.previous_secret_path.as_deref(),
        )?;
        if let Some(previous) = &previous {
            check_secret(scheme, "previous_secret", previous)?;
        }

        Ok(ResolvedSecrets { current, previous })
    }
}

fn materialize(
    label: &str,
    inline: Option<&str>,
    path: Option<&Path>,
) -> Result<Option<String>, GateError> {
    match (inline, path) {
        (Some(_), Some(_)) => Err(GateError::Config {
            message: format!("Set either [secrets] {label} or {label}_path, not both"),
        }),
        (Some(value), None) => Ok(Some(value.to_string())),
        (None, Some(path)) => read_secret_file(label, path).map(Some),
        (None, None) => Ok(None),
    }
}

/// Read a secret from a file.
///
/// The file must not be readable by group or world; a trailing
/// newline, as left by most editors, is stripped.
fn read_secret_file(label: &str, path: &Path) -> Result<String, GateError> {
    let metadata = std::fs::metadata(path).map_err(|e| GateError::Config {
        message: format!(
            "Failed to read {label} file metadata from {}: {}",
            path.display(),
            e
        ),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(GateError::Config {
                message: format!(
                    "{label} file {} has insecure permissions {:04o}, expected 0600 or 0400",
                    path.display(),
                    mode & 0o777
                ),
            });
        }
    }
    #[cfg(not(unix))]
    let _ = &metadata;

    let content = std::fs::read_to_string(path).map_err(|e| GateError::Config {
        message: format!("Failed to read {label} from {}: {}", path.display(), e),
    })?;
    let secret = content.trim_end_matches(['\r', '\n']);
    if secret.is_empty() {
        return Err(GateError::Config {
            message: format!("{label} file {} is empty", path.display()),
        });
    }
    Ok(secret.to_string())
}

fn check_secret(scheme: DigestScheme, label: &str, value: &str) -> Result<(), GateError> {
    match scheme {
        // Deployed legacy issuers all use 32-character secrets;
        // anything else is a typo'd or truncated copy
        DigestScheme::LegacyMd5 => {
            if value.len() != 32 {
                return Err(GateError::Config {
                    message: format!(
                        "{label} must be exactly 32 characters for legacy-md5, got {}",
                        value.len()
                    ),
                });
            }
        }
        DigestScheme::HmacSha256 => {
            if value.len() < 16 {
                return Err(GateError::Config {
                    message: format!(
                        "{label} must be at least 16 bytes for hmac-sha256, got {}",
                        value.len()
                    ),
                });
            }
        }
    }
    Ok(())
}
