//! JWT (JSON Web Token) generation for GitHub App authentication.
//!
//! This module signs the app tokens GitHub uses to authenticate a GitHub App.
//! App tokens are used directly as bearer credentials for app-level endpoints
//! and to exchange for installation tokens.
//!
//! # GitHub Requirements
//!
//! - JWTs must use RS256 algorithm (RSA Signature with SHA-256)
//! - Maximum expiration time is 10 minutes from issuance
//! - Claims must include `iss` (app ID), `iat` (issued at), and `exp` (expiration)

use crate::auth::{GitHubAppId, JsonWebToken, JwtClaims, KeyAlgorithm, Liveness, PrivateKey};
use crate::error::SigningError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use tracing::{debug, warn};

/// Source of the current time for `iat` and `exp` claims.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant, for deterministic claims.
///
/// # Examples
///
/// ```
/// use github_app_token::auth::{Clock, FixedClock};
/// use chrono::{TimeZone, Utc};
///
/// let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let clock = FixedClock::new(instant);
/// assert_eq!(clock.now(), instant);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Create a clock that always reports `instant`.
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Interface for JWT token generation and signing.
///
/// This trait abstracts JWT generation to allow for different implementations
/// (production RSA signing, mock generators for testing, etc.).
#[async_trait::async_trait]
pub trait JwtGenerator: Send + Sync {
    /// Generate a JWT token for GitHub App authentication.
    ///
    /// Creates a JWT with the following claims and nothing else:
    /// - `iss`: GitHub App ID as a decimal string
    /// - `iat`: Current timestamp (issued at)
    /// - `exp`: Expiration timestamp (issued at + liveness)
    ///
    /// # Errors
    ///
    /// Returns `SigningError::InvalidKey` if the key cannot be loaded for
    /// signing, and `SigningError::EncodingFailed` if signing itself fails.
    async fn generate_jwt(&self, app_id: GitHubAppId) -> Result<JsonWebToken, SigningError>;

    /// Get the liveness window configured for this generator.
    fn liveness(&self) -> Liveness;
}

/// RS256 JWT generator using RSA private keys.
///
/// This is the standard implementation for GitHub App authentication. It uses
/// RSA-SHA256 signing as required by GitHub's API.
///
/// # Examples
///
/// ```no_run
/// # use github_app_token::auth::{Liveness, PrivateKey, RS256JwtGenerator};
/// # let key_pem = std::fs::read("app.pem").unwrap();
/// let private_key = PrivateKey::from_pem(&key_pem).unwrap();
/// let generator = RS256JwtGenerator::new(private_key, Liveness::default());
/// ```
pub struct RS256JwtGenerator<C: Clock = SystemClock> {
    private_key: PrivateKey,
    liveness: Liveness,
    clock: C,
}

impl RS256JwtGenerator<SystemClock> {
    /// Create a generator that stamps tokens with the wall clock.
    pub fn new(private_key: PrivateKey, liveness: Liveness) -> Self {
        Self::with_clock(private_key, liveness, SystemClock)
    }
}

impl<C: Clock> RS256JwtGenerator<C> {
    /// Create a generator with an explicit time source.
    pub fn with_clock(private_key: PrivateKey, liveness: Liveness, clock: C) -> Self {
        Self {
            private_key,
            liveness,
            clock,
        }
    }

    /// Build JWT claims for the given app ID at the given instant.
    pub fn build_claims(&self, app_id: GitHubAppId, now: DateTime<Utc>) -> JwtClaims {
        let iat = now.timestamp();
        JwtClaims {
            iss: app_id.to_string(),
            iat,
            exp: iat + self.liveness.as_seconds(),
        }
    }
}

#[async_trait::async_trait]
impl<C: Clock> JwtGenerator for RS256JwtGenerator<C> {
    async fn generate_jwt(&self, app_id: GitHubAppId) -> Result<JsonWebToken, SigningError> {
        if self.liveness.exceeds_github_maximum() {
            warn!(
                liveness = %self.liveness,
                "Liveness exceeds GitHub's 10 minute maximum; GitHub will reject this token"
            );
        }

        let claims = self.build_claims(app_id, self.clock.now());

        let encoding_key = EncodingKey::from_rsa_pem(self.private_key.key_data()).map_err(|e| {
            SigningError::InvalidKey {
                message: format!("Failed to create encoding key: {}", e),
            }
        })?;

        let header = Header::new(Algorithm::RS256);

        let token_string =
            encode(&header, &claims, &encoding_key).map_err(|e| SigningError::EncodingFailed {
                message: format!("Failed to encode JWT: {}", e),
            })?;

        let issued_at = timestamp_to_datetime(claims.iat)?;
        let expires_at = timestamp_to_datetime(claims.exp)?;

        debug!(
            app_id = %app_id,
            iat = claims.iat,
            exp = claims.exp,
            "Signed app token"
        );

        Ok(JsonWebToken::new(token_string, app_id, issued_at, expires_at))
    }

    fn liveness(&self) -> Liveness {
        self.liveness
    }
}

fn timestamp_to_datetime(timestamp: i64) -> Result<DateTime<Utc>, SigningError> {
    DateTime::from_timestamp(timestamp, 0).ok_or_else(|| SigningError::EncodingFailed {
        message: format!("timestamp {} is out of range", timestamp),
    })
}

impl PrivateKey {
    /// Create a private key from PEM-encoded bytes.
    ///
    /// Both PKCS#1 (`BEGIN RSA PRIVATE KEY`) and PKCS#8 (`BEGIN PRIVATE KEY`)
    /// encodings are accepted.
    ///
    /// # Errors
    ///
    /// Returns `SigningError::InvalidKey` if:
    /// - The bytes are not UTF-8 PEM text
    /// - PEM markers are missing
    /// - The key is not an RSA private key or is corrupted
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use github_app_token::auth::PrivateKey;
    /// let pem = std::fs::read("app.pem").unwrap();
    /// let key = PrivateKey::from_pem(&pem).expect("Invalid PEM");
    /// ```
    pub fn from_pem(pem: &[u8]) -> Result<Self, SigningError> {
        let pem = std::str::from_utf8(pem)
            .map_err(|_| SigningError::InvalidKey {
                message: "PEM data is not valid UTF-8".to_string(),
            })?
            .trim();

        if pem.is_empty() {
            return Err(SigningError::InvalidKey {
                message: "PEM data cannot be empty".to_string(),
            });
        }

        if !pem.contains("-----BEGIN") || !pem.contains("-----END") {
            return Err(SigningError::InvalidKey {
                message: "Invalid PEM format: missing BEGIN/END markers".to_string(),
            });
        }

        // PKCS#1 first since that is what GitHub hands out.
        if let Err(pkcs1_error) = RsaPrivateKey::from_pkcs1_pem(pem) {
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|pkcs8_error| SigningError::InvalidKey {
                message: format!(
                    "Failed to parse RSA private key (PKCS#1: {}; PKCS#8: {})",
                    pkcs1_error, pkcs8_error
                ),
            })?;
        }

        Ok(Self {
            key_data: pem.as_bytes().to_vec(),
            algorithm: KeyAlgorithm::RS256,
        })
    }
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
