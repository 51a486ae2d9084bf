//! GitHub App authentication types.
//!
//! This module provides the core types for GitHub App authentication:
//! - ID types (GitHubAppId, InstallationId)
//! - Token types (JsonWebToken, InstallationToken)
//! - Key material and JWT claims
//! - Installation metadata returned by the GitHub API
//!
//! Signing lives in [`jwt`], token lifetimes in [`liveness`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ValidationError;

pub mod jwt;
pub mod liveness;

pub use jwt::{Clock, FixedClock, JwtGenerator, RS256JwtGenerator, SystemClock};
pub use liveness::Liveness;

// ============================================================================
// Core ID Types
// ============================================================================

/// GitHub App identifier assigned during app registration.
///
/// This is a globally unique identifier for your GitHub App, found in the
/// app settings page. It becomes the `iss` claim of every app token.
///
/// # Examples
///
/// ```
/// use github_app_token::auth::GitHubAppId;
///
/// let app_id = GitHubAppId::new(123456);
/// assert_eq!(app_id.as_u64(), 123456);
/// assert_eq!(app_id.to_string(), "123456");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitHubAppId(u64);

impl GitHubAppId {
    /// Create a new GitHub App ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GitHubAppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GitHubAppId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "github_app_id".to_string(),
                message: "must be a positive integer".to_string(),
            })?;
        Ok(Self::new(id))
    }
}

/// GitHub App installation identifier.
///
/// When a GitHub App is installed on an organization or user account, GitHub
/// assigns an installation ID. Installation tokens are minted per installation.
///
/// # Examples
///
/// ```
/// use github_app_token::auth::InstallationId;
///
/// let installation = InstallationId::new(98765);
/// assert_eq!(installation.as_u64(), 98765);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallationId(u64);

impl InstallationId {
    /// Create a new installation ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstallationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "installation_id".to_string(),
                message: "must be a positive integer".to_string(),
            })?;
        Ok(Self::new(id))
    }
}

// ============================================================================
// Token Types
// ============================================================================

/// JWT token for GitHub App authentication.
///
/// JSON Web Tokens (JWTs) are used to authenticate as a GitHub App and to
/// exchange for installation tokens. They are minted per invocation and never
/// cached.
///
/// The token string is never exposed in Debug output for security.
///
/// # Examples
///
/// ```
/// use github_app_token::auth::{JsonWebToken, GitHubAppId};
/// use chrono::{Utc, Duration};
///
/// let app_id = GitHubAppId::new(123);
/// let issued_at = Utc::now();
/// let jwt = JsonWebToken::new(
///     "encoded.jwt.token".to_string(),
///     app_id,
///     issued_at,
///     issued_at + Duration::minutes(1),
/// );
///
/// assert_eq!(jwt.app_id(), app_id);
/// assert_eq!(jwt.lifetime(), Duration::minutes(1));
/// ```
#[derive(Clone)]
pub struct JsonWebToken {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    app_id: GitHubAppId,
}

impl JsonWebToken {
    /// Create a new JWT token.
    ///
    /// # Arguments
    ///
    /// * `token` - The encoded JWT string
    /// * `app_id` - The GitHub App ID this token represents
    /// * `issued_at` - The `iat` claim
    /// * `expires_at` - The `exp` claim
    pub fn new(
        token: String,
        app_id: GitHubAppId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            issued_at,
            expires_at,
            app_id,
        }
    }

    /// Get the token string for use in API requests.
    ///
    /// This should be included in the Authorization header as:
    /// `Authorization: Bearer <token>`
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the GitHub App ID this token represents.
    pub fn app_id(&self) -> GitHubAppId {
        self.app_id
    }

    /// Get when this token was issued.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Get when this token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Time between issuance and expiry.
    pub fn lifetime(&self) -> Duration {
        self.expires_at - self.issued_at
    }

    /// Check if the token is expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Security: Don't expose token in debug output
impl std::fmt::Debug for JsonWebToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebToken")
            .field("app_id", &self.app_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Installation-scoped access token returned by GitHub.
///
/// The token string is opaque. Expiry is enforced by GitHub, the metadata is
/// kept only for logging and callers that want to inspect it.
///
/// The token string is never exposed in Debug output for security.
///
/// # Examples
///
/// ```
/// use github_app_token::auth::{InstallationToken, InstallationId};
///
/// let token = InstallationToken::new("ghs_abc".to_string(), InstallationId::new(999));
///
/// assert_eq!(token.token(), "ghs_abc");
/// assert_eq!(token.installation_id(), InstallationId::new(999));
/// ```
#[derive(Clone)]
pub struct InstallationToken {
    token: String,
    installation_id: InstallationId,
    expires_at: Option<DateTime<Utc>>,
    permissions: BTreeMap<String, PermissionLevel>,
    repository_selection: Option<RepositorySelection>,
}

impl InstallationToken {
    /// Create a new installation token without metadata.
    pub fn new(token: String, installation_id: InstallationId) -> Self {
        Self {
            token,
            installation_id,
            expires_at: None,
            permissions: BTreeMap::new(),
            repository_selection: None,
        }
    }

    /// Attach the expiry GitHub reported for this token.
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Attach the permissions GitHub granted to this token.
    pub fn with_permissions(mut self, permissions: BTreeMap<String, PermissionLevel>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Attach the repository selection GitHub reported for this token.
    pub fn with_repository_selection(mut self, selection: RepositorySelection) -> Self {
        self.repository_selection = Some(selection);
        self
    }

    /// Get the token string for use in API requests.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the installation ID this token is for.
    pub fn installation_id(&self) -> InstallationId {
        self.installation_id
    }

    /// Get when this token expires, if GitHub reported it.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Get the permissions granted to this token, keyed by permission name.
    pub fn permissions(&self) -> &BTreeMap<String, PermissionLevel> {
        &self.permissions
    }

    /// Get the repository selection of this token, if GitHub reported it.
    pub fn repository_selection(&self) -> Option<&RepositorySelection> {
        self.repository_selection.as_ref()
    }
}

// Security: Redact token in debug output
impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("installation_id", &self.installation_id)
            .field("expires_at", &self.expires_at)
            .field("permissions", &self.permissions)
            .field("repository_selection", &self.repository_selection)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Supporting Types
// ============================================================================

/// Permission level for GitHub resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
    Admin,
}

/// Repository selection for an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySelection {
    All,
    Selected,
}

/// Account an installation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub login: String,
}

/// Installation information from GitHub API.
///
/// Only the fields this crate reads are modelled; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    #[serde(default)]
    pub app_id: Option<GitHubAppId>,
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub repository_selection: Option<RepositorySelection>,
}

/// Private key for JWT signing.
///
/// Stores the PEM-encoded RSA key material. The key data is never exposed in
/// Debug output for security. Construct with [`PrivateKey::from_pem`], which
/// rejects anything that is not a parseable RSA private key.
#[derive(Clone)]
pub struct PrivateKey {
    key_data: Vec<u8>,
    algorithm: KeyAlgorithm,
}

impl PrivateKey {
    /// Get the key data.
    pub fn key_data(&self) -> &[u8] {
        &self.key_data
    }

    /// Get the signing algorithm.
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }
}

// Security: Don't expose key data in debug output
impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .field("key_data", &"<REDACTED>")
            .finish()
    }
}

/// Key algorithm for JWT signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    RS256,
}

/// JWT claims structure for GitHub App authentication.
///
/// GitHub expects `iss` as the app ID; it is serialized as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer (GitHub App ID, decimal string)
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
