//! Error types for GitHub App token operations.
//!
//! Each step of token issuance has its own error type so callers can tell
//! which step failed without inspecting messages:
//! - [`ValidationError`] for caller-supplied input
//! - [`SigningError`] for key parsing and JWT signing
//! - [`ApiError`] for a single GitHub REST call
//! - [`ExchangeError`] for the installation token exchange as a whole

use thiserror::Error;

use crate::auth::InstallationId;

/// Errors during JWT signing operations.
///
/// These errors occur while turning key material and claims into a signed
/// app token. Neither variant is transient.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The private key bytes could not be parsed as an RSA private key.
    #[error("Invalid private key: {message}")]
    InvalidKey { message: String },

    /// The claims could not be encoded or signed.
    #[error("Token encoding failed: {message}")]
    EncodingFailed { message: String },
}

/// Errors during GitHub API operations.
///
/// These errors represent failures when communicating with the GitHub API,
/// including HTTP error responses, transport failures, and parsing failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP error response from GitHub API.
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// Authentication to GitHub API failed (401).
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Authorization check failed (403).
    #[error("Authorization failed: {message}")]
    AuthorizationFailed { message: String },

    /// The requested resource was not found (404).
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// The client could not be configured.
    #[error("Client configuration error: {message}")]
    Configuration { message: String },

    /// Failed to parse JSON response from GitHub API.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP client error (network, TLS, etc.).
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

impl ApiError {
    /// Build the error for a non-success HTTP status.
    ///
    /// `message` is the text GitHub returned, already extracted from the body.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::AuthenticationFailed { message },
            403 => Self::AuthorizationFailed { message },
            404 => Self::NotFound { message },
            _ => Self::HttpError { status, message },
        }
    }

    /// HTTP status code carried by this error, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            Self::AuthenticationFailed { .. } => Some(401),
            Self::AuthorizationFailed { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Configuration { .. } => None,
            Self::JsonError(_) => None,
            Self::HttpClientError(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Errors from exchanging an app token for an installation token.
///
/// The variants follow the order of the exchange: the repository name is
/// checked first, then the installation is looked up, then the token is
/// created. A later step never runs after an earlier one fails.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The repository identifier is not of the form `owner/name`.
    #[error("malformed repository name: {name}")]
    MalformedRepositoryName { name: String },

    /// Looking up the app installation for the repository failed.
    #[error("find installation for repository {repository}: {source}")]
    InstallationLookup {
        repository: String,
        #[source]
        source: ApiError,
    },

    /// Creating the installation access token failed.
    #[error("create access token for installation {installation_id}: {source}")]
    TokenCreation {
        installation_id: InstallationId,
        #[source]
        source: ApiError,
    },
}

/// Input validation errors.
///
/// These errors occur when validating user input or configuration data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing.
    #[error("{field} is required")]
    Required { field: String },

    /// A field has an invalid format.
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    /// A field value is out of the acceptable range.
    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
