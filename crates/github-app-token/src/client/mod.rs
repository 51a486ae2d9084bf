//! GitHub REST client for app-level operations.
//!
//! This module provides the `GitHubClient` used to talk to GitHub as a GitHub
//! App. Every request is authenticated with an app token (JWT) supplied by
//! the caller; the client never mints or caches tokens itself.
//!
//! Only the two endpoints needed for installation token exchange are
//! implemented, behind the [`InstallationApi`] trait so the exchange logic can
//! be tested without a network.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use url::Url;

use crate::auth::{
    Installation, InstallationId, InstallationToken, JsonWebToken, PermissionLevel,
    RepositorySelection,
};
use crate::error::ApiError;
use crate::exchange::RepositoryName;

/// REST API version requested on every call.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Default public GitHub API endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Configuration for GitHub API client behavior.
///
/// # Examples
///
/// ```
/// use github_app_token::client::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_github_api_url("https://github.example.com/api/v3")
///     .with_user_agent("my-tool/1.0");
///
/// assert_eq!(config.github_api_url, "https://github.example.com/api/v3");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for API requests (required by GitHub)
    pub user_agent: String,
    /// GitHub API base URL
    pub github_api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("github-app-token/", env!("CARGO_PKG_VERSION")).to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for client configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the GitHub API base URL.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }
}

/// Builder for constructing `ClientConfig` instances.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new configuration builder with defaults.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the GitHub API base URL.
    pub fn github_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.github_api_url = url.into();
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The GitHub endpoints used to turn an app token into an installation token.
///
/// Both calls authenticate with the app token as a bearer credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InstallationApi: Send + Sync {
    /// Find the installation of the authenticated app on a repository.
    ///
    /// `GET /repos/{owner}/{repo}/installation`
    async fn find_repository_installation(
        &self,
        jwt: &JsonWebToken,
        repository: &RepositoryName,
    ) -> Result<Installation, ApiError>;

    /// Create an installation access token with default options.
    ///
    /// `POST /app/installations/{installation_id}/access_tokens`
    async fn create_installation_token(
        &self,
        jwt: &JsonWebToken,
        installation_id: InstallationId,
    ) -> Result<InstallationToken, ApiError>;
}

/// Body of a successful access token response.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    permissions: BTreeMap<String, PermissionLevel>,
    #[serde(default)]
    repository_selection: Option<RepositorySelection>,
}

/// Error body GitHub returns alongside non-success statuses.
#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

/// GitHub API client for app-authenticated operations.
///
/// # Examples
///
/// ```no_run
/// # use github_app_token::client::{ClientConfig, GitHubClient, InstallationApi};
/// # use github_app_token::exchange::RepositoryName;
/// # use github_app_token::auth::JsonWebToken;
/// # async fn example(jwt: JsonWebToken) -> Result<(), Box<dyn std::error::Error>> {
/// let client = GitHubClient::new(ClientConfig::default())?;
/// let repository: RepositoryName = "acme/widgets".parse()?;
/// let installation = client.find_repository_installation(&jwt, &repository).await?;
/// println!("Installation ID: {}", installation.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
}

impl GitHubClient {
    /// Create a client for the configured API endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the API URL is not an absolute
    /// http(s) URL, and `ApiError::HttpClientError` if the HTTP client cannot
    /// be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(&config.github_api_url).map_err(|e| ApiError::Configuration {
                message: format!("invalid GitHub API URL {:?}: {}", config.github_api_url, e),
            })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::Configuration {
                message: format!(
                    "GitHub API URL must be an http(s) URL, got {:?}",
                    config.github_api_url
                ),
            });
        }

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            config,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build an endpoint URL below the API base from raw path segments.
    ///
    /// Segments are percent-encoded, so owner and repository names cannot
    /// escape their position in the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Configuration {
                message: format!("GitHub API URL {} cannot be a base", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send an app-authenticated request and decode a JSON success body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        jwt: &JsonWebToken,
    ) -> Result<T, ApiError> {
        let response = request
            .bearer_auth(jwt.token())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(
                status.as_u16(),
                error_message(status, &body),
            ));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl InstallationApi for GitHubClient {
    async fn find_repository_installation(
        &self,
        jwt: &JsonWebToken,
        repository: &RepositoryName,
    ) -> Result<Installation, ApiError> {
        let url = self.endpoint(&[
            "repos",
            repository.owner(),
            repository.name(),
            "installation",
        ])?;
        debug!(url = %url, repository = %repository, "Looking up repository installation");

        let installation: Installation = self.send_json(self.http_client.get(url), jwt).await?;

        info!(
            repository = %repository,
            installation_id = %installation.id,
            "Found repository installation"
        );
        Ok(installation)
    }

    async fn create_installation_token(
        &self,
        jwt: &JsonWebToken,
        installation_id: InstallationId,
    ) -> Result<InstallationToken, ApiError> {
        let url = self.endpoint(&[
            "app",
            "installations",
            &installation_id.to_string(),
            "access_tokens",
        ])?;
        debug!(url = %url, installation_id = %installation_id, "Creating installation token");

        let request = self.http_client.post(url).json(&serde_json::json!({}));
        let response: AccessTokenResponse = self.send_json(request, jwt).await?;

        let mut token = InstallationToken::new(response.token, installation_id)
            .with_permissions(response.permissions);
        if let Some(expires_at) = response.expires_at {
            token = token.with_expires_at(expires_at);
        }
        if let Some(selection) = response.repository_selection {
            token = token.with_repository_selection(selection);
        }

        info!(
            installation_id = %installation_id,
            expires_at = ?token.expires_at(),
            "Created installation token"
        );
        Ok(token)
    }
}

/// Pull a human readable message out of an error response body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<GitHubErrorBody>(body) {
        return parsed.message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
