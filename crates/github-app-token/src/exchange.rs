//! Installation token exchange.
//!
//! Turns a freshly signed app token into an installation token for one
//! repository. The exchange is strictly ordered:
//!
//! 1. the repository name is parsed; a malformed name fails before any call
//! 2. the repository's installation is looked up
//! 3. an access token is created for that installation
//!
//! Each step runs once. There are no retries and nothing is cached.

use std::str::FromStr;
use tracing::{debug, info};

use crate::auth::{InstallationToken, JsonWebToken};
use crate::client::InstallationApi;
use crate::error::ExchangeError;

/// Repository identifier in `owner/name` form.
///
/// # Examples
///
/// ```
/// use github_app_token::exchange::RepositoryName;
///
/// let repository: RepositoryName = "acme/widgets".parse().unwrap();
/// assert_eq!(repository.owner(), "acme");
/// assert_eq!(repository.name(), "widgets");
/// assert_eq!(repository.to_string(), "acme/widgets");
///
/// assert!("acmewidgets".parse::<RepositoryName>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    owner: String,
    name: String,
}

impl RepositoryName {
    /// Get the owning account's login.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name without the owner.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryName {
    type Err = ExchangeError;

    /// Exactly one `/` with a non-empty part on each side.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ExchangeError::MalformedRepositoryName {
                name: s.to_string(),
            }),
        }
    }
}

/// Exchanges app tokens for repository installation tokens.
///
/// # Examples
///
/// ```no_run
/// # use github_app_token::client::{ClientConfig, GitHubClient};
/// # use github_app_token::exchange::InstallationTokenExchanger;
/// # use github_app_token::auth::JsonWebToken;
/// # async fn example(jwt: JsonWebToken) -> Result<(), Box<dyn std::error::Error>> {
/// let exchanger = InstallationTokenExchanger::new(GitHubClient::new(ClientConfig::default())?);
/// let token = exchanger.exchange(&jwt, "acme/widgets").await?;
/// println!("{}", token.token());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InstallationTokenExchanger<A: InstallationApi> {
    api: A,
}

impl<A: InstallationApi> InstallationTokenExchanger<A> {
    /// Create an exchanger over the given API.
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Exchange `jwt` for an installation token scoped to `repository`.
    ///
    /// # Errors
    ///
    /// - `ExchangeError::MalformedRepositoryName` if `repository` is not
    ///   `owner/name`; no call is made
    /// - `ExchangeError::InstallationLookup` if the app is not installed on the
    ///   repository or the lookup fails; no token is requested
    /// - `ExchangeError::TokenCreation` if the token request fails
    pub async fn exchange(
        &self,
        jwt: &JsonWebToken,
        repository: &str,
    ) -> Result<InstallationToken, ExchangeError> {
        let repository: RepositoryName = repository.parse()?;
        debug!(repository = %repository, app_id = %jwt.app_id(), "Exchanging app token");

        let installation = self
            .api
            .find_repository_installation(jwt, &repository)
            .await
            .map_err(|source| ExchangeError::InstallationLookup {
                repository: repository.to_string(),
                source,
            })?;

        let token = self
            .api
            .create_installation_token(jwt, installation.id)
            .await
            .map_err(|source| ExchangeError::TokenCreation {
                installation_id: installation.id,
                source,
            })?;

        info!(
            repository = %repository,
            installation_id = %installation.id,
            "Exchanged app token for installation token"
        );
        Ok(token)
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
