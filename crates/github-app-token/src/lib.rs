//! # GitHub App Token
//!
//! Short-lived credentials for GitHub Apps.
//!
//! This crate provides:
//! - RS256 signing of app tokens (JWTs asserting the app's identity)
//! - A GitHub REST client for the installation endpoints
//! - Exchange of an app token for a repository installation token
//!
//! Nothing is cached: every token is minted for the call that asked for it.
//!
//! # Examples
//!
//! ## Signing an app token
//!
//! ```no_run
//! use github_app_token::auth::{GitHubAppId, JwtGenerator, Liveness, PrivateKey, RS256JwtGenerator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pem = std::fs::read("app.pem")?;
//! let generator = RS256JwtGenerator::new(PrivateKey::from_pem(&pem)?, Liveness::default());
//! let jwt = generator.generate_jwt(GitHubAppId::new(123456)).await?;
//! println!("{}", jwt.token());
//! # Ok(())
//! # }
//! ```
//!
//! ## Exchanging it for an installation token
//!
//! ```no_run
//! use github_app_token::client::{ClientConfig, GitHubClient};
//! use github_app_token::exchange::InstallationTokenExchanger;
//! # use github_app_token::auth::JsonWebToken;
//!
//! # async fn example(jwt: JsonWebToken) -> Result<(), Box<dyn std::error::Error>> {
//! let exchanger = InstallationTokenExchanger::new(GitHubClient::new(ClientConfig::default())?);
//! let token = exchanger.exchange(&jwt, "acme/widgets").await?;
//! println!("{}", token.token());
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod auth;
pub mod client;
pub mod error;
pub mod exchange;

// Re-export commonly used types at crate root for convenience
pub use error::{ApiError, ExchangeError, SigningError, ValidationError};

pub use auth::{
    Clock, FixedClock, GitHubAppId, Installation, InstallationId, InstallationToken,
    JsonWebToken, JwtClaims, JwtGenerator, KeyAlgorithm, Liveness, PrivateKey,
    RS256JwtGenerator, SystemClock,
};
pub use client::{ClientConfig, GitHubClient, InstallationApi};
pub use exchange::{InstallationTokenExchanger, RepositoryName};
