//! # GitHub App Token CLI
//!
//! Command-line interface that prints a GitHub App token.
//!
//! Without `-repo` the signed app token (JWT) is printed. With `-repo` the
//! app token is exchanged for an installation token scoped to that
//! repository, and the installation token is printed instead. Either way
//! exactly one line is written to stdout, or nothing is and the process
//! exits non-zero.
//!
//! An invocation moves through these steps, stopping at the first failure:
//!
//! 1. parse flags, load configuration, resolve [`Credentials`]
//! 2. read the private key and sign the app token
//! 3. (with `-repo`) exchange it for an installation token
//! 4. print the token

use clap::Parser;
use github_app_token::auth::{
    Clock, GitHubAppId, JsonWebToken, JwtGenerator, Liveness, PrivateKey, RS256JwtGenerator,
    SystemClock,
};
use github_app_token::client::{ClientConfig, GitHubClient};
use github_app_token::error::{ApiError, ExchangeError, SigningError, ValidationError};
use github_app_token::exchange::InstallationTokenExchanger;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming the configuration file.
pub const CONFIG_FILE_ENV: &str = "GITHUB_APP_TOKEN_CONFIG";

/// Prefix of environment variables that override configuration keys,
/// e.g. `GITHUB_APP_TOKEN__APP_ID`.
pub const CONFIG_ENV_PREFIX: &str = "GITHUB_APP_TOKEN";

// ============================================================================
// CLI Structure
// ============================================================================

/// Long flag names that may also be written with a single dash.
const LONG_FLAGS: &[&str] = &[
    "id",
    "private-key",
    "liveness",
    "repo",
    "api-url",
    "config",
    "log-level",
    "json-logs",
    "help",
    "version",
];

/// GitHub App token generator
#[derive(Parser, Debug)]
#[command(name = "github-app-token")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate GitHub App tokens")]
#[command(
    long_about = "Signs a GitHub App token (JWT) and prints it. With -repo, exchanges it for an installation token scoped to that repository and prints that instead."
)]
pub struct Cli {
    /// GitHub App ID
    #[arg(long = "id", value_name = "APP_ID")]
    pub app_id: Option<u64>,

    /// GitHub App private key (PEM file)
    #[arg(long = "private-key", value_name = "PATH")]
    pub private_key: Option<PathBuf>,

    /// Token liveness, e.g. 1m, 90s, 5m [default: 1m]
    #[arg(long, value_name = "DURATION", allow_hyphen_values = true)]
    pub liveness: Option<String>,

    /// Installed repository (owner/name); generates an installation token for it
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// GitHub API base URL [default: https://api.github.com]
    #[arg(long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "GITHUB_APP_TOKEN_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,
}

/// Rewrite Go-style single-dash long flags (`-id 1`, `-repo=a/b`) into the
/// double-dash form clap expects. Everything after `--` is left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut passthrough = false;

    for (index, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if index == 0 || passthrough {
            normalized.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        match arg.to_str() {
            Some(text) if is_single_dash_long_flag(text) => {
                normalized.push(OsString::from(format!("-{}", text)))
            }
            _ => normalized.push(arg),
        }
    }

    normalized
}

fn is_single_dash_long_flag(arg: &str) -> bool {
    match arg.strip_prefix('-') {
        Some(rest) if !rest.starts_with('-') => {
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            LONG_FLAGS.contains(&name)
        }
        _ => false,
    }
}

/// Parse command-line arguments, accepting both `-flag` and `--flag`.
///
/// Help and version requests come back as a `clap::Error` whose exit code
/// is 0.
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    Cli::try_parse_from(normalize_args(args))
}

/// Show a parse error, or help/version text, with `print`.
///
/// When `print` fails the plain message goes to `fallback`, so a failed
/// write never leaves only an exit code behind.
pub fn report_parse_error<P, W>(error: &clap::Error, print: P, fallback: &mut W)
where
    P: FnOnce(&clap::Error) -> std::io::Result<()>,
    W: Write,
{
    if let Err(print_error) = print(error) {
        debug!(error = %print_error, "Failed to print usage; falling back to plain text");
        // Nowhere left to report a failure of the fallback itself
        let _ = writeln!(fallback, "{}", error);
    }
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
///
/// Every variant maps to a fixed process exit code through
/// [`CliError::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    InputValidation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    #[error("generate app token: read {}: {source}", path.display())]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generate app token: {0}")]
    Signing(#[from] SigningError),

    #[error("generate installation token: {0}")]
    Client(#[source] ApiError),

    #[error("generate installation token: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("write token: {0}")]
    Output(#[source] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputValidation(_) => 2,
            Self::Configuration(_) => 3,
            Self::Client(_) => 3,
            Self::KeyRead { .. } => 4,
            Self::Signing(_) => 5,
            Self::Exchange(ExchangeError::MalformedRepositoryName { .. }) => 2,
            Self::Exchange(ExchangeError::InstallationLookup { .. }) => 6,
            Self::Exchange(ExchangeError::TokenCreation { .. }) => 7,
            Self::Logging { .. } => 1,
            Self::Output(_) => 1,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Settings that may come from a configuration file or the environment.
///
/// Every key is optional here; required values are checked after flags are
/// layered on top, in [`Credentials::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub app_id: Option<u64>,
    pub private_key: Option<PathBuf>,
    pub liveness: Option<String>,
    pub repo: Option<String>,
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
}

/// Load configuration from an optional TOML file and the environment.
///
/// Sources, later overriding earlier:
///  1. the file at `path`, if given (it must exist)
///  2. environment variables prefixed `GITHUB_APP_TOKEN__`
pub fn load_configuration(path: Option<&Path>) -> Result<TokenConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        builder = builder.add_source(
            config::File::from(path)
                .required(true)
                .format(config::FileFormat::Toml),
        );
        debug!(path = %path.display(), "Loading configuration file");
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(CONFIG_ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Everything one invocation needs, resolved once and never mutated.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub private_key_path: PathBuf,
    pub app_id: GitHubAppId,
    pub liveness: Liveness,
    pub repository: Option<String>,
    pub client: ClientConfig,
}

impl Credentials {
    /// Layer command-line flags over configuration and validate the result.
    ///
    /// No files are read and no network calls are made here.
    ///
    /// # Errors
    ///
    /// - `ValidationError::Required` if the private key path or app ID is
    ///   missing (an app ID of 0 counts as missing)
    /// - `ValidationError::InvalidFormat` / `OutOfRange` for a bad liveness
    pub fn resolve(cli: &Cli, config: TokenConfig) -> Result<Self, ValidationError> {
        let private_key_path = cli
            .private_key
            .clone()
            .or(config.private_key)
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "-private-key".to_string(),
            })?;

        let app_id = cli
            .app_id
            .or(config.app_id)
            .filter(|id| *id != 0)
            .map(GitHubAppId::new)
            .ok_or_else(|| ValidationError::Required {
                field: "-id".to_string(),
            })?;

        let liveness = match cli.liveness.as_deref().or(config.liveness.as_deref()) {
            Some(value) => value.parse()?,
            None => Liveness::default(),
        };

        let repository = cli
            .repo
            .clone()
            .or(config.repo)
            .filter(|repo| !repo.is_empty());

        let mut client = ClientConfig::default();
        if let Some(api_url) = cli.api_url.clone().or(config.api_url) {
            client = client.with_github_api_url(api_url);
        }
        if let Some(user_agent) = config.user_agent {
            client = client.with_user_agent(user_agent);
        }

        Ok(Self {
            private_key_path,
            app_id,
            liveness,
            repository,
            client,
        })
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Initialize logging based on CLI arguments.
///
/// Logs go to stderr; stdout carries only the token. `RUST_LOG` wins over
/// `-log-level` when set.
pub fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level).map_err(|e| {
            ValidationError::InvalidFormat {
                field: "-log-level".to_string(),
                message: e.to_string(),
            }
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

/// Run one invocation and write the resulting token to `out`.
///
/// Configuration is loaded before flags are validated, since the file or the
/// environment may supply the app ID and key path. A broken configuration
/// file therefore fails with `CliError::Configuration` even when `-id` or
/// `-private-key` is also missing.
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    let config = load_configuration(cli.config.as_deref())?;
    let credentials = Credentials::resolve(&cli, config)?;
    info!(
        app_id = %credentials.app_id,
        liveness = %credentials.liveness,
        repository = ?credentials.repository,
        "Resolved credentials"
    );

    let app_token = generate_app_token(&credentials, SystemClock).await?;

    match &credentials.repository {
        Some(repository) => {
            let token =
                generate_installation_token(&credentials.client, &app_token, repository).await?;
            emit(out, token.token())
        }
        None => emit(out, app_token.token()),
    }
}

/// Read the private key and sign an app token.
pub async fn generate_app_token<C: Clock>(
    credentials: &Credentials,
    clock: C,
) -> Result<JsonWebToken, CliError> {
    let pem = tokio::fs::read(&credentials.private_key_path)
        .await
        .map_err(|source| CliError::KeyRead {
            path: credentials.private_key_path.clone(),
            source,
        })?;
    let private_key = PrivateKey::from_pem(&pem)?;

    let generator = RS256JwtGenerator::with_clock(private_key, credentials.liveness, clock);
    Ok(generator.generate_jwt(credentials.app_id).await?)
}

/// Exchange an app token for an installation token on `repository`.
pub async fn generate_installation_token(
    client_config: &ClientConfig,
    app_token: &JsonWebToken,
    repository: &str,
) -> Result<github_app_token::InstallationToken, CliError> {
    let client = GitHubClient::new(client_config.clone()).map_err(CliError::Client)?;
    let exchanger = InstallationTokenExchanger::new(client);
    Ok(exchanger.exchange(app_token, repository).await?)
}

fn emit<W: Write>(out: &mut W, token: &str) -> Result<(), CliError> {
    writeln!(out, "{}", token).map_err(CliError::Output)?;
    out.flush().map_err(CliError::Output)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
