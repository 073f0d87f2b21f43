//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (HUBGATE__SECTION__KEY)
//! 4. Well-known variables (GITHUB_CLIENT_ID, GITHUB_CLIENT_SECRET,
//!    SESSION_SECRET, PORT)

use serde::Deserialize;
use std::net::IpAddr;
use url::Url;

use crate::error::AppError;

/// Main application configuration
///
/// Built once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Externally visible base URL (e.g., "https://login.example.com")
    pub public_url: String,
}

impl ServerConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign the session cookie (32+ bytes)
    pub session_secret: String,
    /// Idle session lifetime in seconds (default: 86400 = 1 day)
    pub session_max_age: i64,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Usernames allowed to sign in. Empty means everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    pub github: GitHubOAuthConfig,
}

/// GitHub OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with GitHub.
    ///
    /// Defaults to `{public_url}/auth/github/callback`.
    pub callback_url: Option<String>,
    /// Requested scopes (default: `read:user`)
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    /// REST API base, e.g. `https://api.github.com/`
    pub api_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Errors
    /// Returns error if a required value is missing or invalid.
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.public_url", "http://localhost:3000")?
            .set_default("auth.session_secret", "")?
            .set_default("auth.session_max_age", 86400)?
            .set_default("auth.cookie_name", "hubgate.sid")?
            .set_default("auth.github.client_id", "")?
            .set_default("auth.github.client_secret", "")?
            .set_default("auth.github.scopes", vec!["read:user"])?
            .set_default(
                "auth.github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "auth.github.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("auth.github.api_url", "https://api.github.com/")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("HUBGATE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.allowed_users")
                    .with_list_parse_key("auth.github.scopes"),
            )
            .set_override_option("auth.github.client_id", env_value("GITHUB_CLIENT_ID"))?
            .set_override_option(
                "auth.github.client_secret",
                env_value("GITHUB_CLIENT_SECRET"),
            )?
            .set_override_option("auth.session_secret", env_value("SESSION_SECRET"))?
            .set_override_option("server.port", env_value("PORT"))?
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Callback URL handed to GitHub in the authorize redirect and token exchange
    pub fn github_callback_url(&self) -> Result<Url, AppError> {
        let raw = match &self.auth.github.callback_url {
            Some(url) => url.clone(),
            None => format!("{}/auth/github/callback", self.server.base_url()),
        };
        Url::parse(&raw)
            .map_err(|e| AppError::Config(format!("invalid GitHub callback URL {raw:?}: {e}")))
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        match Url::parse(&self.server.public_url) {
            Ok(url) => {
                url.scheme().eq_ignore_ascii_case("https")
                    || !url.host_str().is_some_and(is_local_host)
            }
            Err(_) => true,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.github.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "auth.github.client_id is required (set GITHUB_CLIENT_ID)".to_string(),
            ));
        }

        if self.auth.github.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "auth.github.client_secret is required (set GITHUB_CLIENT_SECRET)".to_string(),
            ));
        }

        let public_url = Url::parse(&self.server.public_url).map_err(|e| {
            AppError::Config(format!(
                "server.public_url {:?} is not a valid URL: {e}",
                self.server.public_url
            ))
        })?;

        if self.should_use_secure_cookies() && public_url.scheme() != "https" {
            return Err(AppError::Config(
                "server.public_url must use https for non-local hosts".to_string(),
            ));
        }

        self.github_callback_url()?;

        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn is_local_host(host: &str) -> bool {
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
