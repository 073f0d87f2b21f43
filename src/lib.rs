//! hubgate - sign in with GitHub, see your account page
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Router (Axum)                          │
//! │  - /, /account             (pages, login gate)              │
//! │  - /login, /auth/..., /logout  (auth)                       │
//! │  - /health, /metrics                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Sessions (tower-sessions, server-side MemoryStore)         │
//! │  OAuth providers (GitHub over reqwest)                      │
//! │  Views (minijinja)                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: page and metrics handlers
//! - `auth`: OAuth handshake, session binding, login gate
//! - `views`: HTML templates
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod views;

use std::sync::Arc;

use sha2::{Digest, Sha512};
use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer,
    cookie::{Key, SameSite},
};

/// Application state shared across all handlers
///
/// Everything in here is built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// OAuth providers reachable through `/auth/:provider`
    pub providers: Arc<auth::ProviderRegistry>,

    /// Check run on every profile a provider hands back
    pub verify: auth::VerifyProfile,

    /// Compiled page templates
    pub views: Arc<views::Views>,
}

impl AppState {
    /// Initialize application state with the GitHub provider
    ///
    /// # Errors
    /// Returns error if the HTTP client, the provider or the templates
    /// can't be built from the configuration.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("hubgate/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let github = auth::GitHubProvider::new(
            &config.auth.github,
            config.github_callback_url()?,
            http_client,
        )?;
        let providers = auth::ProviderRegistry::new().with(Arc::new(github));

        Self::with_providers(config, providers)
    }

    /// Initialize application state with an explicit set of providers
    pub fn with_providers(
        config: config::AppConfig,
        providers: auth::ProviderRegistry,
    ) -> Result<Self, error::AppError> {
        if providers.is_empty() {
            return Err(error::AppError::Config(
                "no OAuth providers are configured".to_string(),
            ));
        }

        let verify = if config.auth.allowed_users.is_empty() {
            auth::passthrough()
        } else {
            tracing::info!(
                users = config.auth.allowed_users.len(),
                "Restricting sign-in to allowed users"
            );
            auth::allowlist(&config.auth.allowed_users)
        };

        let views = views::Views::new()?;
        tracing::info!(providers = ?providers, "Application state initialized");

        Ok(Self {
            config: Arc::new(config),
            providers: Arc::new(providers),
            verify,
            views: Arc::new(views),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    // Server-side sessions keyed by a signed cookie. `SameSite=Lax` so the
    // cookie comes along when the provider redirects back to the callback.
    let key_material = Sha512::digest(state.config.auth.session_secret.as_bytes());
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(state.config.auth.cookie_name.clone())
        .with_secure(state.config.should_use_secure_cookies())
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            state.config.auth.session_max_age,
        )))
        .with_signed(Key::from(key_material.as_slice()));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::pages_router())
        .merge(auth::auth_router())
        .merge(api::metrics_router())
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}
