//! GitHub OAuth provider
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub:
//! 1. Send the browser to `authorize_url` with client_id, redirect_uri, scope, state
//! 2. Exchange the returned code at `token_url`
//! 3. Fetch the user from `{api_url}user` with the access token

use std::time::Instant;

use axum::async_trait;
use http::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use super::profile::UserProfile;
use super::provider::OAuthProvider;
use crate::config::GitHubOAuthConfig;
use crate::error::AppError;
use crate::metrics::OAUTH_EXCHANGE_DURATION_SECONDS;

const PROVIDER_NAME: &str = "github";

/// GitHub token response
///
/// GitHub answers a bad code with HTTP 200 and an `error` field,
/// so every field is optional.
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GitHub user info
#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    id: u64,
    name: Option<String>,
    avatar_url: Option<String>,
    html_url: Option<String>,
    email: Option<String>,
}

impl From<GitHubUser> for UserProfile {
    fn from(user: GitHubUser) -> Self {
        UserProfile {
            provider: PROVIDER_NAME.to_string(),
            id: user.id.to_string(),
            username: user.login,
            display_name: user.name.filter(|name| !name.is_empty()),
            profile_url: user.html_url,
            avatar_url: user.avatar_url,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitHubProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: Url,
    scopes: Vec<String>,
    authorize_url: Url,
    token_url: Url,
    api_url: Url,
    http: reqwest::Client,
}

impl GitHubProvider {
    /// Build a provider from configuration
    ///
    /// # Errors
    /// Returns `AppError::Config` if one of the endpoint URLs doesn't parse.
    pub fn new(
        config: &GitHubOAuthConfig,
        redirect_uri: Url,
        http: reqwest::Client,
    ) -> Result<Self, AppError> {
        let mut api_url = parse_endpoint("auth.github.api_url", &config.api_url)?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri,
            scopes: config.scopes.clone(),
            authorize_url: parse_endpoint("auth.github.authorize_url", &config.authorize_url)?,
            token_url: parse_endpoint("auth.github.token_url", &config.token_url)?,
            api_url,
            http,
        })
    }

    async fn request_access_token(&self, code: &str) -> Result<String, AppError> {
        let response: GitHubTokenResponse = self
            .http
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response {
            GitHubTokenResponse {
                access_token: Some(token),
                ..
            } => Ok(token),
            GitHubTokenResponse {
                error: Some(error),
                error_description,
                ..
            } => Err(AppError::OAuth(match error_description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            })),
            _ => Err(AppError::OAuth(
                "token response carried neither access_token nor error".to_string(),
            )),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser, AppError> {
        let url = self
            .api_url
            .join("user")
            .map_err(|e| AppError::OAuth(format!("invalid user endpoint: {e}")))?;

        let user = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "GitHub"
    }

    fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AppError> {
        let started = Instant::now();

        let result = async {
            let token = self.request_access_token(code).await?;
            let user = self.fetch_user(&token).await?;
            Ok::<_, AppError>(UserProfile::from(user))
        }
        .await;

        OAUTH_EXCHANGE_DURATION_SECONDS
            .with_label_values(&[PROVIDER_NAME])
            .observe(started.elapsed().as_secs_f64());

        result
    }
}

fn parse_endpoint(key: &str, value: &str) -> Result<Url, AppError> {
    Url::parse(value).map_err(|e| AppError::Config(format!("{key} {value:?} is invalid: {e}")))
}
