//! Common test utilities for E2E tests
//!
//! `TestServer` runs the real router on an ephemeral port next to a small
//! axum stand-in for GitHub's token and user endpoints. `Browser` keeps the
//! session cookie between requests and never follows redirects.

#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use hubgate::{AppState, config};
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

pub const COOKIE_NAME: &str = "hubgate.sid";
pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
/// Code the mock GitHub accepts
pub const GOOD_CODE: &str = "good-code";
const ACCESS_TOKEN: &str = "gho_test_token";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub github_addr: String,
    pub state: AppState,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after letting the caller tweak the configuration
    pub async fn with_config(customize: impl FnOnce(&mut config::AppConfig)) -> Self {
        hubgate::metrics::init_metrics();

        let github_addr = spawn(mock_github_router()).await;
        let mut config = test_config(&github_addr);
        customize(&mut config);

        let state = AppState::new(config).unwrap();
        let addr = spawn(hubgate::build_router(state.clone())).await;

        Self {
            addr,
            github_addr,
            state,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// A fresh browser with an empty cookie jar
    pub fn browser(&self) -> Browser {
        Browser {
            base: self.addr.clone(),
            client: no_redirect_client(),
            cookie: None,
        }
    }
}

fn test_config(github_addr: &str) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: "http://127.0.0.1:3000".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 3600,
            cookie_name: COOKIE_NAME.to_string(),
            allowed_users: Vec::new(),
            github: config::GitHubOAuthConfig {
                client_id: CLIENT_ID.to_string(),
                client_secret: CLIENT_SECRET.to_string(),
                callback_url: None,
                scopes: vec!["read:user".to_string()],
                authorize_url: format!("{github_addr}/login/oauth/authorize"),
                token_url: format!("{github_addr}/login/oauth/access_token"),
                api_url: format!("{github_addr}/"),
            },
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Location header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// Minimal cookie jar for the session cookie
pub struct Browser {
    base: String,
    client: reqwest::Client,
    pub cookie: Option<String>,
}

impl Browser {
    pub async fn get(&mut self, path_and_query: &str) -> reqwest::Response {
        let request = self.client.get(format!("{}{}", self.base, path_and_query));
        self.send(request).await
    }

    pub async fn post(&mut self, path: &str) -> reqwest::Response {
        let request = self.client.post(format!("{}{}", self.base, path));
        self.send(request).await
    }

    async fn send(&mut self, mut request: reqwest::RequestBuilder) -> reqwest::Response {
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await.expect("request succeeds");
        self.store_cookie(&response);
        response
    }

    fn store_cookie(&mut self, response: &reqwest::Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else {
                continue;
            };
            let Some((name, cookie_value)) = pair.split_once('=') else {
                continue;
            };
            if name.trim() != COOKIE_NAME {
                continue;
            }

            let removed = cookie_value.is_empty() || raw.to_ascii_lowercase().contains("max-age=0");
            self.cookie = if removed {
                None
            } else {
                Some(pair.trim().to_string())
            };
        }
    }

    /// Start the handshake and return the CSRF state GitHub would echo back
    pub async fn begin_login(&mut self) -> String {
        let response = self.get("/auth/github").await;
        assert!(response.status().is_redirection());

        let authorize = Url::parse(&location(&response)).expect("absolute authorize url");
        authorize
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter")
    }

    /// Run the full handshake with `code`, returning the callback response
    pub async fn sign_in_with_code(&mut self, code: &str) -> reqwest::Response {
        let state = self.begin_login().await;
        self.get(&format!("/auth/github/callback?code={code}&state={state}"))
            .await
    }

    /// Sign in as the mock GitHub user (`ada`)
    pub async fn sign_in(&mut self) {
        let response = self.sign_in_with_code(GOOD_CODE).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
    }
}

// =============================================================================
// Mock GitHub
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenRequest {
    client_id: String,
    client_secret: String,
    code: String,
    redirect_uri: String,
}

fn mock_github_router() -> Router {
    Router::new()
        .route("/login/oauth/access_token", post(mock_token))
        .route("/user", get(mock_user))
}

/// GitHub answers bad codes with 200 and an error body
async fn mock_token(Form(request): Form<TokenRequest>) -> Json<Value> {
    let credentials_ok = request.client_id == CLIENT_ID && request.client_secret == CLIENT_SECRET;
    let callback_ok = request.redirect_uri.ends_with("/auth/github/callback");

    if credentials_ok && callback_ok && request.code == GOOD_CODE {
        Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "scope": "read:user"
        }))
    } else {
        Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
    }
}

async fn mock_user(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ACCESS_TOKEN}"));
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Json(json!({
        "login": "ada",
        "id": 42,
        "name": "Ada",
        "avatar_url": null,
        "html_url": "https://github.com/ada",
        "email": null
    })))
}
