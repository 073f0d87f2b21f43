//! Login, OAuth handshake and logout routes

use axum::{
    Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::Method,
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use minijinja::context;

use super::handshake::{AuthFailure, CallbackQuery, complete_handshake};
use super::middleware::{LOGIN_PATH, MaybeUser};
use super::session::AuthSession;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::{LOGINS_TOTAL, LOGOUTS_TOTAL, record_request};
use crate::views;

/// Create authentication router
///
/// Routes:
/// - GET /login - Login page
/// - GET /auth/:provider - Redirect to the provider
/// - GET /auth/:provider/callback - OAuth callback
/// - GET|POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/auth/:provider", get(begin_login))
        .route("/auth/:provider/callback", get(finish_login))
        .route("/logout", get(logout).post(logout))
}

// =============================================================================
// Login Page
// =============================================================================

/// GET /login
async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Html<String>, AppError> {
    let page = state.views.render(
        views::LOGIN,
        context! {
            providers => state.providers.links(),
            user => user.map(|user| user.profile),
        },
    )?;
    record_request("GET", "/login", 200);
    Ok(page)
}

// =============================================================================
// OAuth handshake
// =============================================================================

/// GET /auth/:provider
///
/// Stores a fresh CSRF state in the session and sends the browser to the
/// provider's authorize page.
async fn begin_login(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    auth: AuthSession,
) -> Result<Redirect, AppError> {
    let provider = state
        .providers
        .get(&provider_name)
        .ok_or(AppError::NotFound)?;

    let csrf_state = auth.begin_handshake(provider.name()).await?;
    let url = provider.authorization_url(&csrf_state)?;

    tracing::debug!(provider = provider.name(), "Starting OAuth handshake");
    record_request("GET", "/auth/:provider", 303);
    Ok(Redirect::to(url.as_str()))
}

/// GET /auth/:provider/callback
///
/// On success binds the profile to the session and redirects home.
/// Any handshake failure, including a query string that doesn't parse,
/// sends the user back to the login page.
async fn finish_login(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    auth: AuthSession,
) -> Result<Redirect, AppError> {
    let provider = state
        .providers
        .get(&provider_name)
        .ok_or(AppError::NotFound)?;

    let pending = auth.take_handshake().await?;

    let outcome = match query {
        Ok(Query(callback)) => {
            complete_handshake(provider.as_ref(), &state.verify, pending, callback).await
        }
        Err(rejection) => Err(AuthFailure::MalformedCallback(rejection.body_text())),
    };

    match outcome {
        Ok(profile) => {
            let user = auth.bind(profile).await?;
            LOGINS_TOTAL
                .with_label_values(&[provider.name(), "success"])
                .inc();
            tracing::info!(
                provider = provider.name(),
                username = %user.profile.username,
                "User signed in"
            );
            record_request("GET", "/auth/:provider/callback", 303);
            Ok(Redirect::to("/"))
        }
        Err(failure) => {
            LOGINS_TOTAL
                .with_label_values(&[provider.name(), failure.reason()])
                .inc();
            tracing::warn!(
                provider = provider.name(),
                reason = failure.reason(),
                error = %failure,
                "OAuth handshake failed"
            );
            record_request("GET", "/auth/:provider/callback", 303);
            Ok(Redirect::to(LOGIN_PATH))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// GET|POST /logout
///
/// Flushes the session and redirects home. Logging out an anonymous
/// session does the same and is not an error.
async fn logout(method: Method, auth: AuthSession) -> Result<impl IntoResponse, AppError> {
    let user = auth.current_user().await?;
    auth.unbind().await?;

    LOGOUTS_TOTAL.inc();
    if let Some(user) = user {
        tracing::info!(username = %user.profile.username, "User signed out");
    }
    record_request(method.as_str(), "/logout", 303);
    Ok(Redirect::to("/"))
}
