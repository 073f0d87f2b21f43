//! Authentication middleware
//!
//! Protects routes that require a signed-in user.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::session::{AuthSession, SessionUser};
use crate::error::AppError;
use crate::metrics::GATE_REDIRECTS_TOTAL;

/// Where anonymous requests to protected routes are sent
pub const LOGIN_PATH: &str = "/login";

/// Middleware to require authentication
///
/// Reads the session's user. Authenticated requests continue with the
/// [`SessionUser`] in request extensions; anonymous ones are redirected to
/// [`LOGIN_PATH`] and never reach the wrapped handler.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/account", get(account))
///     .route_layer(middleware::from_fn(require_login));
/// ```
pub async fn require_login(
    auth: AuthSession,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user) = auth.current_user().await? else {
        GATE_REDIRECTS_TOTAL.inc();
        tracing::debug!(path = %request.uri().path(), "Anonymous request redirected to login");
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// Use in handlers behind [`require_login`]. Falls back to reading the
/// session itself, and redirects to the login page if nobody is signed in.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.profile.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>().cloned() {
            return Ok(CurrentUser(user));
        }

        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(CurrentUser(user)),
            MaybeUser(None) => Err(Redirect::to(LOGIN_PATH).into_response()),
        }
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of redirecting.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<SessionUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>().cloned() {
            return Ok(MaybeUser(Some(user)));
        }

        let auth = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let user = auth
            .current_user()
            .await
            .map_err(IntoResponse::into_response)?;

        if let Some(user) = &user {
            parts.extensions.insert(user.clone());
        }

        Ok(MaybeUser(user))
    }
}
