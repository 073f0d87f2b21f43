//! Session management
//!
//! Sessions live server-side in the tower-sessions store; the client only
//! holds a signed cookie with the session id. `AuthSession` is the typed
//! view handlers get on that session: it reads and writes the current user
//! and the CSRF state of an in-flight OAuth handshake.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::profile::UserProfile;
use crate::error::AppError;

/// Session key holding the authenticated [`SessionUser`].
pub const SESSION_USER_KEY: &str = "user";

/// Session key holding the [`PendingHandshake`].
pub const HANDSHAKE_KEY: &str = "oauth_handshake";

/// Authenticated user bound to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub profile: UserProfile,
    /// When the OAuth callback completed
    pub authenticated_at: DateTime<Utc>,
}

/// OAuth handshake started by `/auth/{provider}` and not yet completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHandshake {
    pub provider: String,
    /// CSRF state echoed back by the provider
    pub state: String,
}

/// Typed access to the request's session
#[derive(Debug, Clone)]
pub struct AuthSession {
    session: Session,
}

impl AuthSession {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// User bound to this session, if any
    pub async fn current_user(&self) -> Result<Option<SessionUser>, AppError> {
        Ok(self.session.get::<SessionUser>(SESSION_USER_KEY).await?)
    }

    /// Bind a profile to the session (`ANONYMOUS → AUTHENTICATED`)
    ///
    /// The session id is cycled first so an id issued before login can't
    /// be reused afterwards.
    pub async fn bind(&self, profile: UserProfile) -> Result<SessionUser, AppError> {
        self.session.cycle_id().await?;

        let user = SessionUser {
            profile,
            authenticated_at: Utc::now(),
        };
        self.session.insert(SESSION_USER_KEY, &user).await?;
        Ok(user)
    }

    /// Drop everything in the session and delete it from the store
    /// (`AUTHENTICATED → ANONYMOUS`)
    ///
    /// Flushing an anonymous session is a no-op.
    pub async fn unbind(&self) -> Result<(), AppError> {
        self.session.flush().await?;
        Ok(())
    }

    /// Record a fresh CSRF state for `provider` and return it
    pub async fn begin_handshake(&self, provider: &str) -> Result<String, AppError> {
        let pending = PendingHandshake {
            provider: provider.to_string(),
            state: generate_csrf_state(),
        };
        self.session.insert(HANDSHAKE_KEY, &pending).await?;
        Ok(pending.state)
    }

    /// Remove and return the pending handshake
    ///
    /// A state is only ever accepted once.
    pub async fn take_handshake(&self) -> Result<Option<PendingHandshake>, AppError> {
        Ok(self.session.remove::<PendingHandshake>(HANDSHAKE_KEY).await?)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(AuthSession::new(session))
    }
}

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
