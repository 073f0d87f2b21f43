//! Completing an OAuth handshake
//!
//! Everything between "the provider redirected back" and "here is the
//! profile to bind": state check, code exchange and profile verification.
//! No session or HTTP types in here, so the whole path can be tested with a
//! mocked provider.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use super::profile::UserProfile;
use super::provider::OAuthProvider;
use super::session::PendingHandshake;
use crate::error::AppError;

/// Query parameters of `/auth/{provider}/callback`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code
    pub code: Option<String>,
    /// CSRF state token
    pub state: Option<String>,
    /// Set by the provider when the user denied access
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Why a callback did not produce a profile
///
/// All of these are recovered by sending the user back to the login page.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("provider returned {error}: {}", .description.as_deref().unwrap_or("no description"))]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("malformed callback query: {0}")]
    MalformedCallback(String),

    #[error("callback carried no authorization code")]
    MissingCode,

    #[error("no handshake in progress for this session")]
    NoPendingHandshake,

    #[error("CSRF state does not match")]
    StateMismatch,

    #[error("code exchange failed: {0}")]
    Exchange(#[source] AppError),

    #[error("profile rejected: {0}")]
    Rejected(#[source] AppError),
}

impl AuthFailure {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::Denied { .. } => "denied",
            AuthFailure::MalformedCallback(_) => "malformed_callback",
            AuthFailure::MissingCode => "missing_code",
            AuthFailure::NoPendingHandshake => "no_pending_handshake",
            AuthFailure::StateMismatch => "state_mismatch",
            AuthFailure::Exchange(_) => "exchange",
            AuthFailure::Rejected(_) => "rejected",
        }
    }
}

/// Profile verification step run after a successful exchange
///
/// The default passes the provider profile through unchanged.
pub type VerifyProfile = Arc<dyn Fn(UserProfile) -> Result<UserProfile, AppError> + Send + Sync>;

/// Identity verifier
pub fn passthrough() -> VerifyProfile {
    Arc::new(|profile: UserProfile| Ok(profile))
}

/// Only let the listed usernames in (case-insensitive)
pub fn allowlist<I, S>(usernames: I) -> VerifyProfile
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let allowed: HashSet<String> = usernames
        .into_iter()
        .map(|name| name.as_ref().to_ascii_lowercase())
        .collect();

    Arc::new(move |profile: UserProfile| {
        if allowed.contains(&profile.username.to_ascii_lowercase()) {
            Ok(profile)
        } else {
            Err(AppError::OAuth(format!(
                "user {} is not allowed to sign in",
                profile.username
            )))
        }
    })
}

/// Turn a provider callback into a verified profile
pub async fn complete_handshake(
    provider: &dyn OAuthProvider,
    verify: &VerifyProfile,
    pending: Option<PendingHandshake>,
    callback: CallbackQuery,
) -> Result<UserProfile, AuthFailure> {
    if let Some(error) = callback.error {
        return Err(AuthFailure::Denied {
            error,
            description: callback.error_description,
        });
    }

    let pending = pending.ok_or(AuthFailure::NoPendingHandshake)?;
    let state_matches = pending.provider == provider.name()
        && callback.state.as_deref() == Some(pending.state.as_str());
    if !state_matches {
        return Err(AuthFailure::StateMismatch);
    }

    let code = callback
        .code
        .filter(|code| !code.is_empty())
        .ok_or(AuthFailure::MissingCode)?;

    let profile = provider
        .exchange_code(&code)
        .await
        .map_err(AuthFailure::Exchange)?;

    verify(profile).map_err(AuthFailure::Rejected)
}
