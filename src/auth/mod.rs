//! OAuth authentication
//!
//! Handles:
//! - Provider handshake (GitHub)
//! - Session binding of the signed-in user
//! - The login gate for protected routes

mod github;
mod handshake;
mod middleware;
mod oauth;
mod profile;
mod provider;
pub mod session;

pub use github::GitHubProvider;
pub use handshake::{
    AuthFailure, CallbackQuery, VerifyProfile, allowlist, complete_handshake, passthrough,
};
pub use middleware::{CurrentUser, LOGIN_PATH, MaybeUser, require_login};
pub use oauth::auth_router;
pub use profile::UserProfile;
pub use provider::{OAuthProvider, ProviderLink, ProviderRegistry};
pub use session::{AuthSession, PendingHandshake, SessionUser};
