//! Authenticated user profile

use serde::{Deserialize, Serialize};

/// Profile returned by an OAuth provider
///
/// Passed through to the session and the views as-is. Nothing is
/// validated beyond its presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider name (e.g. "github")
    pub provider: String,
    /// Provider-side user id
    pub id: String,
    /// Login handle
    pub username: String,
    /// Display name, if the user set one
    pub display_name: Option<String>,
    /// Public profile page
    pub profile_url: Option<String>,
    pub avatar_url: Option<String>,
    /// Public email, if the user exposes one
    pub email: Option<String>,
}

impl UserProfile {
    /// Display name, falling back to the login handle
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
