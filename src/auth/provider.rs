//! OAuth provider abstraction
//!
//! A provider knows how to start a handshake (build the authorize URL)
//! and how to finish it (turn an authorization code into a profile).
//! Routes only talk to providers through this trait, so tests can swap
//! in a mock without any network access.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::async_trait;
use serde::Serialize;
use url::Url;

use super::profile::UserProfile;
use crate::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Path segment used in `/auth/{provider}`
    fn name(&self) -> &'static str;

    /// Human readable name for the login page
    fn display_name(&self) -> &'static str;

    /// URL the browser is sent to in order to begin the handshake
    fn authorization_url(&self, state: &str) -> Result<Url, AppError>;

    /// Complete the handshake: exchange `code` and fetch the user's profile
    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AppError>;
}

/// Login page entry for one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderLink {
    pub name: &'static str,
    pub display_name: &'static str,
}

/// Providers reachable through `/auth/{provider}`
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Arc<dyn OAuthProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn OAuthProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn OAuthProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn links(&self) -> Vec<ProviderLink> {
        self.providers
            .values()
            .map(|provider| ProviderLink {
                name: provider.name(),
                display_name: provider.display_name(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock(name: &'static str, display_name: &'static str) -> Arc<dyn OAuthProvider> {
        let mut provider = MockOAuthProvider::new();
        provider.expect_name().return_const(name);
        provider.expect_display_name().return_const(display_name);
        Arc::new(provider)
    }

    #[test]
    fn registry_looks_up_by_name() {
        let registry = ProviderRegistry::new().with(mock("github", "GitHub"));

        assert!(registry.get("github").is_some());
        assert!(registry.get("gitlab").is_none());
        assert!(!registry.is_empty());
    }

    #[test]
    fn links_are_sorted_by_name() {
        let registry = ProviderRegistry::new()
            .with(mock("gitlab", "GitLab"))
            .with(mock("github", "GitHub"));

        let names: Vec<&str> = registry.links().iter().map(|link| link.name).collect();
        assert_eq!(names, vec!["github", "gitlab"]);
    }
}
