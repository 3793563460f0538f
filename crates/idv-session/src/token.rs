//! Token providers.

use idv_core::{BearerToken, TokenProvider};

/// Environment variable read by [`EnvTokenProvider::default`].
pub const DEFAULT_TOKEN_VAR: &str = "IDV_TOKEN";

/// Provider returning a fixed token, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<BearerToken>,
}

impl StaticTokenProvider {
    /// Blank input yields a provider with no token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            token: BearerToken::new(raw),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl From<Option<BearerToken>> for StaticTokenProvider {
    fn from(token: Option<BearerToken>) -> Self {
        Self { token }
    }
}

impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Option<BearerToken> {
        self.token.clone()
    }
}

/// Provider reading an environment variable at each call, so a token
/// stored after construction is still seen.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_VAR)
    }
}

impl TokenProvider for EnvTokenProvider {
    async fn token(&self) -> Option<BearerToken> {
        std::env::var(&self.var).ok().and_then(BearerToken::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_its_token() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.token().await.unwrap().as_str(), "abc");
        assert!(StaticTokenProvider::new("   ").token().await.is_none());
        assert!(StaticTokenProvider::none().token().await.is_none());
    }

    #[tokio::test]
    async fn env_provider_reads_at_call_time() {
        let provider = EnvTokenProvider::new("IDV_TEST_TOKEN_PROVIDER_VAR");
        std::env::remove_var("IDV_TEST_TOKEN_PROVIDER_VAR");
        assert!(provider.token().await.is_none());

        std::env::set_var("IDV_TEST_TOKEN_PROVIDER_VAR", "late-token");
        let token = provider.token().await;
        std::env::remove_var("IDV_TEST_TOKEN_PROVIDER_VAR");
        assert_eq!(token.unwrap().as_str(), "late-token");
    }

    #[test]
    fn static_provider_debug_hides_token() {
        let provider = StaticTokenProvider::new("secret-value");
        assert!(!format!("{provider:?}").contains("secret-value"));
    }
}
