//! Identity provider configuration.

use secrecy::SecretString;
use url::Url;

use crate::PublishableKey;

/// Default location of the provider's backend API.
pub const DEFAULT_API_URL: &str = "https://api.clerk.com";

/// Identity provider configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct ClerkConfig {
    /// Public key handed to the browser; also locates the JWKS.
    pub publishable_key: PublishableKey,
    /// Backend API secret key. Without it, profiles come from token claims.
    pub secret_key: Option<SecretString>,
    /// Backend API base URL.
    pub api_url: Url,
    /// Origins allowed in the token's `azp` claim. Empty allows any.
    pub authorized_parties: Vec<String>,
}

impl ClerkConfig {
    /// Configuration with only a publishable key.
    ///
    /// # Panics
    ///
    /// Never; the default API URL is a valid constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(publishable_key: PublishableKey) -> Self {
        Self {
            publishable_key,
            secret_key: None,
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            authorized_parties: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ClerkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkConfig")
            .field("publishable_key", &self.publishable_key)
            .field(
                "secret_key",
                &self.secret_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_url", &self.api_url.as_str())
            .field("authorized_parties", &self.authorized_parties)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret_key() {
        let mut config =
            ClerkConfig::new(PublishableKey::parse("pk_test_Y2xlcmsuZXhhbXBsZS5jb20k").unwrap());
        config.secret_key = Some(SecretString::from("sk_test_super_private_value"));

        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("api.clerk.com"));
        assert!(!debug.contains("super_private_value"));
    }
}
