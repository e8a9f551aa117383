//! Backend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BACKEND_HOST` - Bind address (default: 127.0.0.1)
//! - `BACKEND_PORT` - Listen port (default: 3210)
//! - `CLERK_PUBLISHABLE_KEY` - Enables session token verification for callers
//! - `CLERK_AUTHORIZED_PARTIES` - Comma-separated origins allowed in `azp`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use alexandria_identity::{ClerkConfig, PublishableKey};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Identity provider used to verify callers. Without it every call is
    /// anonymous.
    pub clerk: Option<ClerkConfig>,
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3210,
            clerk: None,
            sentry: SentryConfig::default(),
        }
    }
}

impl BackendConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env
            .or_default("BACKEND_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("BACKEND_PORT", "3210")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_PORT".to_string(), e.to_string()))?;

        let clerk = match env.optional("CLERK_PUBLISHABLE_KEY") {
            Some(raw) => {
                let key = PublishableKey::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("CLERK_PUBLISHABLE_KEY".to_string(), e.to_string())
                })?;
                let mut clerk = ClerkConfig::new(key);
                clerk.authorized_parties = env.list("CLERK_AUTHORIZED_PARTIES");
                Some(clerk)
            }
            None => None,
        };

        Ok(Self {
            host,
            port,
            clerk,
            sentry: SentryConfig::from_env(&env)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SentryConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: env.optional("SENTRY_DSN"),
            environment: env.optional("SENTRY_ENVIRONMENT"),
            sample_rate: env.rate("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: env.rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a comma-separated list.
    fn list(&self, key: &str) -> Vec<String> {
        self.optional(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get a sample rate in `0.0..=1.0`.
    fn rate(&self, key: &str, default: f32) -> Result<f32, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        let rate = raw
            .parse::<f32>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be between 0.0 and 1.0 (got {rate})"),
            ));
        }
        Ok(rate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BackendConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        BackendConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3210");
        assert!(config.clerk.is_none());
        assert_eq!(config.sentry, SentryConfig::default());
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("BACKEND_PORT", "not-a-port")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(var, _) if var == "BACKEND_PORT"));
    }

    #[test]
    fn test_clerk_enabled_by_publishable_key() {
        let config = load(&[
            ("CLERK_PUBLISHABLE_KEY", "pk_test_Y2xlcmsuZXhhbXBsZS5jb20k"),
            ("CLERK_AUTHORIZED_PARTIES", "http://localhost:3000, https://alexandria.dev,"),
        ])
        .unwrap();
        let clerk = config.clerk.unwrap();
        assert_eq!(clerk.publishable_key.frontend_api(), "clerk.example.com");
        assert_eq!(
            clerk.authorized_parties,
            vec!["http://localhost:3000", "https://alexandria.dev"]
        );
    }

    #[test]
    fn test_invalid_publishable_key() {
        let err = load(&[("CLERK_PUBLISHABLE_KEY", "pk_nope")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(var, _) if var == "CLERK_PUBLISHABLE_KEY"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = load(&[("CLERK_PUBLISHABLE_KEY", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert!(config.clerk.is_none());
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_sample_rate_range() {
        let config = load(&[("SENTRY_TRACES_SAMPLE_RATE", "0.25")]).unwrap();
        assert!((config.sentry.traces_sample_rate - 0.25).abs() < f32::EPSILON);

        assert!(load(&[("SENTRY_SAMPLE_RATE", "1.5")]).is_err());
    }
}
