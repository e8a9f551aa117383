//! Web front-end configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALEXANDRIA_BACKEND_URL` - Backend API base URL (fallbacks: `CONVEX_URL`,
//!   `VITE_CONVEX_URL`)
//! - `CLERK_PUBLISHABLE_KEY` - Identity provider publishable key (fallback:
//!   `VITE_CLERK_PUBLISHABLE_KEY`)
//!
//! ## Optional
//! - `WEB_HOST` - Bind address (default: 127.0.0.1)
//! - `WEB_PORT` - Listen port (default: 3000)
//! - `CLERK_SECRET_KEY` - Backend API key; enables full profile lookup
//! - `CLERK_API_URL` - Backend API base URL (default: `https://api.clerk.com`)
//! - `CLERK_AUTHORIZED_PARTIES` - Comma-separated origins allowed in `azp`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use alexandria_identity::{ClerkConfig, PublishableKey};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Web front-end configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the backend API
    pub backend_url: Url,
    /// Identity provider configuration
    pub clerk: ClerkConfig,
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

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the secret key fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// See [`WebConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env
            .or_default("WEB_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("WEB_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("WEB_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("WEB_PORT".to_string(), e.to_string()))?;

        let (backend_var, backend_url) = env.required_with_fallbacks(&[
            "ALEXANDRIA_BACKEND_URL",
            "CONVEX_URL",
            "VITE_CONVEX_URL",
        ])?;
        let backend_url = Url::parse(&backend_url)
            .map_err(|e| ConfigError::InvalidEnvVar(backend_var.to_string(), e.to_string()))?;

        Ok(Self {
            host,
            port,
            backend_url,
            clerk: clerk_from_env(&env)?,
            sentry: sentry_from_env(&env)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn clerk_from_env(env: &Env<'_>) -> Result<ClerkConfig, ConfigError> {
    let (key_var, raw_key) =
        env.required_with_fallbacks(&["CLERK_PUBLISHABLE_KEY", "VITE_CLERK_PUBLISHABLE_KEY"])?;
    let publishable_key = PublishableKey::parse(&raw_key)
        .map_err(|e| ConfigError::InvalidEnvVar(key_var.to_string(), e.to_string()))?;

    let mut clerk = ClerkConfig::new(publishable_key);
    clerk.secret_key = env
        .optional("CLERK_SECRET_KEY")
        .map(|secret| {
            validate_secret_strength(&secret, "CLERK_SECRET_KEY")?;
            Ok::<_, ConfigError>(SecretString::from(secret))
        })
        .transpose()?;
    if let Some(api_url) = env.optional("CLERK_API_URL") {
        clerk.api_url = Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CLERK_API_URL".to_string(), e.to_string()))?;
    }
    clerk.authorized_parties = env.list("CLERK_AUTHORIZED_PARTIES");
    Ok(clerk)
}

fn sentry_from_env(env: &Env<'_>) -> Result<SentryConfig, ConfigError> {
    Ok(SentryConfig {
        dsn: env.optional("SENTRY_DSN"),
        environment: env.optional("SENTRY_ENVIRONMENT"),
        sample_rate: env.rate("SENTRY_SAMPLE_RATE", 1.0)?,
        traces_sample_rate: env.rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
    })
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

    /// Get the first of `keys` that is set, reporting the first key if none is.
    fn required_with_fallbacks<'k>(&self, keys: &[&'k str]) -> Result<(&'k str, String), ConfigError> {
        keys.iter()
            .find_map(|key| self.optional(key).map(|value| (*key, value)))
            .ok_or_else(|| ConfigError::MissingEnvVar(keys.first().copied().unwrap_or_default().to_string()))
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

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Only the random part of `sk_test_...` / `sk_live_...` counts
    let random_part = secret
        .strip_prefix("sk_test_")
        .or_else(|| secret.strip_prefix("sk_live_"))
        .unwrap_or(secret);
    let entropy = shannon_entropy(random_part);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the identity provider."
            ),
        ));
    }

    Ok(())
}
