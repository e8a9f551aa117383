//! Publishable key decoding.
//!
//! A publishable key looks like `pk_test_Y2xlcmsuZXhhbXBsZS5jb20k`: an
//! instance-type prefix followed by the base64 encoding of the instance's
//! frontend API host terminated by `$`.

use core::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;

use crate::IdentityError;

/// Kind of provider instance a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    Development,
    Production,
}

/// A decoded publishable key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishableKey {
    raw: String,
    instance: InstanceType,
    frontend_api: String,
}

impl PublishableKey {
    /// Decode a publishable key.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidPublishableKey`] if the prefix is
    /// unknown, the payload is not base64, or the decoded host is empty or
    /// not `$`-terminated.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let raw = raw.trim();
        let (instance, encoded) = if let Some(rest) = raw.strip_prefix("pk_test_") {
            (InstanceType::Development, rest)
        } else if let Some(rest) = raw.strip_prefix("pk_live_") {
            (InstanceType::Production, rest)
        } else {
            return Err(IdentityError::InvalidPublishableKey(
                "expected a pk_test_ or pk_live_ prefix".to_owned(),
            ));
        };

        let decoded = STANDARD_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|e| IdentityError::InvalidPublishableKey(e.to_string()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|e| IdentityError::InvalidPublishableKey(e.to_string()))?;

        let frontend_api = decoded.strip_suffix('$').ok_or_else(|| {
            IdentityError::InvalidPublishableKey("decoded host is not $-terminated".to_owned())
        })?;

        if frontend_api.is_empty() || frontend_api.contains(['/', ' ', '$']) {
            return Err(IdentityError::InvalidPublishableKey(format!(
                "'{frontend_api}' is not a host name"
            )));
        }

        Ok(Self {
            raw: raw.to_owned(),
            instance,
            frontend_api: frontend_api.to_owned(),
        })
    }

    /// The key as given, safe to hand to the browser.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn instance(&self) -> InstanceType {
        self.instance
    }

    /// Frontend API host, e.g. `clerk.example.com`.
    #[must_use]
    pub fn frontend_api(&self) -> &str {
        &self.frontend_api
    }

    /// Token issuer for this instance (`https://{frontend_api}`).
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("https://{}", self.frontend_api)
    }

    /// JWKS location for this instance.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.frontend_api)
    }

    /// Browser script location for this instance.
    #[must_use]
    pub fn browser_script_url(&self) -> String {
        format!(
            "https://{}/npm/@clerk/clerk-js@5/dist/clerk.browser.js",
            self.frontend_api
        )
    }
}

impl fmt::Debug for PublishableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishableKey")
            .field("instance", &self.instance)
            .field("frontend_api", &self.frontend_api)
            .finish_non_exhaustive()
    }
}
