//! Session token verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};

use alexandria_core::{Email, EmailAddress, SessionId, User, UserId};

use crate::{ClerkConfig, IdentityError, JwksCache};

/// Clock skew tolerated on `exp`/`nbf`, in seconds.
const LEEWAY_SECS: u64 = 5;

/// Claims of a verified session token.
///
/// `first_name` and `email` are not part of the default token; they are
/// present when the instance's session token template adds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub nbf: Option<u64>,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SessionClaims {
    /// The token subject as a user ID.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidClaim`] if `sub` is not a user ID.
    pub fn user_id(&self) -> Result<UserId, IdentityError> {
        UserId::parse(&self.sub).map_err(|e| IdentityError::InvalidClaim {
            claim: "sub",
            message: e.to_string(),
        })
    }

    /// The session ID, if the token carries a valid one.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.sid.as_deref().and_then(|sid| SessionId::parse(sid).ok())
    }

    /// Stable identifier of the caller across issuers (`{iss}|{sub}`).
    #[must_use]
    pub fn token_identifier(&self) -> String {
        format!("{}|{}", self.iss, self.sub)
    }

    /// Build a profile from the token alone.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidClaim`] if `sub` is not a user ID.
    pub fn to_user(&self) -> Result<User, IdentityError> {
        let email_addresses = self
            .email
            .as_deref()
            .and_then(|raw| match Email::parse(raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring malformed email claim");
                    None
                }
            })
            .map(EmailAddress::new)
            .into_iter()
            .collect();

        Ok(User {
            id: self.user_id()?,
            first_name: self.first_name.clone(),
            email_addresses,
        })
    }
}

/// Verifies session tokens issued by one provider instance.
#[derive(Clone)]
pub struct SessionVerifier {
    issuer: String,
    keys: JwksCache,
    authorized_parties: Vec<String>,
}

impl SessionVerifier {
    #[must_use]
    pub const fn new(issuer: String, keys: JwksCache, authorized_parties: Vec<String>) -> Self {
        Self {
            issuer,
            keys,
            authorized_parties,
        }
    }

    /// Verifier for the instance named by the configured publishable key.
    #[must_use]
    pub fn from_config(config: &ClerkConfig, client: reqwest::Client) -> Self {
        let key = &config.publishable_key;
        Self::new(
            key.issuer(),
            JwksCache::remote(client, key.jwks_url()),
            config.authorized_parties.clone(),
        )
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify a session token and return its claims.
    ///
    /// Checks the RS256 signature against the JWKS, `exp`/`nbf` with a small
    /// leeway, the issuer, and `azp` when authorized parties are configured.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::TokenExpired`] for expired tokens and another
    /// token error for anything else that fails verification.
    pub async fn verify(&self, token: &str) -> Result<SessionClaims, IdentityError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or_else(|| IdentityError::InvalidClaim {
            claim: "kid",
            message: "token header has no key ID".to_owned(),
        })?;
        let key = self.keys.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = LEEWAY_SECS;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::InvalidToken(e),
            })?
            .claims;

        if !self.authorized_parties.is_empty() {
            match claims.azp.as_deref() {
                Some(azp) if self.authorized_parties.iter().any(|p| p == azp) => {}
                other => {
                    return Err(IdentityError::UnauthorizedParty(
                        other.unwrap_or("<none>").to_owned(),
                    ));
                }
            }
        }

        Ok(claims)
    }
}
