//! Identity error types.

use thiserror::Error;

/// Errors that can occur while resolving an identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Publishable key is malformed.
    #[error("invalid publishable key: {0}")]
    InvalidPublishableKey(String),

    /// Session token could not be decoded or failed verification.
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// Session token has expired.
    #[error("session token expired")]
    TokenExpired,

    /// Token signed by a key the JWKS does not contain.
    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    /// Token's `azp` claim is not an authorized party.
    #[error("unauthorized party: {0}")]
    UnauthorizedParty(String),

    /// Token claims could not be turned into a user.
    #[error("invalid claim '{claim}': {message}")]
    InvalidClaim {
        claim: &'static str,
        message: String,
    },

    /// Signing keys could not be fetched.
    #[error("JWKS unavailable: {0}")]
    JwksUnavailable(String),

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status.
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Provider response could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl IdentityError {
    /// Whether the error is about the token itself rather than the provider.
    ///
    /// Token errors mean "not signed in"; the rest mean the provider could
    /// not be reached or misbehaved.
    #[must_use]
    pub const fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken(_)
                | Self::TokenExpired
                | Self::UnknownKey(_)
                | Self::UnauthorizedParty(_)
                | Self::InvalidClaim { .. }
        )
    }
}
