//! Identity resolution for incoming requests.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use alexandria_core::{IdentityState, User};

use crate::{ClerkConfig, IdentityError, SessionVerifier, UserDirectory};

/// Provider cookies relevant to identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    /// Raw `__session` token.
    pub session_token: Option<String>,
    /// `__client_uat` as unix seconds; `0` or absent when signed out.
    pub client_uat: Option<u64>,
}

impl SessionCookies {
    /// Cookie holding the short-lived session token.
    pub const SESSION: &'static str = "__session";
    /// Cookie holding the client's last-updated-at timestamp.
    pub const CLIENT_UAT: &'static str = "__client_uat";

    /// Build from raw cookie values. An unparseable `__client_uat` counts as
    /// absent.
    #[must_use]
    pub fn new(session_token: Option<&str>, client_uat: Option<&str>) -> Self {
        Self {
            session_token: session_token
                .filter(|token| !token.is_empty())
                .map(str::to_owned),
            client_uat: client_uat.and_then(|raw| raw.trim().parse().ok()),
        }
    }

    /// Whether the browser holds a signed-in client session.
    #[must_use]
    pub fn has_client_session(&self) -> bool {
        self.client_uat.is_some_and(|uat| uat > 0)
    }

    fn unresolved(&self) -> ResolvedSession {
        if self.has_client_session() {
            ResolvedSession::loading()
        } else {
            ResolvedSession::signed_out()
        }
    }
}

/// Outcome of resolving a request's identity.
///
/// Carries the verified session token alongside the state so it can be
/// forwarded to the backend on the user's behalf.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub state: IdentityState,
    token: Option<SecretString>,
}

impl ResolvedSession {
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            state: IdentityState::Loading,
            token: None,
        }
    }

    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            state: IdentityState::SignedOut,
            token: None,
        }
    }

    #[must_use]
    pub fn signed_in(user: User, token: Option<SecretString>) -> Self {
        Self {
            state: IdentityState::SignedIn(user),
            token,
        }
    }

    /// The verified session token, for forwarding as a bearer token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|token| token.expose_secret())
    }
}

/// Resolves the visitor behind a request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the identity state from the request's provider cookies.
    ///
    /// # Errors
    ///
    /// Returns an error only when the provider itself fails (keys or
    /// profiles unreachable). Bad or expired tokens resolve to
    /// `SignedOut` or `Loading`.
    async fn resolve(&self, cookies: &SessionCookies) -> Result<ResolvedSession, IdentityError>;
}

/// Identity provider backed by the hosted identity service.
#[derive(Clone)]
pub struct ClerkIdentityProvider {
    verifier: SessionVerifier,
    users: Option<UserDirectory>,
}

impl ClerkIdentityProvider {
    #[must_use]
    pub const fn new(verifier: SessionVerifier, users: Option<UserDirectory>) -> Self {
        Self { verifier, users }
    }

    /// Build from configuration. Profiles are looked up through the backend
    /// API only when a secret key is configured.
    #[must_use]
    pub fn from_config(config: &ClerkConfig) -> Self {
        let client = reqwest::Client::new();
        let users = config.secret_key.as_ref().map(|secret| {
            UserDirectory::new(client.clone(), config.api_url.clone(), secret.clone())
        });
        Self::new(SessionVerifier::from_config(config, client), users)
    }

    async fn user_for(&self, token: &str, cookies: &SessionCookies) -> Result<Option<User>, IdentityError> {
        let claims = self.verifier.verify(token).await?;

        // Browser updated its client after this token was minted.
        if let (Some(uat), Some(iat)) = (cookies.client_uat, claims.iat)
            && uat > iat
        {
            debug!(uat, iat, "Session token older than client, needs refresh");
            return Ok(None);
        }

        let user = match &self.users {
            Some(directory) => directory.get(&claims.user_id()?).await?,
            None => claims.to_user()?,
        };
        Ok(Some(user))
    }
}

#[async_trait]
impl IdentityProvider for ClerkIdentityProvider {
    #[instrument(skip_all, fields(has_token = cookies.session_token.is_some()))]
    async fn resolve(&self, cookies: &SessionCookies) -> Result<ResolvedSession, IdentityError> {
        let Some(token) = cookies.session_token.as_deref() else {
            return Ok(cookies.unresolved());
        };

        match self.user_for(token, cookies).await {
            Ok(Some(user)) => Ok(ResolvedSession::signed_in(
                user,
                Some(SecretString::from(token.to_owned())),
            )),
            Ok(None) => Ok(ResolvedSession::loading()),
            Err(e) if e.is_token_error() => {
                debug!(error = %e, "Session token rejected");
                Ok(cookies.unresolved())
            }
            Err(e) => Err(e),
        }
    }
}

/// Identity provider that always answers with the same state.
///
/// For offline development and tests, where no provider instance exists.
#[derive(Debug, Clone)]
pub struct FixedIdentityProvider {
    state: IdentityState,
    token: Option<String>,
}

impl FixedIdentityProvider {
    #[must_use]
    pub const fn new(state: IdentityState) -> Self {
        Self { state, token: None }
    }

    /// Also hand out `token` as the session token when signed in.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentityProvider {
    async fn resolve(&self, _cookies: &SessionCookies) -> Result<ResolvedSession, IdentityError> {
        Ok(match &self.state {
            IdentityState::SignedIn(user) => ResolvedSession::signed_in(
                user.clone(),
                self.token.clone().map(SecretString::from),
            ),
            IdentityState::Loading => ResolvedSession::loading(),
            IdentityState::SignedOut => ResolvedSession::signed_out(),
        })
    }
}
