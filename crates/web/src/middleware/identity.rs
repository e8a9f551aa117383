//! Identity extractors.
//!
//! Resolve the visitor from the identity provider's cookies on each request.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use tracing::Span;

use alexandria_core::User;
use alexandria_identity::{ResolvedSession, SessionCookies};

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// The visitor's resolved identity.
///
/// Rejects with a 502 only when the provider itself fails; bad or expired
/// tokens resolve to `SignedOut` or `Loading`.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     match session.state.user() {
///         Some(user) => format!("Hello, {}!", user.id),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct CurrentSession(pub ResolvedSession);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state.identity().resolve(&session_cookies(parts)).await?;
        record_user(&session);
        Ok(Self(session))
    }
}

/// The visitor's identity for pages that render without one.
///
/// Never rejects. A provider failure is reported to Sentry and the page
/// renders with the identity still loading, so the browser SDK can take
/// over.
pub struct OptionalSession(pub ResolvedSession);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match state.identity().resolve(&session_cookies(parts)).await {
            Ok(session) => {
                record_user(&session);
                Ok(Self(session))
            }
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    "Identity provider failed, rendering as loading"
                );
                Ok(Self(ResolvedSession::loading()))
            }
        }
    }
}

fn session_cookies(parts: &Parts) -> SessionCookies {
    let jar = CookieJar::from_headers(&parts.headers);
    SessionCookies::new(
        jar.get(SessionCookies::SESSION).map(|c| c.value()),
        jar.get(SessionCookies::CLIENT_UAT).map(|c| c.value()),
    )
}

fn record_user(session: &ResolvedSession) {
    if let Some(user) = session.state.user() {
        Span::current().record("user_id", user.id.as_str());
        set_sentry_user(user);
    }
}

/// A signed-in visitor and the session token to act on their behalf.
///
/// Rejects with 401 when nobody is signed in, including while the identity
/// is still loading.
pub struct RequireUser {
    pub user: User,
    pub token: Option<String>,
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        let token = session.token().map(str::to_owned);
        match session.state.user() {
            Some(user) => Ok(Self {
                user: user.clone(),
                token,
            }),
            None => Err(AppError::Unauthorized("sign in required".to_string())),
        }
    }
}
