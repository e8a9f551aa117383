//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use alexandria_core::User;
use alexandria_identity::IdentityError;

use crate::backend::BackendError;

/// Application-level error type for the web front-end.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identity provider could not resolve the session.
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Visitor is not signed in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No route matches the request.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Identity(_) | Self::Backend(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Identity(_) | Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Identity(_) | Self::Backend(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in user.
pub fn set_sentry_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: user
                .email_addresses
                .first()
                .map(|email| email.email_address.as_str().to_owned()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("sign in required".to_string());
        assert_eq!(err.to_string(), "Unauthorized: sign in required");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Identity(IdentityError::JwksUnavailable(
                "timeout".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::Stream("closed".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }
}
