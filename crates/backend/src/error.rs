//! Function call errors and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use alexandria_core::{FunctionKind, FunctionPath, FunctionPathError, FunctionResult};

use crate::values::ValidationError;

/// Errors that can occur when calling a backend function.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// No function registered at this path.
    #[error("Could not find public function for '{0}'")]
    NotFound(FunctionPath),

    /// Malformed function path.
    #[error(transparent)]
    InvalidPath(#[from] FunctionPathError),

    /// A function was registered twice at the same path.
    #[error("Function '{0}' is already registered")]
    Duplicate(FunctionPath),

    /// Called through the wrong endpoint.
    #[error("Trying to execute {path} as {called}, but it is defined as {defined}")]
    WrongKind {
        path: FunctionPath,
        called: FunctionKind,
        defined: FunctionKind,
    },

    /// Arguments failed validation; the handler did not run.
    #[error("ArgumentValidationError: {0}")]
    InvalidArgs(#[from] ValidationError),

    /// Arguments passed validation but could not be decoded.
    #[error("ArgumentValidationError: {0}")]
    ArgsDecode(String),

    /// Caller presented a token that failed verification.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller's token could not be checked because the identity provider
    /// is unreachable.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    /// Handler raised an error.
    #[error("Uncaught Error: {0}")]
    Handler(String),

    /// Handler result could not be encoded.
    #[error("Failed to encode return value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl FunctionError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidPath(_)
            | Self::WrongKind { .. }
            | Self::InvalidArgs(_)
            | Self::ArgsDecode(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Duplicate(_) | Self::Handler(_) | Self::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response of the HTTP API.
///
/// Always answers with the call convention's error envelope so clients can
/// parse failures the same way as results.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Function(#[from] FunctionError),

    /// Request body or query string is malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Function(err) => err.status(),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Function call failed"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Function call rejected");
        }

        // Handler internals stay server-side
        let message = match &self {
            Self::Function(FunctionError::Duplicate(_) | FunctionError::Encode(_)) => {
                "Server Error".to_owned()
            }
            Self::Function(FunctionError::Unavailable(_)) => "Service Unavailable".to_owned(),
            _ => self.to_string(),
        };

        (status, Json(FunctionResult::error(message))).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn path(raw: &str) -> FunctionPath {
        FunctionPath::parse(raw).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FunctionError::NotFound(path("example:nope")).to_string(),
            "Could not find public function for 'example:nope'"
        );
        assert_eq!(
            FunctionError::WrongKind {
                path: path("example:createExample"),
                called: FunctionKind::Query,
                defined: FunctionKind::Mutation,
            }
            .to_string(),
            "Trying to execute example:createExample as query, but it is defined as mutation"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            FunctionError::NotFound(path("a:b")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FunctionError::ArgsDecode("x".to_owned()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FunctionError::Unauthenticated("x".to_owned()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FunctionError::Handler("x".to_owned()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FunctionError::Unavailable("x".to_owned()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError::BadRequest("bad".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(FunctionError::NotFound(path("a:b"))).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unavailable_hides_provider_detail() {
        use http_body_util::BodyExt;

        let err = FunctionError::Unavailable(
            "JWKS unavailable: error sending request for url (https://clerk.internal/jwks)"
                .to_owned(),
        );
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["errorMessage"], "Service Unavailable");
        assert!(!String::from_utf8_lossy(&body).contains("clerk.internal"));
    }
}
