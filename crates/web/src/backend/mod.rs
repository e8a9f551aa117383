//! Backend client.
//!
//! [`BackendClient`] is the seam route handlers depend on. Two
//! implementations exist:
//!
//! - [`HttpBackendClient`] - talks to a backend over the HTTP call convention
//! - [`LocalBackend`] - calls an in-process [`alexandria_backend::Backend`]
//!
//! The typed helpers in [`api`] wrap the calls the pages make.

pub mod api;
mod http;
mod local;

pub use http::HttpBackendClient;
pub use local::LocalBackend;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

use alexandria_core::{FunctionPath, FunctionPathError};

/// Live results of a subscribed query.
pub type QueryStream = BoxStream<'static, Result<Value, BackendError>>;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The function call failed. `status` is the HTTP status when known.
    #[error("Function error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Function { status: Option<u16>, message: String },

    /// Response could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid backend URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Malformed function path.
    #[error("Invalid function path: {0}")]
    Path(#[from] FunctionPathError),

    /// Subscription stream broke.
    #[error("Stream error: {0}")]
    Stream(String),
}

/// Calls backend functions on behalf of a visitor.
///
/// `token` is the visitor's verified session token, forwarded so the backend
/// can establish the caller. `None` makes an anonymous call.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Run a query.
    async fn query(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError>;

    /// Run a mutation.
    async fn mutation(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError>;

    /// Subscribe to a query. The stream yields the current result first,
    /// then every change, and ends when the backend closes it.
    async fn subscribe(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<QueryStream, BackendError>;
}
