//! HTTP route handlers for the web front-end.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                    - Home page
//! GET  /about               - About page
//! GET  /dashboard           - Dashboard (loading, access denied, or content)
//! POST /dashboard/example   - Run the example mutation (signed in)
//! GET  /dashboard/updates   - Live example query result, as SSE (signed in)
//! GET  /health              - Health check
//! GET  /static/*            - Static assets
//! *                         - 404
//! ```

pub mod about;
pub mod dashboard;
pub mod home;
pub mod layout;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response, Uri},
    middleware,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{csp_nonce_middleware, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Directory holding `static/css` and `static/js`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/example", post(dashboard::create_example))
        .route("/updates", get(dashboard::updates))
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/about", get(about::about))
        .nest("/dashboard", dashboard_routes())
}

/// Build the full application: pages, health check, static assets, and the
/// middleware stack. Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(middleware::from_fn(csp_nonce_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_owned())
}
