//! HTTP API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Health check
//! POST /api/query               - Run a query
//! POST /api/mutation            - Run a mutation
//! GET  /api/subscribe?path=&args= - Live query results as server-sent events
//! ```
//!
//! Callers authenticate with `Authorization: Bearer <session token>`;
//! without one, calls are anonymous.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Query, State, rejection::JsonRejection},
    http::{HeaderMap, header, request::Parts},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use alexandria_core::{FunctionCall, FunctionPath, FunctionResult};

use crate::backend::Backend;
use crate::context::FunctionContext;
use crate::error::{ApiError, FunctionError};
use crate::subscriptions::QueryValue;

/// The full application: API routes, health check, request tracing.
pub fn app(backend: Backend) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}

/// Function call routes.
pub fn api_routes() -> Router<Backend> {
    Router::new()
        .route("/api/query", post(query))
        .route("/api/mutation", post(mutation))
        .route("/api/subscribe", get(subscribe))
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Extractor for the authenticated (or anonymous) caller.
pub struct Caller(pub FunctionContext);

impl FromRequestParts<Backend> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, backend: &Backend) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers);
        Ok(Self(backend.authenticate(token).await?))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn parse_call(payload: Result<Json<FunctionCall>, JsonRejection>) -> Result<FunctionCall, ApiError> {
    payload
        .map(|Json(call)| call)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

#[instrument(skip_all)]
async fn query(
    State(backend): State<Backend>,
    Caller(ctx): Caller,
    payload: Result<Json<FunctionCall>, JsonRejection>,
) -> Result<Json<FunctionResult>, ApiError> {
    let call = parse_call(payload)?;
    let value = backend.query(ctx, &call.path, call.args).await?;
    Ok(Json(FunctionResult::success(value)))
}

#[instrument(skip_all)]
async fn mutation(
    State(backend): State<Backend>,
    Caller(ctx): Caller,
    payload: Result<Json<FunctionCall>, JsonRejection>,
) -> Result<Json<FunctionResult>, ApiError> {
    let call = parse_call(payload)?;
    let value = backend.mutation(ctx, &call.path, call.args).await?;
    Ok(Json(FunctionResult::success(value)))
}

#[derive(Debug, Deserialize)]
struct SubscribeParams {
    path: String,
    /// JSON-encoded arguments object.
    args: Option<String>,
}

#[instrument(skip_all)]
async fn subscribe(
    State(backend): State<Backend>,
    Caller(ctx): Caller,
    Query(params): Query<SubscribeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let path = FunctionPath::parse(&params.path).map_err(FunctionError::from)?;
    let args = match params.args.as_deref() {
        Some(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|e| ApiError::BadRequest(format!("args is not valid JSON: {e}")))?,
        None => Value::Object(serde_json::Map::new()),
    };

    let subscription = backend.subscribe(ctx, &path, args).await?;
    Ok(Sse::new(events(subscription.into_stream())).keep_alive(KeepAlive::default()))
}

fn events(
    values: impl Stream<Item = QueryValue> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    values.map(|value| {
        let envelope = match value {
            Ok(value) => FunctionResult::success(value),
            Err(message) => FunctionResult::error(message),
        };
        // Envelopes are plain JSON values and always serialize
        let data = serde_json::to_string(&envelope).unwrap_or_default();
        Ok(Event::default().data(data))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use jsonwebtoken::jwk::JwkSet;
    use serde_json::json;
    use tower::ServiceExt;

    use alexandria_identity::{JwksCache, SessionVerifier};

    use super::*;
    use crate::config::BackendConfig;
    use crate::functions;

    fn backend() -> Backend {
        Backend::from_config(&BackendConfig::default()).unwrap()
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(backend())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_query_success_envelope() {
        let (status, body) = post_json(
            app(backend()),
            "/api/query",
            json!({"path": "example:getExample", "args": {}, "format": "json"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "success", "value": {"message": "Hello from Convex!"}, "logLines": []})
        );
    }

    #[tokio::test]
    async fn test_mutation_with_dotted_path() {
        let (status, body) = post_json(
            app(backend()),
            "/api/mutation",
            json!({"path": "example.createExample", "args": {"text": "Hello from dashboard!"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], json!({"success": true, "text": "Hello from dashboard!"}));
    }

    #[tokio::test]
    async fn test_invalid_args_rejected() {
        let (status, body) = post_json(
            app(backend()),
            "/api/mutation",
            json!({"path": "example:createExample", "args": {"text": 1}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(
            body["errorMessage"]
                .as_str()
                .unwrap()
                .starts_with("ArgumentValidationError")
        );
    }

    #[tokio::test]
    async fn test_unknown_function_is_404() {
        let (status, body) = post_json(
            app(backend()),
            "/api/query",
            json!({"path": "example:missing"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_mutation_via_query_endpoint_is_400() {
        let (status, _) = post_json(
            app(backend()),
            "/api/query",
            json!({"path": "example:createExample", "args": {"text": "x"}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400_envelope() {
        let (status, body) = post_json(app(backend()), "/api/query", json!({"path": "nocolon"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_invalid_token_is_401() {
        let keys: JwkSet = serde_json::from_value(json!({"keys": []})).unwrap();
        let verifier = SessionVerifier::new(
            "https://clerk.example.com".to_owned(),
            JwksCache::fixed(keys),
            vec![],
        );
        let backend = Backend::new(functions::registry().unwrap(), Some(verifier));

        let response = app(backend)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/query")
                    .header("content-type", "application/json")
                    .header("authorization", "Bearer not.a.jwt")
                    .body(Body::from(json!({"path": "auth:currentUser"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_current_user_is_null() {
        let (status, body) =
            post_json(app(backend()), "/api/query", json!({"path": "auth:currentUser"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], Value::Null);
    }

    #[tokio::test]
    async fn test_subscribe_streams_first_value() {
        let response = app(backend())
            .oneshot(
                Request::builder()
                    .uri("/api/subscribe?path=example:getExample&args=%7B%7D")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.starts_with("data: "));
        assert!(text.contains(r#""message":"Hello from Convex!""#));
    }

    #[tokio::test]
    async fn test_subscribe_rejects_bad_args_json() {
        let response = app(backend())
            .oneshot(
                Request::builder()
                    .uri("/api/subscribe?path=example:getExample&args=%7B")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
