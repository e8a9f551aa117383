//! Backend call convention over HTTP.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use alexandria_integration_tests::{TestContext, claims, sign};

async fn call(ctx: &TestContext, kind: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
    let mut request = ctx.client.post(ctx.api(&format!("/api/{kind}"))).json(&body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let resp = request.send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_get_example() {
    let ctx = TestContext::start().await;
    let (status, body) = call(&ctx, "query", json!({"path": "example:getExample", "args": {}}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["value"], json!({"message": "Hello from Convex!"}));
}

#[tokio::test]
async fn test_create_example_echoes_text() {
    let ctx = TestContext::start().await;
    for text in ["Hello from dashboard!", ""] {
        let (status, body) = call(
            &ctx,
            "mutation",
            json!({"path": "example.createExample", "args": {"text": text}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], json!({"success": true, "text": text}));
    }
}

#[tokio::test]
async fn test_create_example_rejects_bad_args() {
    let ctx = TestContext::start().await;
    for args in [json!({"text": 42}), json!({}), json!({"text": "hi", "extra": true})] {
        let (status, body) = call(
            &ctx,
            "mutation",
            json!({"path": "example:createExample", "args": args}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{args}");
        assert_eq!(body["status"], "error");
    }
}

#[tokio::test]
async fn test_current_user_is_null() {
    let ctx = TestContext::start().await;
    let token = sign(&claims("user_2ada", Some("Ada"), None));
    for token in [None, Some(token.as_str())] {
        let (status, body) = call(&ctx, "query", json!({"path": "auth:currentUser"}), token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], Value::Null);
    }
}

#[tokio::test]
async fn test_unknown_function() {
    let ctx = TestContext::start().await;
    let (status, body) = call(&ctx, "query", json!({"path": "example:missing"}), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_mutation_through_query_endpoint() {
    let ctx = TestContext::start().await;
    let (status, _) = call(
        &ctx,
        "query",
        json!({"path": "example:createExample", "args": {"text": "hi"}}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let ctx = TestContext::start().await;
    let (status, body) = call(
        &ctx,
        "query",
        json!({"path": "example:getExample"}),
        Some("not-a-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}
