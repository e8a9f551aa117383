//! End-to-end page rendering across identity states.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;

use alexandria_integration_tests::{
    TestContext, claims, now, pending_session_cookies, session_cookies, sign,
};

// ============================================================================
// Home
// ============================================================================

#[tokio::test]
async fn test_home_signed_out_shows_sign_in_controls() {
    let ctx = TestContext::start().await;
    let resp = ctx.get_page("/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.text().await.unwrap();
    assert!(body.contains("Welcome to Alexandria"));
    assert!(body.contains("An AI Mobile App Builder"));
    assert!(body.contains("Sign In"));
    assert!(body.contains("Sign Up"));
    assert!(!body.contains(r#"id="user-button""#));
}

#[tokio::test]
async fn test_home_signed_in_greets_by_first_name() {
    let ctx = TestContext::start().await;
    let token = sign(&claims("user_2ada", Some("Ada"), Some("ada@example.com")));
    let body = ctx
        .get_page("/", Some(&session_cookies(&token)))
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains("Welcome, Ada!"));
    assert!(body.contains(r#"id="user-button""#));
    assert!(!body.contains("data-sign-in"));
}

#[tokio::test]
async fn test_home_signed_in_greets_by_email_without_first_name() {
    let ctx = TestContext::start().await;
    let token = sign(&claims("user_2ada", None, Some("ada@example.com")));
    let body = ctx
        .get_page("/", Some(&session_cookies(&token)))
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains("Welcome, ada@example.com!"));
}

#[tokio::test]
async fn test_home_loading_shows_sign_in_controls() {
    let ctx = TestContext::start().await;
    let body = ctx
        .get_page("/", Some(&pending_session_cookies()))
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains("data-sign-in"));
    assert!(body.contains(r#"data-identity="loading""#));
}

// ============================================================================
// About
// ============================================================================

#[tokio::test]
async fn test_about_is_static() {
    let ctx = TestContext::start().await;
    let body = ctx.get_page("/about", None).await.text().await.unwrap();
    assert!(body.contains("About Alexandria"));
    assert!(body.contains(
        "Alexandria is an AI-powered mobile app builder built with modern web technologies."
    ));
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn test_dashboard_signed_out() {
    let ctx = TestContext::start().await;
    let body = ctx.get_page("/dashboard", None).await.text().await.unwrap();
    assert!(body.contains("Please sign in to access the dashboard."));
    assert!(!body.contains("Loading..."));
    assert!(!body.contains("Test Convex Mutation"));
}

#[tokio::test]
async fn test_dashboard_loading_while_session_pending() {
    let ctx = TestContext::start().await;
    let body = ctx
        .get_page("/dashboard", Some(&pending_session_cookies()))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Loading..."));
    assert!(!body.contains("Please sign in"));
}

#[tokio::test]
async fn test_dashboard_loading_when_token_older_than_client() {
    let ctx = TestContext::start().await;
    let mut stale = claims("user_2ada", Some("Ada"), None);
    stale.iat = Some(now() - 120);
    let token = sign(&stale);
    let cookies = format!("__session={token}; __client_uat={}", now());

    let body = ctx
        .get_page("/dashboard", Some(&cookies))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Loading..."));
}

#[tokio::test]
async fn test_dashboard_expired_token_without_client_is_signed_out() {
    let ctx = TestContext::start().await;
    let mut expired = claims("user_2ada", Some("Ada"), None);
    expired.exp = now() - 600;
    let token = sign(&expired);

    let body = ctx
        .get_page("/dashboard", Some(&format!("__session={token}")))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Please sign in to access the dashboard."));
}

#[tokio::test]
async fn test_dashboard_signed_in_shows_query_result() {
    let ctx = TestContext::start().await;
    let token = sign(&claims("user_2ada", Some("Ada"), None));
    let body = ctx
        .get_page("/dashboard", Some(&session_cookies(&token)))
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains("Welcome, Ada!"));
    assert!(body.contains("Hello from Convex!"));
    assert!(body.contains("Test Convex Mutation"));
}

#[tokio::test]
async fn test_dashboard_mutation_is_fire_and_forget() {
    let ctx = TestContext::start().await;
    let token = sign(&claims("user_2ada", Some("Ada"), None));

    let resp = ctx
        .client
        .post(ctx.page("/dashboard/example"))
        .header(reqwest::header::COOKIE, session_cookies(&token))
        .header("x-requested-with", "fetch")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_mutation_requires_sign_in() {
    let ctx = TestContext::start().await;
    let resp = ctx
        .client
        .post(ctx.page("/dashboard/example"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Headers
// ============================================================================

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let ctx = TestContext::start().await;
    for path in ["/", "/about", "/dashboard"] {
        let resp = ctx.get_page(path, None).await;
        let headers = resp.headers();
        assert!(headers.contains_key("content-security-policy"), "{path}");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(headers.contains_key("x-request-id"), "{path}");
    }
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let ctx = TestContext::start().await;
    let body = ctx.get_page("/", None).await.text().await.unwrap();

    let href = body
        .split(r#"href="/static/css/derived/"#)
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap();
    let resp = ctx
        .get_page(&format!("/static/css/derived/{href}"), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains(".nav"));
}
