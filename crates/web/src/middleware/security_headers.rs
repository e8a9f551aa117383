//! Security headers middleware.
//!
//! Adds restrictive security headers to all responses. The CSP is locked
//! down to this origin plus what the identity provider's browser script
//! needs: its frontend API, avatar images, and bot-protection challenge
//! frames.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::middleware::CspNonce;
use crate::state::AppState;

const IMAGE_HOST: &str = "https://img.clerk.com";
const CHALLENGE_HOST: &str = "https://challenges.cloudflare.com";

/// Build the CSP for a page carrying `nonce`.
#[must_use]
pub fn content_security_policy(nonce: &str, frontend_api: &str) -> String {
    format!(
        "default-src 'self'; \
         script-src 'self' 'nonce-{nonce}' https://{frontend_api} {CHALLENGE_HOST}; \
         style-src 'self' 'unsafe-inline'; \
         font-src 'self'; \
         img-src 'self' data: {IMAGE_HOST}; \
         connect-src 'self' https://{frontend_api}; \
         worker-src 'self' blob:; \
         frame-src {CHALLENGE_HOST}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `Content-Security-Policy` - see [`content_security_policy`]
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Permissions-Policy` - deny sensitive features
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` - the provider's
///   OAuth flows open popups
/// - `Cache-Control: no-store` on pages, which render per-visitor content
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request
        .extensions()
        .get::<CspNonce>()
        .map(|nonce| nonce.value().to_owned())
        .unwrap_or_default();
    let is_static = request.uri().path().starts_with("/static/");

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    let csp = content_security_policy(
        &nonce,
        state.config().clerk.publishable_key.frontend_api(),
    );
    match HeaderValue::from_str(&csp) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid Content-Security-Policy header"),
    }

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(), \
             usb=()",
        ),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    if is_static {
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=31536000, immutable"),
        );
    } else if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    response
}
