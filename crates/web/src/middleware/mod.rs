//! HTTP middleware stack for the web front-end.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce (generate per-request nonce for scripts)
//! 5. Security headers (CSP, frame options, etc.)

pub mod csp;
pub mod identity;
pub mod request_id;
pub mod security_headers;

pub use csp::{CspNonce, csp_nonce_middleware};
pub use identity::{CurrentSession, OptionalSession, RequireUser};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
