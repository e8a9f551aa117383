//! Alexandria identity provider integration.
//!
//! Resolves the visitor behind a request to an [`IdentityState`] using the
//! provider's session cookies:
//!
//! - `__session` - short-lived RS256 session token signed with the
//!   instance's JWKS
//! - `__client_uat` - unix time the browser's client session was last
//!   updated (`0` when signed out)
//!
//! # Architecture
//!
//! - [`PublishableKey`] decodes the instance's frontend API host from the
//!   public key handed to the browser
//! - [`SessionVerifier`] checks session tokens against the cached JWKS
//! - [`UserDirectory`] looks up profiles via the provider's backend API
//! - [`IdentityProvider`] is the seam the web layer depends on; see
//!   [`ClerkIdentityProvider`] and [`FixedIdentityProvider`]
//!
//! [`IdentityState`]: alexandria_core::IdentityState

#![cfg_attr(not(test), forbid(unsafe_code))]

mod config;
mod error;
mod jwks;
mod provider;
mod publishable_key;
mod users;
mod verifier;

pub use config::ClerkConfig;
pub use error::IdentityError;
pub use jwks::JwksCache;
pub use provider::{
    ClerkIdentityProvider, FixedIdentityProvider, IdentityProvider, ResolvedSession,
    SessionCookies,
};
pub use publishable_key::{InstanceType, PublishableKey};
pub use users::UserDirectory;
pub use verifier::{SessionClaims, SessionVerifier};
