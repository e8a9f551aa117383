//! Data shared by every page's root layout.

use alexandria_core::IdentityState;

use crate::middleware::CspNonce;
use crate::state::AppState;

/// Root layout context: navigation, the identity provider's browser script,
/// and the client script.
#[derive(Debug, Clone)]
pub struct Layout {
    /// CSP nonce for this response's scripts.
    pub nonce: String,
    /// Publishable key the browser script initializes with.
    pub publishable_key: String,
    /// URL of the identity provider's browser script.
    pub identity_script_url: String,
    /// `signed-in`, `signed-out`, or `loading`; read by the client script.
    pub identity: &'static str,
}

impl Layout {
    #[must_use]
    pub fn new(state: &AppState, nonce: &CspNonce, identity: &IdentityState) -> Self {
        let key = &state.config().clerk.publishable_key;
        Self {
            nonce: nonce.value().to_owned(),
            publishable_key: key.as_str().to_owned(),
            identity_script_url: key.browser_script_url(),
            identity: match identity {
                IdentityState::Loading => "loading",
                IdentityState::SignedOut => "signed-out",
                IdentityState::SignedIn(_) => "signed-in",
            },
        }
    }
}
