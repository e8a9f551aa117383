//! Application state shared across handlers.

use std::sync::Arc;

use alexandria_identity::IdentityProvider;

use crate::backend::BackendClient;
use crate::config::WebConfig;

/// Application state shared across all handlers.
///
/// Holds the identity provider and backend client constructed once at
/// startup. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<dyn BackendClient>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: WebConfig,
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendClient>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                backend,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// The identity provider resolving visitors.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// The backend the pages call.
    #[must_use]
    pub fn backend(&self) -> &dyn BackendClient {
        self.inner.backend.as_ref()
    }
}
