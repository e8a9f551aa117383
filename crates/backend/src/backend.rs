//! The backend service: function registry, caller authentication, and live
//! query subscriptions behind one cheaply cloneable handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::instrument;

use alexandria_core::{FunctionKind, FunctionPath};
use alexandria_identity::SessionVerifier;

use crate::config::BackendConfig;
use crate::context::{FunctionContext, UserIdentity};
use crate::error::FunctionError;
use crate::functions;
use crate::registry::FunctionRegistry;
use crate::subscriptions::{QueryValue, Subscription, SubscriptionHub, SubscriptionKey};

/// Shared backend handle.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    registry: FunctionRegistry,
    verifier: Option<SessionVerifier>,
    hub: SubscriptionHub,
    /// Successful mutations so far.
    mutations: AtomicU64,
}

impl Backend {
    #[must_use]
    pub fn new(registry: FunctionRegistry, verifier: Option<SessionVerifier>) -> Self {
        Self {
            inner: Arc::new(BackendInner {
                registry,
                verifier,
                hub: SubscriptionHub::new(),
                mutations: AtomicU64::new(0),
            }),
        }
    }

    /// Backend serving the built-in functions, verifying callers when an
    /// identity provider is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in functions fail to register.
    pub fn from_config(config: &BackendConfig) -> Result<Self, FunctionError> {
        let verifier = config
            .clerk
            .as_ref()
            .map(|clerk| SessionVerifier::from_config(clerk, reqwest::Client::new()));
        Ok(Self::new(functions::registry()?, verifier))
    }

    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionHub {
        &self.inner.hub
    }

    /// Establish the caller from an optional bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::Unauthenticated`] if the token fails
    /// verification, or [`FunctionError::Unavailable`] if the provider's keys
    /// cannot be fetched.
    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<FunctionContext, FunctionError> {
        let Some(token) = bearer else {
            return Ok(FunctionContext::anonymous());
        };

        let Some(verifier) = &self.inner.verifier else {
            tracing::warn!("Bearer token presented but no identity provider is configured");
            return Ok(FunctionContext::anonymous());
        };

        match verifier.verify(token).await {
            Ok(claims) => Ok(FunctionContext::new(Some(UserIdentity::from(&claims)))),
            Err(e) if e.is_token_error() => Err(FunctionError::Unauthenticated(e.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "Could not verify session token");
                Err(FunctionError::Unavailable(e.to_string()))
            }
        }
    }

    /// Run a query.
    ///
    /// # Errors
    ///
    /// See [`FunctionRegistry::call`].
    #[instrument(skip_all, fields(path = %path))]
    pub async fn query(
        &self,
        ctx: FunctionContext,
        path: &FunctionPath,
        args: Value,
    ) -> Result<Value, FunctionError> {
        self.inner
            .registry
            .call(FunctionKind::Query, path, ctx, args)
            .await
    }

    /// Run a mutation, then refresh live queries.
    ///
    /// # Errors
    ///
    /// See [`FunctionRegistry::call`].
    #[instrument(skip_all, fields(path = %path))]
    pub async fn mutation(
        &self,
        ctx: FunctionContext,
        path: &FunctionPath,
        args: Value,
    ) -> Result<Value, FunctionError> {
        let value = self
            .inner
            .registry
            .call(FunctionKind::Mutation, path, ctx, args)
            .await?;
        // Counted before the refresh snapshots live queries
        self.inner.mutations.fetch_add(1, Ordering::SeqCst);
        self.refresh_subscriptions().await;
        Ok(value)
    }

    /// Subscribe to a query. The subscription starts with the query's
    /// current result.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a query or the arguments are
    /// invalid. A failing handler does not prevent subscribing; its error
    /// becomes the subscription's current value.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn subscribe(
        &self,
        ctx: FunctionContext,
        path: &FunctionPath,
        args: Value,
    ) -> Result<Subscription, FunctionError> {
        let seen = self.inner.mutations.load(Ordering::SeqCst);
        let value = self.initial_value(ctx.clone(), path, args.clone()).await?;

        let key = SubscriptionKey::new(path.clone(), &args, &ctx);
        let subscription = self.inner.hub.subscribe(key, args.clone(), ctx.clone(), value);

        // A mutation that finished while the first result was computed may
        // have refreshed before this key was registered.
        if self.inner.mutations.load(Ordering::SeqCst) != seen {
            let value = self.initial_value(ctx, path, args).await?;
            if self.inner.hub.publish(subscription.key(), value) {
                tracing::debug!(path = %path, "Live query changed while subscribing");
            }
        }

        Ok(subscription)
    }

    /// Result a new subscription starts with. A failing handler becomes the
    /// error value rather than refusing the subscription.
    async fn initial_value(
        &self,
        ctx: FunctionContext,
        path: &FunctionPath,
        args: Value,
    ) -> Result<QueryValue, FunctionError> {
        match self.query(ctx, path, args).await {
            Ok(value) => Ok(Ok(value)),
            Err(e @ FunctionError::Handler(_)) => Ok(Err(e.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn refresh_subscriptions(&self) {
        for live in self.inner.hub.live_queries() {
            let value = self
                .query(live.ctx, live.key.path(), live.args)
                .await
                .map_err(|e| e.to_string());
            if self.inner.hub.publish(&live.key, value) {
                tracing::debug!(path = %live.key.path(), "Live query changed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use alexandria_identity::JwksCache;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::registry::{FunctionDefinition, NoArgs};
    use crate::values::v;

    fn path(raw: &str) -> FunctionPath {
        FunctionPath::parse(raw).unwrap()
    }

    /// A counter: `counter:get` reads it, `counter:bump` increments it, and
    /// `counter:touch` changes nothing.
    fn counter_backend() -> Backend {
        let count = Arc::new(AtomicU64::new(0));
        let mut registry = FunctionRegistry::new();

        let read = count.clone();
        registry
            .register(FunctionDefinition::query(
                path("counter:get"),
                v::none(),
                move |_ctx, _args: NoArgs| {
                    let value = read.load(Ordering::SeqCst);
                    async move { Ok(value) }
                },
            ))
            .unwrap();
        registry
            .register(FunctionDefinition::mutation(
                path("counter:bump"),
                v::none(),
                move |_ctx, _args: NoArgs| {
                    count.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
            ))
            .unwrap();
        registry
            .register(FunctionDefinition::mutation(
                path("counter:touch"),
                v::none(),
                |_ctx, _args: NoArgs| async { Ok(()) },
            ))
            .unwrap();

        Backend::new(registry, None)
    }

    #[tokio::test]
    async fn test_anonymous_without_token() {
        let backend = counter_backend();
        let ctx = backend.authenticate(None).await.unwrap();
        assert!(ctx.auth().is_none());
    }

    #[tokio::test]
    async fn test_token_ignored_without_verifier() {
        let backend = counter_backend();
        let ctx = backend.authenticate(Some("a.b.c")).await.unwrap();
        assert!(ctx.auth().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        // Nothing listens on a port that was just released
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let keys = JwksCache::remote(reqwest::Client::new(), format!("http://{addr}/jwks"));
        let verifier = SessionVerifier::new("https://clerk.example.com".to_owned(), keys, vec![]);
        let backend = Backend::new(FunctionRegistry::new(), Some(verifier));

        let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
        header.kid = Some("ins_test_key".to_owned());
        let token = jsonwebtoken::encode(
            &header,
            &json!({"sub": "user_1"}),
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let err = backend.authenticate(Some(&token)).await.unwrap_err();
        assert!(matches!(err, FunctionError::Unavailable(_)), "got {err:?}");
        assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_subscription_follows_mutations() {
        let backend = counter_backend();
        let ctx = FunctionContext::anonymous();

        let mut sub = backend
            .subscribe(ctx.clone(), &path("counter:get"), json!({}))
            .await
            .unwrap();
        assert_eq!(sub.current(), Ok(json!(0)));

        backend
            .mutation(ctx, &path("counter:bump"), json!({}))
            .await
            .unwrap();
        assert_eq!(sub.changed().await, Some(Ok(json!(1))));
    }

    #[tokio::test]
    async fn test_mutation_during_subscribe_is_not_missed() {
        let count = Arc::new(AtomicU64::new(0));
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let first_call = Arc::new(AtomicBool::new(true));
        let mut registry = FunctionRegistry::new();

        let read = count.clone();
        let (entered_q, release_q) = (entered.clone(), release.clone());
        registry
            .register(FunctionDefinition::query(
                path("counter:get"),
                v::none(),
                move |_ctx, _args: NoArgs| {
                    let value = read.load(Ordering::SeqCst);
                    let hold = first_call.swap(false, Ordering::SeqCst);
                    let (entered, release) = (entered_q.clone(), release_q.clone());
                    async move {
                        if hold {
                            entered.notify_one();
                            release.notified().await;
                        }
                        Ok(value)
                    }
                },
            ))
            .unwrap();
        registry
            .register(FunctionDefinition::mutation(
                path("counter:bump"),
                v::none(),
                move |_ctx, _args: NoArgs| {
                    count.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
            ))
            .unwrap();
        let backend = Backend::new(registry, None);

        let subscribing = tokio::spawn({
            let backend = backend.clone();
            async move {
                backend
                    .subscribe(FunctionContext::anonymous(), &path("counter:get"), json!({}))
                    .await
            }
        });

        // First result computed from the old count, mutation lands meanwhile
        entered.notified().await;
        backend
            .mutation(FunctionContext::anonymous(), &path("counter:bump"), json!({}))
            .await
            .unwrap();
        release.notify_one();

        let mut sub = subscribing.await.unwrap().unwrap();
        assert_eq!(sub.current(), Ok(json!(1)));
    }

    #[tokio::test]
    async fn test_unchanged_result_not_pushed() {
        let backend = counter_backend();
        let ctx = FunctionContext::anonymous();

        let mut sub = backend
            .subscribe(ctx.clone(), &path("counter:get"), json!({}))
            .await
            .unwrap();
        let _ = sub.current();

        backend
            .mutation(ctx, &path("counter:touch"), json!({}))
            .await
            .unwrap();
        assert!(!sub.has_changed());
    }

    #[tokio::test]
    async fn test_subscribe_rejects_mutations_and_unknown_paths() {
        let backend = counter_backend();
        let ctx = FunctionContext::anonymous();

        let err = backend
            .subscribe(ctx.clone(), &path("counter:bump"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionError::WrongKind { .. }));

        let err = backend
            .subscribe(ctx, &path("counter:nope"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionError::NotFound(_)));
        assert!(backend.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_subscription_unregisters() {
        let backend = counter_backend();
        let sub = backend
            .subscribe(FunctionContext::anonymous(), &path("counter:get"), json!({}))
            .await
            .unwrap();
        assert_eq!(backend.subscriptions().len(), 1);
        drop(sub);
        assert!(backend.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_built_in_functions() {
        let backend = Backend::from_config(&BackendConfig::default()).unwrap();
        let value = backend
            .query(
                FunctionContext::anonymous(),
                &path("example:getExample"),
                json!({}),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"message": "Hello from Convex!"}));
    }
}
