//! Signing key retrieval.
//!
//! Caches the instance's JWKS using `moka` (1 hour TTL). A token signed with
//! a key the cached set lacks triggers one refetch, at most every
//! [`MIN_REFRESH_INTERVAL`], so rotated keys are picked up without letting
//! garbage `kid`s hammer the provider.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::IdentityError;

const JWKS_TTL: Duration = Duration::from_secs(3600);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Cached view of the instance's signing keys.
#[derive(Clone)]
pub struct JwksCache {
    inner: Arc<JwksCacheInner>,
}

struct JwksCacheInner {
    source: KeySource,
    cache: Cache<String, Arc<JwkSet>>,
    last_forced_refresh: Mutex<Option<Instant>>,
}

enum KeySource {
    Remote { client: reqwest::Client, url: String },
    Fixed(Arc<JwkSet>),
}

impl JwksCache {
    /// Fetch keys from `url` on demand.
    #[must_use]
    pub fn remote(client: reqwest::Client, url: String) -> Self {
        Self::with_source(KeySource::Remote { client, url })
    }

    /// Serve a fixed key set. Used for offline development and tests.
    #[must_use]
    pub fn fixed(keys: JwkSet) -> Self {
        Self::with_source(KeySource::Fixed(Arc::new(keys)))
    }

    fn with_source(source: KeySource) -> Self {
        let cache = Cache::builder()
            .max_capacity(4)
            .time_to_live(JWKS_TTL)
            .build();

        Self {
            inner: Arc::new(JwksCacheInner {
                source,
                cache,
                last_forced_refresh: Mutex::new(None),
            }),
        }
    }

    /// Decoding key for the given key ID.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownKey`] if no key has this ID even after
    /// a refetch, or [`IdentityError::JwksUnavailable`] if keys cannot be
    /// fetched.
    #[instrument(skip(self))]
    pub async fn key_for(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        let keys = self.current().await?;
        if let Some(jwk) = keys.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        if !self.refresh_allowed() {
            return Err(IdentityError::UnknownKey(kid.to_owned()));
        }

        debug!(kid, "Signing key not in cached JWKS, refetching");
        if let KeySource::Remote { url, .. } = &self.inner.source {
            self.inner.cache.invalidate(url).await;
        }

        let keys = self.current().await?;
        let jwk = keys
            .find(kid)
            .ok_or_else(|| IdentityError::UnknownKey(kid.to_owned()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }

    async fn current(&self) -> Result<Arc<JwkSet>, IdentityError> {
        match &self.inner.source {
            KeySource::Fixed(keys) => Ok(Arc::clone(keys)),
            KeySource::Remote { client, url } => self
                .inner
                .cache
                .try_get_with(url.clone(), fetch_jwks(client, url))
                .await
                .map_err(|e| IdentityError::JwksUnavailable(e.to_string())),
        }
    }

    fn refresh_allowed(&self) -> bool {
        let Ok(mut last) = self.inner.last_forced_refresh.lock() else {
            return false;
        };
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < MIN_REFRESH_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

async fn fetch_jwks(client: &reqwest::Client, url: &str) -> Result<Arc<JwkSet>, IdentityError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %body.chars().take(200).collect::<String>(),
            "JWKS endpoint returned non-success status"
        );
        return Err(IdentityError::Provider {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    let keys: JwkSet = serde_json::from_str(&body)?;
    debug!(count = keys.keys.len(), "Fetched JWKS");
    Ok(Arc::new(keys))
}
