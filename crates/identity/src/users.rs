//! User profile lookup via the provider's backend API.
//!
//! Profiles are cached with `moka` (60 second TTL) so that a page render
//! costs at most one API call per user per minute.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use alexandria_core::{EmailAddress, User, UserId};

use crate::IdentityError;

/// Backend API representation of a user. Unused fields are ignored.
#[derive(Debug, Deserialize)]
struct ApiUser {
    id: UserId,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
}

impl From<ApiUser> for User {
    fn from(user: ApiUser) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            email_addresses: user.email_addresses,
        }
    }
}

/// Client for user profiles.
#[derive(Clone)]
pub struct UserDirectory {
    inner: Arc<UserDirectoryInner>,
}

struct UserDirectoryInner {
    client: reqwest::Client,
    api_url: Url,
    secret_key: SecretString,
    cache: Cache<UserId, User>,
}

impl UserDirectory {
    #[must_use]
    pub fn new(client: reqwest::Client, api_url: Url, secret_key: SecretString) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self {
            inner: Arc::new(UserDirectoryInner {
                client,
                api_url,
                secret_key,
                cache,
            }),
        }
    }

    /// Fetch a user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with a
    /// non-success status, or the body cannot be parsed.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get(&self, id: &UserId) -> Result<User, IdentityError> {
        if let Some(user) = self.inner.cache.get(id).await {
            return Ok(user);
        }

        let user = self.fetch(id).await?;
        self.inner.cache.insert(id.clone(), user.clone()).await;
        Ok(user)
    }

    async fn fetch(&self, id: &UserId) -> Result<User, IdentityError> {
        let url = self.user_url(id)?;
        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "User lookup returned non-success status"
            );
            return Err(IdentityError::Provider {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let user: ApiUser = serde_json::from_str(&body)?;
        Ok(user.into())
    }

    fn user_url(&self, id: &UserId) -> Result<Url, IdentityError> {
        Ok(self
            .inner
            .api_url
            .join(&format!("v1/users/{}", id.as_str()))?)
    }
}
