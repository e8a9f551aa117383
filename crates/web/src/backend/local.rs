//! In-process backend client.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use alexandria_backend::{Backend, FunctionError};
use alexandria_core::FunctionPath;

use super::{BackendClient, BackendError, QueryStream};

/// Calls an [`alexandria_backend::Backend`] running in the same process.
#[derive(Clone)]
pub struct LocalBackend {
    backend: Backend,
}

impl LocalBackend {
    #[must_use]
    pub const fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

impl From<FunctionError> for BackendError {
    fn from(err: FunctionError) -> Self {
        Self::Function {
            status: Some(err.status().as_u16()),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl BackendClient for LocalBackend {
    async fn query(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        let ctx = self.backend.authenticate(token).await?;
        Ok(self.backend.query(ctx, path, args).await?)
    }

    async fn mutation(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        let ctx = self.backend.authenticate(token).await?;
        Ok(self.backend.mutation(ctx, path, args).await?)
    }

    async fn subscribe(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<QueryStream, BackendError> {
        let ctx = self.backend.authenticate(token).await?;
        let subscription = self.backend.subscribe(ctx, path, args).await?;
        Ok(subscription
            .into_stream()
            .map(|value| {
                value.map_err(|message| BackendError::Function {
                    status: None,
                    message,
                })
            })
            .boxed())
    }
}
