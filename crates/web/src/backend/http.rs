//! Backend client over the HTTP call convention.
//!
//! Queries and mutations are `POST {base}/api/{query|mutation}` with a
//! [`FunctionCall`] body. Subscriptions read the server-sent event stream at
//! `GET {base}/api/subscribe`, one [`FunctionResult`] per event.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use alexandria_core::{FunctionCall, FunctionPath, FunctionResult};

use super::{BackendClient, BackendError, QueryStream};

/// Client for a remote backend deployment.
#[derive(Clone)]
pub struct HttpBackendClient {
    inner: Arc<HttpBackendClientInner>,
}

struct HttpBackendClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackendClient {
    /// Create a client for the deployment at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client sharing an existing connection pool.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            inner: Arc::new(HttpBackendClientInner { client, base_url }),
        }
    }

    fn endpoint(&self, name: &str) -> Result<Url, BackendError> {
        // A base without a trailing slash would lose its last path segment
        let mut base = self.inner.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(&format!("api/{name}"))?)
    }

    async fn call(
        &self,
        endpoint: &str,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        let mut request = self
            .inner
            .client
            .post(self.endpoint(endpoint)?)
            .json(&FunctionCall::new(path.clone(), args));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Error envelopes come with non-2xx statuses, so parse before checking
        let result: FunctionResult = match serde_json::from_str(&body) {
            Ok(result) => result,
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                return Err(BackendError::Parse(e));
            }
            Err(_) => {
                return Err(BackendError::Function {
                    status: Some(status.as_u16()),
                    message: body.chars().take(200).collect(),
                });
            }
        };

        result.into_result().map_err(|message| BackendError::Function {
            status: Some(status.as_u16()),
            message,
        })
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    #[instrument(skip_all, fields(path = %path))]
    async fn query(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        self.call("query", path, args, token).await
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn mutation(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        self.call("mutation", path, args, token).await
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn subscribe(
        &self,
        path: &FunctionPath,
        args: Value,
        token: Option<&str>,
    ) -> Result<QueryStream, BackendError> {
        let mut url = self.endpoint("subscribe")?;
        url.query_pairs_mut()
            .append_pair("path", &path.to_string())
            .append_pair("args", &serde_json::to_string(&args)?);

        let mut request = self
            .inner
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = serde_json::from_str::<FunctionResult>(&body)
                .ok()
                .and_then(|result| result.into_result().err())
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(BackendError::Function {
                status: Some(status.as_u16()),
                message,
            });
        }

        debug!("Subscription opened");
        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = EventDecoder::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(BackendError::Stream(e.to_string()));
                        return;
                    }
                };
                for data in decoder.push(&chunk) {
                    yield decode_event(&data);
                }
            }
        };
        Ok(stream.boxed())
    }
}

fn decode_event(data: &str) -> Result<Value, BackendError> {
    let result: FunctionResult = serde_json::from_str(data)?;
    result
        .into_result()
        .map_err(|message| BackendError::Function {
            status: None,
            message,
        })
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Only `data:` fields are kept; multi-line data is joined with `\n`.
/// Comment lines (keep-alives) and other fields are dropped.
#[derive(Debug, Default)]
struct EventDecoder {
    buffer: String,
    pending: Vec<u8>,
}

impl EventDecoder {
    /// Feed a chunk and return the data of every event it completes.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Chunks can split a UTF-8 sequence
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(e) => e.valid_up_to(),
        };
        let rest = self.pending.split_off(valid);
        self.buffer
            .push_str(&String::from_utf8_lossy(&self.pending));
        self.pending = rest;

        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..end + 2).collect();
            let data: Vec<&str> = block
                .lines()
                .filter_map(|line| {
                    line.strip_prefix("data:")
                        .map(|value| value.strip_prefix(' ').unwrap_or(value))
                })
                .collect();
            if !data.is_empty() {
                events.push(data.join("\n"));
            }
        }
        events
    }
}
