//! Live query subscriptions.
//!
//! Every distinct (function, arguments, caller) triple owns one
//! `tokio::sync::watch` channel. Subscribers hold a receiver; the entry is
//! removed when the last [`Subscription`] is dropped. After each successful
//! mutation the backend re-runs every live query and publishes the result,
//! and receivers only wake when the value actually changed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::Stream;
use serde_json::Value;
use tokio::sync::watch;

use alexandria_core::FunctionPath;

use crate::context::FunctionContext;

/// Result of a query as seen by subscribers: the value, or the error message.
pub type QueryValue = Result<Value, String>;

/// Identifies one live query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    path: FunctionPath,
    args: String,
    caller: Option<String>,
}

impl SubscriptionKey {
    #[must_use]
    pub fn new(path: FunctionPath, args: &Value, ctx: &FunctionContext) -> Self {
        Self {
            path,
            args: args.to_string(),
            caller: ctx.auth().map(|identity| identity.token_identifier.clone()),
        }
    }

    #[must_use]
    pub const fn path(&self) -> &FunctionPath {
        &self.path
    }
}

struct Entry {
    sender: watch::Sender<QueryValue>,
    args: Value,
    ctx: FunctionContext,
    subscribers: usize,
}

/// A live query to re-run.
#[derive(Debug, Clone)]
pub struct LiveQuery {
    pub key: SubscriptionKey,
    pub args: Value,
    pub ctx: FunctionContext,
}

/// Registry of live queries and their subscribers.
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    entries: Arc<Mutex<HashMap<SubscriptionKey, Entry>>>,
}

impl SubscriptionHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SubscriptionKey, Entry>> {
        // Entries stay consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a subscriber for `key`, whose current result is `value`.
    #[must_use]
    pub fn subscribe(
        &self,
        key: SubscriptionKey,
        args: Value,
        ctx: FunctionContext,
        value: QueryValue,
    ) -> Subscription {
        let mut entries = self.entries();
        let receiver = match entries.get_mut(&key) {
            Some(entry) => {
                entry.subscribers += 1;
                publish_to(&entry.sender, value);
                entry.sender.subscribe()
            }
            None => {
                let (sender, receiver) = watch::channel(value);
                entries.insert(
                    key.clone(),
                    Entry {
                        sender,
                        args,
                        ctx,
                        subscribers: 1,
                    },
                );
                receiver
            }
        };
        drop(entries);

        tracing::debug!(path = %key.path, "Subscriber registered");
        Subscription {
            hub: self.clone(),
            key,
            receiver,
        }
    }

    /// Snapshot of the queries that currently have subscribers.
    #[must_use]
    pub fn live_queries(&self) -> Vec<LiveQuery> {
        self.entries()
            .iter()
            .map(|(key, entry)| LiveQuery {
                key: key.clone(),
                args: entry.args.clone(),
                ctx: entry.ctx.clone(),
            })
            .collect()
    }

    /// Publish a fresh result. Subscribers are woken only if it changed.
    /// Returns whether it changed.
    pub fn publish(&self, key: &SubscriptionKey, value: QueryValue) -> bool {
        self.entries()
            .get(key)
            .is_some_and(|entry| publish_to(&entry.sender, value))
    }

    /// Number of distinct live queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Number of subscribers of `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &SubscriptionKey) -> usize {
        self.entries().get(key).map_or(0, |entry| entry.subscribers)
    }

    fn release(&self, key: &SubscriptionKey) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entries.remove(key);
                tracing::debug!(path = %key.path, "Last subscriber left, query no longer live");
            }
        }
    }
}

fn publish_to(sender: &watch::Sender<QueryValue>, value: QueryValue) -> bool {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

/// A subscriber's handle on a live query. Unsubscribes on drop.
pub struct Subscription {
    hub: SubscriptionHub,
    key: SubscriptionKey,
    receiver: watch::Receiver<QueryValue>,
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    #[must_use]
    pub const fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// The latest result.
    #[must_use]
    pub fn current(&mut self) -> QueryValue {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether a result newer than the last one seen is waiting.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next changed result. `None` once the query is gone.
    pub async fn changed(&mut self) -> Option<QueryValue> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }

    /// The current result followed by every change.
    pub fn into_stream(mut self) -> impl Stream<Item = QueryValue> + Send + 'static {
        async_stream::stream! {
            yield self.current();
            while let Some(value) = self.changed().await {
                yield value;
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(&self.key);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;

    fn key() -> SubscriptionKey {
        SubscriptionKey::new(
            FunctionPath::parse("example:getExample").unwrap(),
            &json!({}),
            &FunctionContext::anonymous(),
        )
    }

    #[test]
    fn test_subscribers_share_entry_and_release_on_drop() {
        let hub = SubscriptionHub::new();
        let first = hub.subscribe(key(), json!({}), FunctionContext::anonymous(), Ok(json!(1)));
        let second = hub.subscribe(key(), json!({}), FunctionContext::anonymous(), Ok(json!(1)));

        assert_eq!(hub.len(), 1);
        assert_eq!(hub.subscriber_count(&key()), 2);

        drop(first);
        assert_eq!(hub.subscriber_count(&key()), 1);
        drop(second);
        assert!(hub.is_empty());
    }

    #[test]
    fn test_initial_value() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.subscribe(key(), json!({}), FunctionContext::anonymous(), Ok(json!("hi")));
        assert_eq!(sub.current(), Ok(json!("hi")));
    }

    #[test]
    fn test_publish_only_when_changed() {
        let hub = SubscriptionHub::new();
        let _sub = hub.subscribe(key(), json!({}), FunctionContext::anonymous(), Ok(json!(1)));

        assert!(!hub.publish(&key(), Ok(json!(1))));
        assert!(hub.publish(&key(), Ok(json!(2))));
        assert!(hub.publish(&key(), Err("boom".to_owned())));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = SubscriptionHub::new();
        assert!(!hub.publish(&key(), Ok(json!(1))));
    }

    #[tokio::test]
    async fn test_stream_yields_current_then_changes() {
        let hub = SubscriptionHub::new();
        let sub = hub.subscribe(key(), json!({}), FunctionContext::anonymous(), Ok(json!(1)));
        let mut stream = Box::pin(sub.into_stream());

        assert_eq!(stream.next().await, Some(Ok(json!(1))));
        hub.publish(&key(), Ok(json!(2)));
        assert_eq!(stream.next().await, Some(Ok(json!(2))));

        drop(stream);
        assert!(hub.is_empty());
    }
}
