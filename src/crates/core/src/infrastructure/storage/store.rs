//! Key-value persistence contract and the in-memory store

use crate::util::errors::MentoraResult;
use async_trait::async_trait;
use dashmap::DashMap;
use log::trace;
use serde_json::Value;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// One write observed through [`KeyValueStore::subscribe`]; `value` is `None`
/// after a removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub value: Option<Value>,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> MentoraResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> MentoraResult<()>;

    async fn remove(&self, key: &str) -> MentoraResult<()>;

    /// Change feed; only writes made after subscribing are delivered
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Fan-out of storage changes to every live subscriber
#[derive(Debug, Clone)]
pub(crate) struct ChangeNotifier {
    sender: broadcast::Sender<StorageChange>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, key: &str, value: Option<Value>) {
        let change = StorageChange {
            key: key.to_string(),
            value,
        };
        // No receivers is fine
        if self.sender.send(change).is_err() {
            trace!("Storage change without subscribers: key={}", key);
        }
    }
}

/// Process-lifetime store, the equivalent of browser session storage
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
    notifier: ChangeNotifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> MentoraResult<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> MentoraResult<()> {
        self.entries.insert(key.to_string(), value.clone());
        self.notifier.publish(key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> MentoraResult<()> {
        if self.entries.remove(key).is_some() {
            self.notifier.publish(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", json!({"a": 1})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 1})));

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_writes_in_order() {
        let store = MemoryStore::new();
        let mut changes = store.subscribe();

        store.set("a", json!("x")).await.unwrap();
        store.remove("a").await.unwrap();
        // Removing a missing key is silent
        store.remove("a").await.unwrap();
        store.set("b", json!(2)).await.unwrap();

        let first = changes.recv().await.unwrap();
        assert_eq!(first.key, "a");
        assert_eq!(first.value, Some(json!("x")));
        assert_eq!(changes.recv().await.unwrap().value, None);
        assert_eq!(changes.recv().await.unwrap().key, "b");
    }
}
