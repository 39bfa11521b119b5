//! Durable key-value storage abstraction
//!
//! Everything the playback core persists (queue snapshot, position records,
//! last-played breadcrumb, diagnostic log) goes through this trait. Values are
//! JSON strings; backends never interpret them.

use crate::error::Result;
use async_trait::async_trait;

/// Generic async key-value store
///
/// Implementations must be safe to share between the in-app controller and the
/// background remote-control service; both hold an `Arc<dyn KeyValueStore>`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Write several entries as one unit
    ///
    /// Readers must never observe only part of the batch. The default
    /// implementation writes sequentially; backends with transactions override it.
    async fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Read several keys as one unit, in the order given
    ///
    /// The values come from a single point in time: a concurrent `set_many`
    /// is seen entirely or not at all. The default implementation reads
    /// sequentially and gives no such guarantee; every backend shared across
    /// writers overrides it.
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }
}

/// Read and deserialize a JSON value
///
/// Returns `Ok(None)` when the key is absent.
pub async fn read_json<T>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value
pub async fn write_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: serde::Serialize + Sync,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}
