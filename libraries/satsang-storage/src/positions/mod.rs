//! Persistent Position Store
//!
//! Last-heard offset per track, stored as one JSON list under
//! [`keys::POSITIONS`]. The list is read fully, mutated, and rewritten on every
//! write; the backend offers no partial update.
//!
//! Invariants:
//! - at most one record per effective URL
//! - `position == 0` means unplayed / reset
//!
//! Tracks that were renamed on the backend keep their history through an
//! alias map (original URL to the effective URL records are keyed by).

use crate::keys;
use satsang_core::storage::{read_json, write_json};
use satsang_core::{KeyValueStore, PositionRecord, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Key-value mapping from track URL to last-heard offset (ms)
pub struct PositionStore {
    store: Arc<dyn KeyValueStore>,
    aliases: HashMap<String, String>,
    // Serializes read-modify-write cycles so concurrent upserts cannot drop each other
    write_lock: Mutex<()>,
}

impl PositionStore {
    /// Create a position store over `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            aliases: HashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Install a rename map (original URL -> effective URL)
    #[must_use]
    pub fn with_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// URL records for `url` are keyed by
    pub fn effective_url<'a>(&'a self, url: &'a str) -> &'a str {
        self.aliases.get(url).map_or(url, String::as_str)
    }

    /// All stored records
    pub async fn all(&self) -> Result<Vec<PositionRecord>> {
        Ok(read_json::<Vec<PositionRecord>>(self.store.as_ref(), keys::POSITIONS)
            .await?
            .unwrap_or_default())
    }

    /// Last-heard offset for `url`, if one was ever stored
    pub async fn get(&self, url: &str) -> Result<Option<u64>> {
        let effective = self.effective_url(url);
        Ok(self
            .all()
            .await?
            .into_iter()
            .find(|record| record.song.url == effective)
            .map(|record| record.position))
    }

    /// Insert or replace the offset for `url`
    ///
    /// Writing the same value twice leaves storage unchanged in content.
    pub async fn upsert(&self, title: &str, url: &str, position_ms: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let effective = self.effective_url(url).to_string();

        let mut records = self.all().await?;
        match records.iter_mut().find(|r| r.song.url == effective) {
            Some(record) => {
                record.position = position_ms;
                title.clone_into(&mut record.song.title);
            }
            None => records.push(PositionRecord::new(title, effective.clone(), position_ms)),
        }

        write_json(self.store.as_ref(), keys::POSITIONS, &records).await?;
        tracing::debug!(url = %effective, position_ms, "position saved");
        Ok(())
    }

    /// Mark `url` as unplayed (position 0)
    ///
    /// No record is created for a URL that was never stored.
    pub async fn reset(&self, url: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let effective = self.effective_url(url);

        let mut records = self.all().await?;
        let Some(record) = records.iter_mut().find(|r| r.song.url == effective) else {
            return Ok(());
        };
        record.position = 0;

        write_json(self.store.as_ref(), keys::POSITIONS, &records).await?;
        tracing::debug!(url = %effective, "position reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn store() -> PositionStore {
        PositionStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn upsert_then_get_returns_position() {
        let positions = store();
        positions.upsert("A", "https://cdn/a.mp3", 5000).await.unwrap();
        assert_eq!(positions.get("https://cdn/a.mp3").await.unwrap(), Some(5000));
    }

    #[tokio::test]
    async fn reset_sets_position_to_zero() {
        let positions = store();
        positions.upsert("A", "https://cdn/a.mp3", 5000).await.unwrap();
        positions.reset("https://cdn/a.mp3").await.unwrap();
        assert_eq!(positions.get("https://cdn/a.mp3").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn reset_of_unknown_url_creates_nothing() {
        let positions = store();
        positions.reset("https://cdn/never.mp3").await.unwrap();
        assert!(positions.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_keeps_one_record_per_url() {
        let positions = store();
        positions.upsert("A", "https://cdn/a.mp3", 1000).await.unwrap();
        positions.upsert("A", "https://cdn/a.mp3", 2000).await.unwrap();
        positions.upsert("B", "https://cdn/b.mp3", 3000).await.unwrap();

        let records = positions.all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(positions.get("https://cdn/a.mp3").await.unwrap(), Some(2000));
    }

    #[tokio::test]
    async fn aliases_share_history_with_renamed_url() {
        let aliases = HashMap::from([(
            "https://cdn/renamed.mp3".to_string(),
            "https://cdn/original.mp3".to_string(),
        )]);
        let positions = store().with_aliases(aliases);

        positions
            .upsert("A", "https://cdn/renamed.mp3", 4200)
            .await
            .unwrap();

        assert_eq!(positions.get("https://cdn/original.mp3").await.unwrap(), Some(4200));
        assert_eq!(positions.get("https://cdn/renamed.mp3").await.unwrap(), Some(4200));
    }
}
