//! Queue snapshot persistence
//!
//! The snapshot is the one piece of state shared across isolation boundaries:
//! the in-app controller writes it and the background remote-control service
//! reads it. Tracks and index are always written and read in a single batch.

use crate::keys;
use satsang_core::{KeyValueStore, QueueSnapshot, Result, Track};
use std::sync::Arc;

/// Reads and writes the persisted queue snapshot
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
}

impl SnapshotStore {
    /// Create a snapshot store over `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist the full snapshot (tracks + index together)
    pub async fn save(&self, snapshot: &QueueSnapshot) -> Result<()> {
        let tracks = serde_json::to_string(&snapshot.tracks)?;
        let index = serde_json::to_string(&snapshot.current_index)?;
        self.store
            .set_many(&[(keys::PLAYLIST, tracks), (keys::CURRENT_INDEX, index)])
            .await?;
        tracing::debug!(
            len = snapshot.len(),
            index = snapshot.current_index,
            "queue snapshot saved"
        );
        Ok(())
    }

    /// Load the persisted snapshot
    ///
    /// Returns `None` when no queue was ever saved. A missing index reads as 0
    /// and an out-of-range index is clamped.
    pub async fn load(&self) -> Result<Option<QueueSnapshot>> {
        let mut values = self
            .store
            .get_many(&[keys::PLAYLIST, keys::CURRENT_INDEX])
            .await?
            .into_iter();
        let Some(tracks) = values.next().flatten() else {
            return Ok(None);
        };
        let tracks: Vec<Track> = serde_json::from_str(&tracks)?;
        let index = match values.next().flatten() {
            Some(raw) => serde_json::from_str::<usize>(&raw)?,
            None => 0,
        };
        Ok(Some(QueueSnapshot::new(tracks, index)))
    }

    /// Forget the persisted queue
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(keys::PLAYLIST).await?;
        self.store.remove(keys::CURRENT_INDEX).await
    }
}
