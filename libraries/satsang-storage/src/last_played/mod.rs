//! "Last played" breadcrumb
//!
//! Written by the remote-control service when playback is stopped from the lock
//! screen so the next launch can offer to resume.

use crate::keys;
use satsang_core::{KeyValueStore, LastPlayed, Result};
use std::sync::Arc;

/// Persist the breadcrumb (URL and position written together)
pub async fn save(store: &Arc<dyn KeyValueStore>, last: &LastPlayed) -> Result<()> {
    store
        .set_many(&[
            (keys::LAST_SONG_URL, serde_json::to_string(&last.url)?),
            (
                keys::LAST_SONG_POSITION,
                serde_json::to_string(&last.position_ms)?,
            ),
        ])
        .await
}

/// Read the breadcrumb, if any
pub async fn load(store: &Arc<dyn KeyValueStore>) -> Result<Option<LastPlayed>> {
    let mut values = store
        .get_many(&[keys::LAST_SONG_URL, keys::LAST_SONG_POSITION])
        .await?
        .into_iter();
    let Some(url) = values.next().flatten() else {
        return Ok(None);
    };
    let url: String = serde_json::from_str(&url)?;
    let position_ms = match values.next().flatten() {
        Some(raw) => serde_json::from_str::<u64>(&raw)?,
        None => 0,
    };
    Ok(Some(LastPlayed { url, position_ms }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn save_then_load() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        assert_eq!(load(&store).await.unwrap(), None);

        let last = LastPlayed {
            url: "https://cdn/a.mp3".to_string(),
            position_ms: 61_000,
        };
        save(&store, &last).await.unwrap();
        assert_eq!(load(&store).await.unwrap(), Some(last));
    }
}
