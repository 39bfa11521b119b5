//! In-memory content catalog

use async_trait::async_trait;
use rand::seq::SliceRandom;
use satsang_core::{CatalogSource, Result, Track};
use std::collections::HashSet;
use std::sync::Mutex;

/// Catalog over a fixed track list
///
/// Hands out a random track that is neither excluded by the caller nor
/// already handed out this session.
pub struct LibraryCatalog {
    tracks: Vec<Track>,
    served: Mutex<HashSet<String>>,
}

impl LibraryCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: tracks.into_iter().filter(Track::is_playable).collect(),
            served: Mutex::new(HashSet::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[async_trait]
impl CatalogSource for LibraryCatalog {
    async fn random_unplayed(&self, exclude_urls: &[String]) -> Result<Option<Track>> {
        let mut served = self
            .served
            .lock()
            .map_err(|_| satsang_core::SatsangError::catalog("catalog state poisoned"))?;

        let candidates: Vec<&Track> = self
            .tracks
            .iter()
            .filter(|t| !served.contains(&t.url) && !exclude_urls.contains(&t.url))
            .collect();

        let picked = candidates.choose(&mut rand::thread_rng()).map(|t| (*t).clone());
        if let Some(track) = &picked {
            served.insert(track.url.clone());
        }
        tracing::debug!(
            candidates = candidates.len(),
            picked = picked.as_ref().map(|t| t.url.as_str()),
            "catalog fallback pick"
        );
        Ok(picked)
    }
}
