/// Core traits for Satsang Player
use crate::error::Result;
use crate::types::Track;
use async_trait::async_trait;

/// Content collaborator
///
/// Backed by the hosted document database / serverless functions. The queue
/// controller only ever asks it for a fallback track when the user skips past
/// the end of the queue.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Pick a track the listener has not heard this session
    ///
    /// `exclude_urls` lists tracks already queued or played. Returns `None`
    /// when the catalog is exhausted.
    async fn random_unplayed(&self, exclude_urls: &[String]) -> Result<Option<Track>>;
}
