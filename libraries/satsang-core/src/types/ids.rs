/// ID types for Satsang Player entities
use serde::{Deserialize, Serialize};
use std::fmt;

/// Track identifier
///
/// Content-backend ids are opaque strings. Tracks that arrive without one are
/// given a composite `"{index}-{url}"` id when they are enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Create a new track ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Composite id for a track that has none: queue index plus URL
    pub fn composite(index: usize, url: &str) -> Self {
        Self(format!("{index}-{url}"))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_id_combines_index_and_url() {
        let id = TrackId::composite(3, "https://cdn/a.mp3");
        assert_eq!(id.as_str(), "3-https://cdn/a.mp3");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&TrackId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
