//! Error types for playback management

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The native engine rejected or failed an operation
    #[error("Engine error: {0}")]
    Engine(String),

    /// The engine instance was destroyed
    #[error("Engine destroyed")]
    Destroyed,

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage or catalog failure
    #[error(transparent)]
    Core(#[from] satsang_core::SatsangError),
}

impl PlaybackError {
    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

impl From<config::ConfigError> for PlaybackError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
