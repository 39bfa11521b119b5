//! Satsang Player Storage
//!
//! Durable local storage for the playback core.
//!
//! Everything is persisted through the [`KeyValueStore`] trait from
//! `satsang-core`, so the in-app controller and the background remote-control
//! service can share one store even when they run in separate execution
//! contexts.
//!
//! # Architecture
//!
//! - **Backends**: [`SqliteStore`] (durable, `SQLite` via sqlx) and [`MemoryStore`] (ephemeral)
//! - **Vertical Slicing**: each persisted concern owns its keys and (de)serialization
//!   - [`positions`]: last-heard offset per track URL
//!   - [`snapshot`]: queue + selected index, always written together
//!   - [`last_played`]: breadcrumb written when playback is stopped remotely
//!
//! # Example
//!
//! ```rust,no_run
//! use satsang_storage::{positions::PositionStore, SqliteStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::open("sqlite://satsang.db").await?);
//! let positions = PositionStore::new(store);
//!
//! positions.upsert("Gita Class 1", "https://cdn/gita-01.mp3", 5_000).await?;
//! assert_eq!(positions.get("https://cdn/gita-01.mp3").await?, Some(5_000));
//! # Ok(())
//! # }
//! ```

mod error;
pub mod keys;
mod memory;
mod sqlite;

// Vertical slices
pub mod last_played;
pub mod positions;
pub mod snapshot;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use satsang_core::KeyValueStore;
pub use sqlite::SqliteStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://satsang.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(database_url, "creating sqlite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    // Every connection to `:memory:` opens a separate database
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        5
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::debug!(max_connections, "sqlite pool ready");

    Ok(pool)
}
