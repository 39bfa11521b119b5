//! Satsang Player Diagnostics
//!
//! Append-only, size-bounded event log used to trace playback state
//! transitions on devices where attaching a debugger is impractical.
//!
//! - [`DiagnosticLog`]: the sink. A ring buffer of recent entries plus a
//!   durable subset of critical entries (errors, warnings, and info entries
//!   matching a keyword allowlist) persisted asynchronously.
//! - [`DiagnosticsLayer`]: a `tracing_subscriber` layer that feeds every
//!   `tracing` event into the sink, so the rest of the workspace only ever
//!   logs through `tracing`.
//!
//! # Example
//!
//! ```rust
//! use satsang_diagnostics::{DiagnosticLog, DiagnosticsConfig, DiagnosticsLayer};
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let log = DiagnosticLog::new(DiagnosticsConfig::default());
//! let subscriber = tracing_subscriber::registry().with(DiagnosticsLayer::new(log.clone()));
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::warn!(load_id = 3, "queue load rejected");
//! });
//!
//! assert_eq!(log.entries().len(), 1);
//! ```

mod config;
mod entry;
mod layer;
mod log;

pub use config::DiagnosticsConfig;
pub use entry::{LogEntry, LogLevel};
pub use layer::DiagnosticsLayer;
pub use log::DiagnosticLog;
