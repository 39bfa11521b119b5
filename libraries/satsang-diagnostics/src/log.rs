//! Diagnostic log sink

use crate::config::DiagnosticsConfig;
use crate::entry::{LogEntry, LogLevel};
use satsang_core::storage::{read_json, write_json};
use satsang_core::KeyValueStore;
use satsang_storage::keys;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Bounded in-memory event log with a durable critical subset
///
/// Cheap to clone; clones share the same buffers. Recording never fails and
/// never blocks on storage: critical entries are persisted on a spawned task
/// when a tokio runtime is available, and persistence errors are dropped.
#[derive(Clone)]
pub struct DiagnosticLog {
    inner: Arc<Inner>,
}

struct Inner {
    config: DiagnosticsConfig,
    enabled: AtomicBool,
    entries: Mutex<VecDeque<LogEntry>>,
    critical: Arc<Mutex<VecDeque<LogEntry>>>,
    store: Option<Arc<dyn KeyValueStore>>,
    // Held by persistence tasks so the newest critical list is always written last
    persist_lock: Arc<tokio::sync::Mutex<()>>,
}

impl DiagnosticLog {
    /// Create a log that keeps everything in memory
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a log that also persists critical entries to `store`
    pub fn with_store(config: DiagnosticsConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self::build(config, Some(store))
    }

    fn build(config: DiagnosticsConfig, store: Option<Arc<dyn KeyValueStore>>) -> Self {
        let enabled = config.enabled;
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(VecDeque::with_capacity(config.max_entries)),
                critical: Arc::new(Mutex::new(VecDeque::new())),
                enabled: AtomicBool::new(enabled),
                config,
                store,
                persist_lock: Arc::new(tokio::sync::Mutex::new(())),
            }),
        }
    }

    /// Whether the log records anything
    pub fn is_debug_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// Turn recording on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn debug(&self, message: &str, data: Option<serde_json::Value>, source: Option<&str>) {
        self.record(LogEntry::new(LogLevel::Debug, message, data, source));
    }

    pub fn info(&self, message: &str, data: Option<serde_json::Value>, source: Option<&str>) {
        self.record(LogEntry::new(LogLevel::Info, message, data, source));
    }

    pub fn warn(&self, message: &str, data: Option<serde_json::Value>, source: Option<&str>) {
        self.record(LogEntry::new(LogLevel::Warn, message, data, source));
    }

    pub fn error(&self, message: &str, data: Option<serde_json::Value>, source: Option<&str>) {
        self.record(LogEntry::new(LogLevel::Error, message, data, source));
    }

    /// Append an entry
    pub fn record(&self, entry: LogEntry) {
        if !self.is_debug_enabled() {
            return;
        }

        let critical = self.is_critical(&entry);
        if let Ok(mut entries) = self.inner.entries.lock() {
            push_bounded(&mut entries, entry.clone(), self.inner.config.max_entries);
        }

        if critical {
            if let Ok(mut persisted) = self.inner.critical.lock() {
                push_bounded(&mut persisted, entry, self.inner.config.max_persisted);
            }
            self.schedule_persist();
        }
    }

    /// Errors and warnings always; info only when it matches the keyword allowlist
    pub fn is_critical(&self, entry: &LogEntry) -> bool {
        match entry.level {
            LogLevel::Error | LogLevel::Warn => true,
            LogLevel::Info => {
                let message = entry.message.to_lowercase();
                let source = entry.source.as_deref().unwrap_or("").to_lowercase();
                self.inner.config.keywords.iter().any(|keyword| {
                    let keyword = keyword.to_lowercase();
                    message.contains(&keyword) || source.contains(&keyword)
                })
            }
            LogLevel::Debug => false,
        }
    }

    /// Recent entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner
            .entries
            .lock()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Critical entries pending or already persisted, oldest first
    pub fn critical_entries(&self) -> Vec<LogEntry> {
        self.inner
            .critical
            .lock()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the in-memory ring buffer (the persisted subset is kept)
    pub fn clear(&self) {
        if let Ok(mut entries) = self.inner.entries.lock() {
            entries.clear();
        }
    }

    /// Load entries persisted by a previous session into the critical subset
    ///
    /// New critical entries are appended after them.
    pub async fn restore(&self) {
        let Some(store) = &self.inner.store else {
            return;
        };
        match read_json::<Vec<LogEntry>>(store.as_ref(), keys::DIAGNOSTIC_LOG).await {
            Ok(Some(previous)) => {
                if let Ok(mut critical) = self.inner.critical.lock() {
                    let current: Vec<LogEntry> = critical.drain(..).collect();
                    for entry in previous.into_iter().chain(current) {
                        push_bounded(&mut critical, entry, self.inner.config.max_persisted);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("[satsang-diagnostics] failed to restore log: {e}"),
        }
    }

    /// Write the critical subset now and wait for it
    pub async fn flush(&self) {
        if let Some(store) = &self.inner.store {
            persist(
                store.clone(),
                self.inner.critical.clone(),
                self.inner.persist_lock.clone(),
            )
            .await;
        }
    }

    /// Read a persisted log without constructing a sink
    pub async fn load_persisted(
        store: &dyn KeyValueStore,
    ) -> satsang_core::Result<Vec<LogEntry>> {
        Ok(read_json(store, keys::DIAGNOSTIC_LOG).await?.unwrap_or_default())
    }

    fn schedule_persist(&self) {
        let Some(store) = self.inner.store.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let critical = self.inner.critical.clone();
        let lock = self.inner.persist_lock.clone();
        handle.spawn(persist(store, critical, lock));
    }
}

async fn persist(
    store: Arc<dyn KeyValueStore>,
    critical: Arc<Mutex<VecDeque<LogEntry>>>,
    lock: Arc<tokio::sync::Mutex<()>>,
) {
    let _guard = lock.lock().await;
    let snapshot: Vec<LogEntry> = match critical.lock() {
        Ok(entries) => entries.iter().cloned().collect(),
        Err(_) => return,
    };
    // Logging the failure through tracing would feed it back into this sink
    if let Err(e) = write_json(store.as_ref(), keys::DIAGNOSTIC_LOG, &snapshot).await {
        eprintln!("[satsang-diagnostics] failed to persist log: {e}");
    }
}

fn push_bounded(buffer: &mut VecDeque<LogEntry>, entry: LogEntry, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while buffer.len() >= capacity {
        buffer.pop_front();
    }
    buffer.push_back(entry);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_entries: usize, max_persisted: usize) -> DiagnosticsConfig {
        DiagnosticsConfig {
            max_entries,
            max_persisted,
            ..DiagnosticsConfig::default()
        }
    }

    #[test]
    fn ring_buffer_drops_oldest() {
        let log = DiagnosticLog::new(config(3, 10));
        for i in 0..5 {
            log.debug(&format!("event {i}"), None, None);
        }

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn disabled_log_records_nothing() {
        let log = DiagnosticLog::new(config(10, 10));
        log.set_enabled(false);
        log.error("boom", None, None);

        assert!(log.entries().is_empty());
        assert!(log.critical_entries().is_empty());
    }

    #[test]
    fn critical_subset_selects_errors_warnings_and_keyword_info() {
        let log = DiagnosticLog::new(config(10, 10));
        log.debug("queue details", None, None);
        log.info("rendered home screen", None, Some("ui"));
        log.info("track loaded", None, Some("satsang_playback::controller"));
        log.warn("slow network", None, None);
        log.error("engine crashed", None, None);

        let critical: Vec<_> = log
            .critical_entries()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(critical, vec!["track loaded", "slow network", "engine crashed"]);
        assert_eq!(log.entries().len(), 5);
    }

    #[test]
    fn clear_keeps_critical_subset() {
        let log = DiagnosticLog::new(config(10, 10));
        log.error("boom", None, None);
        log.clear();

        assert!(log.entries().is_empty());
        assert_eq!(log.critical_entries().len(), 1);
    }
}
