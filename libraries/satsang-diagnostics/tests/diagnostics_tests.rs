//! Diagnostics integration tests
//!
//! Covers the tracing layer and persistence of the critical subset.

use satsang_core::storage::write_json;
use satsang_core::KeyValueStore;
use satsang_diagnostics::{DiagnosticLog, DiagnosticsConfig, DiagnosticsLayer, LogEntry, LogLevel};
use satsang_storage::{keys, MemoryStore};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn test_layer_captures_message_fields_and_target() {
    let log = DiagnosticLog::new(DiagnosticsConfig::default());
    let subscriber = tracing_subscriber::registry().with(DiagnosticsLayer::new(log.clone()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "satsang_playback::controller", load_id = 7u64, url = "https://cdn/a.mp3", "queue loaded");
    });

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.message, "queue loaded");
    assert_eq!(entry.source.as_deref(), Some("satsang_playback::controller"));

    let data = entry.data.as_ref().unwrap();
    assert_eq!(data["load_id"], 7);
    assert_eq!(data["url"], "https://cdn/a.mp3");
}

#[test]
fn test_layer_respects_disabled_log() {
    let log = DiagnosticLog::new(DiagnosticsConfig {
        enabled: false,
        ..DiagnosticsConfig::default()
    });
    let subscriber = tracing_subscriber::registry().with(DiagnosticsLayer::new(log.clone()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::error!("engine failure");
    });

    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_flush_persists_only_critical_entries() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let log = DiagnosticLog::with_store(DiagnosticsConfig::default(), store.clone());

    log.debug("cursor moved", None, None);
    log.warn("load rejected", None, Some("satsang_playback::controller"));
    log.error("play failed", Some(serde_json::json!({"index": 2})), None);
    log.flush().await;

    let persisted = DiagnosticLog::load_persisted(store.as_ref()).await.unwrap();
    let messages: Vec<_> = persisted.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["load rejected", "play failed"]);
}

#[tokio::test]
async fn test_persisted_subset_is_bounded() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let log = DiagnosticLog::with_store(
        DiagnosticsConfig {
            max_persisted: 2,
            ..DiagnosticsConfig::default()
        },
        store.clone(),
    );

    for i in 0..5 {
        log.error(&format!("failure {i}"), None, None);
    }
    log.flush().await;

    let persisted = DiagnosticLog::load_persisted(store.as_ref()).await.unwrap();
    let messages: Vec<_> = persisted.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["failure 3", "failure 4"]);
}

#[tokio::test]
async fn test_restore_prepends_previous_session() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let previous = vec![LogEntry::new(
        LogLevel::Error,
        "previous session failure",
        None,
        None,
    )];
    write_json(store.as_ref(), keys::DIAGNOSTIC_LOG, &previous)
        .await
        .unwrap();

    let second = DiagnosticLog::with_store(DiagnosticsConfig::default(), store.clone());
    second.restore().await;
    second.warn("new session warning", None, None);
    second.flush().await;

    let persisted = DiagnosticLog::load_persisted(store.as_ref()).await.unwrap();
    let messages: Vec<_> = persisted.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["previous session failure", "new session warning"]
    );
}
