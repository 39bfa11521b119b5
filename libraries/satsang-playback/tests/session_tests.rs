//! End-to-end sessions on the headless engine

use satsang_core::{KeyValueStore, Track};
use satsang_diagnostics::{DiagnosticLog, DiagnosticsConfig, DiagnosticsLayer};
use satsang_playback::{
    BackgroundService, HeadlessEngine, LibraryCatalog, LoadOutcome, LoadRequest,
    NavigationOutcome, PlaybackEngine, PlaybackSettings, TrackQueueController,
};
use satsang_storage::positions::PositionStore;
use satsang_storage::{MemoryStore, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;

fn lecture(name: &str, secs: f64) -> Track {
    Track::new(format!("https://cdn.example/{name}.mp3"), name)
        .with_artist("Swami")
        .with_duration_secs(secs)
}

async fn run_for(total: Duration) {
    let step = Duration::from_millis(250);
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        tokio::time::advance(step).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        elapsed += step;
    }
}

#[tokio::test(start_paused = true)]
async fn queue_plays_through_and_continues_from_catalog() {
    let log = DiagnosticLog::new(DiagnosticsConfig::default());
    let subscriber = tracing_subscriber::registry().with(DiagnosticsLayer::new(log.clone()));
    let _default = tracing::subscriber::set_default(subscriber);

    let engine = Arc::new(HeadlessEngine::new());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let settings = PlaybackSettings::default();
    let catalog = Arc::new(LibraryCatalog::new(vec![
        lecture("A", 2.0),
        lecture("B", 2.0),
        lecture("Z", 2.0),
    ]));

    let controller = TrackQueueController::new(engine.clone(), store.clone(), settings.clone())
        .start();
    let service = Arc::new(
        BackgroundService::new(
            engine.clone(),
            store.clone(),
            controller.navigation_guard(),
            &settings,
        )
        .with_catalog(catalog),
    );
    let _service_task = service.spawn();

    let outcome = controller
        .load_playlist(LoadRequest::new(vec![lecture("A", 2.0), lecture("B", 2.0)]))
        .await;
    assert!(outcome.is_loaded());
    engine.spawn_clock(Duration::from_millis(250));

    run_for(Duration::from_secs(3)).await;
    let state = controller.state();
    assert_eq!(state.current_index, 1);
    assert_eq!(state.current_track.unwrap().title, "B");

    run_for(Duration::from_secs(2)).await;
    let state = controller.state();
    assert_eq!(state.queue_len, 3);
    assert_eq!(state.current_track.unwrap().title, "Z");
    assert!(state.is_playing);

    // Nothing left in the catalog after Z
    run_for(Duration::from_secs(3)).await;
    assert!(!controller.state().is_playing);

    let messages: Vec<String> = log.entries().into_iter().map(|e| e.message).collect();
    assert!(messages.iter().any(|m| m == "queue load complete"));
    assert!(messages.iter().any(|m| m == "queue continued from catalog"));
    assert!(log
        .critical_entries()
        .iter()
        .any(|e| e.message == "engine queue ended"));

    controller.cleanup().await;
}

#[tokio::test]
async fn session_survives_restart_on_sqlite() {
    let temp_dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", temp_dir.path().join("satsang.db").display());

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&url).await.unwrap());
        let engine = Arc::new(HeadlessEngine::new());
        let controller =
            TrackQueueController::new(engine.clone(), store, PlaybackSettings::default());

        let outcome = controller
            .load_playlist(
                LoadRequest::new(vec![lecture("A", 600.0), lecture("B", 600.0)]).paused(),
            )
            .await;
        assert!(outcome.is_loaded());
        assert_eq!(
            controller.go_to_next_track().await,
            NavigationOutcome::Moved { index: 1 }
        );
        controller.pause().await;
        assert_eq!(
            controller.seek_to(Duration::from_secs(45)).await,
            Some(Duration::from_secs(45))
        );
        controller.cleanup().await;
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&url).await.unwrap());
    let positions = PositionStore::new(store.clone());
    assert_eq!(
        positions.get("https://cdn.example/B.mp3").await.unwrap(),
        Some(45_000)
    );

    let engine = Arc::new(HeadlessEngine::new());
    let controller = TrackQueueController::new(engine.clone(), store, PlaybackSettings::default());
    let outcome = controller.restore_session().await;

    assert!(matches!(
        outcome,
        Some(LoadOutcome::Loaded {
            index: 1,
            playing: false,
            ..
        })
    ));
    assert_eq!(engine.position().await.unwrap(), Duration::from_secs(45));
    assert_eq!(controller.state().current_track.unwrap().title, "B");
}

#[tokio::test]
async fn critical_log_entries_reach_storage() {
    let temp_dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", temp_dir.path().join("satsang.db").display());
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&url).await.unwrap());

    let log = DiagnosticLog::with_store(DiagnosticsConfig::default(), store.clone());
    let subscriber = tracing_subscriber::registry().with(DiagnosticsLayer::new(log.clone()));
    let _default = tracing::subscriber::set_default(subscriber);

    let controller = TrackQueueController::new(
        Arc::new(HeadlessEngine::new()),
        store.clone(),
        PlaybackSettings::default(),
    );
    assert!(!controller.load_playlist(LoadRequest::new(Vec::new())).await.is_loaded());
    log.flush().await;

    let persisted = DiagnosticLog::load_persisted(store.as_ref()).await.unwrap();
    assert!(persisted
        .iter()
        .any(|e| e.message == "queue load rejected: empty playlist"));
}
