//! Headless playback session

use anyhow::Context;
use satsang_core::{KeyValueStore, Track};
use satsang_playback::{
    BackgroundService, HeadlessEngine, LibraryCatalog, LifecycleCoordinator, LoadOutcome,
    LoadRequest, PlaybackSettings, PlayerState, TrackQueueController,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const CLOCK_PERIOD: Duration = Duration::from_millis(250);

pub struct SimulateArgs {
    pub urls: Vec<String>,
    pub catalog: Vec<String>,
    pub start: usize,
    pub track_secs: f64,
    pub resume: bool,
    pub seconds: u64,
}

/// The parts of [`PlayerState`] worth printing when they change
#[derive(Debug, Clone, PartialEq, Eq)]
struct Transition {
    index: usize,
    queue_len: usize,
    title: Option<String>,
    playing: bool,
    loading: bool,
    failed: bool,
}

impl From<&PlayerState> for Transition {
    fn from(state: &PlayerState) -> Self {
        Self {
            index: state.current_index,
            queue_len: state.queue_len,
            title: state.current_track.as_ref().map(|t| t.title.clone()),
            playing: state.is_playing,
            loading: state.is_loading,
            failed: state.load_failed,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.failed {
            "failed"
        } else if self.loading {
            "loading"
        } else if self.playing {
            "playing"
        } else {
            "paused"
        };
        match &self.title {
            Some(title) => write!(
                f,
                "[{}/{}] {title} ({status})",
                self.index + 1,
                self.queue_len
            ),
            None => write!(f, "[-/{}] nothing loaded ({status})", self.queue_len),
        }
    }
}

/// Title from the last path segment, without extension
fn title_from_url(url: &str) -> String {
    let file = url.rsplit('/').next().unwrap_or(url);
    file.split('.').next().filter(|s| !s.is_empty()).unwrap_or(file).to_string()
}

fn tracks_from_urls(urls: &[String], secs: f64) -> Vec<Track> {
    urls.iter()
        .map(|url| Track::new(url.clone(), title_from_url(url)).with_duration_secs(secs))
        .collect()
}

pub async fn run(
    store: Arc<dyn KeyValueStore>,
    settings: PlaybackSettings,
    args: SimulateArgs,
) -> anyhow::Result<()> {
    let engine = Arc::new(HeadlessEngine::new());
    let catalog = Arc::new(LibraryCatalog::new(tracks_from_urls(
        &args.catalog,
        args.track_secs,
    )));

    let controller = TrackQueueController::new(engine.clone(), store.clone(), settings.clone())
        .with_catalog(catalog.clone())
        .start();
    let service = Arc::new(
        BackgroundService::new(
            engine.clone(),
            store,
            controller.navigation_guard(),
            &settings,
        )
        .with_catalog(catalog),
    );
    let service_task = service.spawn();
    let lifecycle =
        LifecycleCoordinator::new(controller.clone(), engine.clone(), &settings).start();
    engine.spawn_clock(CLOCK_PERIOD);

    let outcome = if args.resume {
        controller
            .restore_session()
            .await
            .context("no saved session to resume")?
    } else {
        let request =
            LoadRequest::new(tracks_from_urls(&args.urls, args.track_secs)).start_at(args.start);
        controller.load_playlist(request).await
    };

    match outcome {
        LoadOutcome::Loaded { playing: false, .. } => {
            controller.resume().await;
        }
        LoadOutcome::Loaded { .. } => {}
        LoadOutcome::Rejected(reason) => anyhow::bail!("load rejected: {reason:?}"),
        LoadOutcome::Superseded { load_id } => anyhow::bail!("load {load_id} was superseded"),
        LoadOutcome::Failed { step, message, .. } => {
            anyhow::bail!("load failed at {}: {message}", step.as_str())
        }
    }

    let mut states = controller.subscribe();
    let mut last = Transition::from(&*states.borrow_and_update());
    println!("{last}");

    let deadline = tokio::time::sleep(Duration::from_secs(args.seconds));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, ctrl_c);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            _ = &mut ctrl_c => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = Transition::from(&*states.borrow_and_update());
                if next != last {
                    println!("{next}");
                    last = next;
                }
            }
        }
    }

    lifecycle.stop_watchdog();
    controller.cleanup().await;
    service_task.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_come_from_file_names() {
        assert_eq!(title_from_url("https://cdn/gita/class-01.mp3"), "class-01");
        assert_eq!(title_from_url("https://cdn/stream"), "stream");
        assert_eq!(title_from_url("https://cdn/.hidden"), ".hidden");
    }

    #[test]
    fn transition_display() {
        let transition = Transition {
            index: 1,
            queue_len: 3,
            title: Some("class-02".to_string()),
            playing: true,
            loading: false,
            failed: false,
        };
        assert_eq!(transition.to_string(), "[2/3] class-02 (playing)");

        let idle = Transition {
            title: None,
            playing: false,
            ..transition
        };
        assert_eq!(idle.to_string(), "[-/3] nothing loaded (paused)");
    }
}
