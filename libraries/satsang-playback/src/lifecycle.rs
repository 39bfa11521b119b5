//! Foreground/background lifecycle coordination

use crate::controller::TrackQueueController;
use crate::engine::PlaybackEngine;
use crate::policy::AutoResumePolicy;
use crate::settings::PlaybackSettings;
use satsang_core::AppState;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Reacts to app lifecycle transitions
///
/// Returning to the foreground restarts a periodic playback watchdog and
/// re-registers remote capabilities, which some platforms drop while the app
/// is in the background. Leaving the foreground only logs a snapshot.
///
/// A coordinator built with [`LifecycleCoordinator::new`] starts in
/// [`AppState::Active`] with the watchdog stopped; [`LifecycleCoordinator::start`]
/// also starts the watchdog.
pub struct LifecycleCoordinator {
    controller: Arc<TrackQueueController>,
    engine: Arc<dyn PlaybackEngine>,
    policy: AutoResumePolicy,
    interval: Duration,
    app_state: Mutex<AppState>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleCoordinator {
    pub fn new(
        controller: Arc<TrackQueueController>,
        engine: Arc<dyn PlaybackEngine>,
        settings: &PlaybackSettings,
    ) -> Self {
        Self {
            controller,
            engine,
            policy: AutoResumePolicy::new(settings.auto_resume_first_load),
            interval: settings.lifecycle_watchdog_interval(),
            app_state: Mutex::new(AppState::Active),
            watchdog: Mutex::new(None),
        }
    }

    /// Start the watchdog for an app that launches in the foreground
    #[must_use]
    pub fn start(self) -> Self {
        self.start_watchdog();
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AutoResumePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn app_state(&self) -> AppState {
        *self.app_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn on_app_state_change(&self, next: AppState) {
        let previous = std::mem::replace(
            &mut *self.app_state.lock().unwrap_or_else(PoisonError::into_inner),
            next,
        );
        self.controller.note_app_state(next);
        if previous == next {
            return;
        }

        match (previous.is_active(), next.is_active()) {
            (false, true) => {
                info!(from = %previous, to = %next, "app returned to foreground");
                self.start_watchdog();
                self.controller.reassert_capabilities().await;
            }
            (true, false) => {
                self.stop_watchdog();
                let state = self.controller.state();
                info!(
                    from = %previous,
                    to = %next,
                    track = state.current_track.as_ref().map(|t| t.title.as_str()),
                    index = state.current_index,
                    is_playing = state.is_playing,
                    is_loading = state.is_loading,
                    position_ms = state.position.as_millis() as u64,
                    stage = state.pending.as_ref().map(|p| p.stage.to_string()),
                    "app left foreground"
                );
            }
            _ => debug!(from = %previous, to = %next, "app state changed"),
        }
    }

    /// (Re)start the periodic playback watchdog
    pub fn start_watchdog(&self) {
        let controller = Arc::clone(&self.controller);
        let engine = Arc::clone(&self.engine);
        let policy = self.policy;
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                check_playback(&controller, engine.as_ref(), policy).await;
            }
        });

        let previous = self
            .watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn stop_watchdog(&self) {
        let handle = self
            .watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    pub fn is_watchdog_running(&self) -> bool {
        self.watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Run one watchdog check now; returns whether playback was resumed
    pub async fn check_playback(&self) -> bool {
        check_playback(&self.controller, self.engine.as_ref(), self.policy).await
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        self.stop_watchdog();
    }
}

async fn check_playback(
    controller: &TrackQueueController,
    engine: &dyn PlaybackEngine,
    policy: AutoResumePolicy,
) -> bool {
    let state = match engine.state().await {
        Ok(state) => state,
        Err(e) => {
            debug!(error = %e, "watchdog could not read engine state");
            return false;
        }
    };
    if !policy.should_resume(state, &controller.session_facts()) {
        return false;
    }

    info!(?state, "first load is ready but idle, resuming playback");
    controller.resume().await
}
