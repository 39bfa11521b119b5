use super::{LoadRequest, NavigationOutcome, TrackQueueController};
use crate::policy::{Advance, Direction, QueueAdvancePolicy};
use crate::settings::EndOfQueue;
use satsang_core::{clamp_index, QueueSnapshot};
use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use std::time::Duration;
use tracing::{debug, error, info, warn};

impl TrackQueueController {
    pub async fn go_to_next_track(&self) -> NavigationOutcome {
        self.navigate(Direction::Next).await
    }

    /// No-op on the first track
    pub async fn go_to_previous_track(&self) -> NavigationOutcome {
        self.navigate(Direction::Previous).await
    }

    async fn navigate(&self, direction: Direction) -> NavigationOutcome {
        let Some(_permit) = self.transition_gate.try_acquire() else {
            warn!(?direction, "navigation rejected: transition already in progress");
            return NavigationOutcome::Rejected;
        };
        // A load the watchdog gave up on no longer blocks navigation
        let load_permit = if self.load_gate.is_held() {
            let Some(permit) = self.take_over_timed_out_load() else {
                warn!(?direction, "navigation rejected: queue load in progress");
                return NavigationOutcome::Rejected;
            };
            Some(permit)
        } else {
            None
        };

        let snapshot = self.shared.read(|s| s.snapshot());
        match QueueAdvancePolicy::advance(&snapshot, direction) {
            Advance::Moved(target) => self.step(direction, &target).await,
            Advance::EndOfQueue => {
                drop(load_permit);
                self.continue_past_end().await
            }
            Advance::StartOfQueue => {
                debug!("already at the first track");
                NavigationOutcome::NoOp
            }
            Advance::Empty => {
                debug!(?direction, "nothing queued");
                NavigationOutcome::NoOp
            }
        }
    }

    async fn step(&self, direction: Direction, target: &QueueSnapshot) -> NavigationOutcome {
        self.guard.begin_manual_navigation();
        self.flush_position().await;

        let skipped = match direction {
            Direction::Next => self.engine.skip_to_next().await,
            Direction::Previous => self.engine.skip_to_previous().await,
        };
        if let Err(e) = skipped {
            error!(?direction, error = %e, "engine skip failed");
            return NavigationOutcome::Failed {
                message: e.to_string(),
            };
        }

        if let Err(e) = self.engine.activate_session().await {
            warn!(error = %e, "failed to activate audio session");
        }
        let played = self.engine.play().await;

        // The engine's cursor is authoritative
        let reported = match self.engine.current_index().await {
            Ok(Some(index)) => index,
            Ok(None) => target.current_index,
            Err(e) => {
                warn!(error = %e, "could not read engine index after skip");
                target.current_index
            }
        };
        let (snapshot, track) = self.shared.update(|s| {
            s.current_index = clamp_index(reported, s.entries.len());
            s.position = Duration::ZERO;
            s.user_paused = false;
            s.is_playing = played.is_ok();
            if played.is_ok() {
                s.load_failed = false;
            }
            let track = s.current_track();
            if let Some(track) = &track {
                s.mark_played(&track.url);
            }
            (s.snapshot(), track)
        });

        if let Some(track) = &track {
            self.persister
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .start_track(&track.url);
        }
        if let Err(e) = self.snapshots.save(&snapshot).await {
            warn!(error = %e, "failed to persist queue index");
        }

        match played {
            Ok(()) => {
                info!(
                    ?direction,
                    index = snapshot.current_index,
                    track = track.as_ref().map(|t| t.title.as_str()),
                    "navigated"
                );
                NavigationOutcome::Moved {
                    index: snapshot.current_index,
                }
            }
            Err(e) => {
                error!(?direction, error = %e, "engine play failed after skip");
                NavigationOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Past the last track: stop, or continue with a catalog track
    async fn continue_past_end(&self) -> NavigationOutcome {
        let catalog = match (self.settings.end_of_queue, &self.catalog) {
            (EndOfQueue::CatalogFallback, Some(catalog)) => catalog,
            _ => {
                info!("end of queue, staying on the last track");
                return NavigationOutcome::NoOp;
            }
        };

        let exclude = self.shared.read(|s| {
            let mut urls = s.played_urls.clone();
            urls.extend(s.tracks.iter().map(|t| t.url.clone()));
            urls
        });
        match catalog.random_unplayed(&exclude).await {
            Ok(Some(track)) => {
                info!(url = %track.url, title = %track.title, "end of queue, continuing from catalog");
                self.guard.begin_manual_navigation();
                let outcome = self.load_playlist(LoadRequest::new(vec![track])).await;
                NavigationOutcome::CatalogFallback(outcome)
            }
            Ok(None) => {
                info!("end of queue and the catalog is exhausted");
                NavigationOutcome::NoOp
            }
            Err(e) => {
                warn!(error = %e, "catalog fallback failed");
                NavigationOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Pause if playing, otherwise resume
    pub async fn toggle_playback(&self) {
        let playing = match self.engine.state().await {
            Ok(state) => state.is_playing(),
            Err(e) => {
                warn!(error = %e, "engine state unavailable, using last known state");
                self.shared.read(|s| s.is_playing)
            }
        };

        if playing {
            self.pause().await;
        } else {
            self.resume().await;
        }
    }

    /// Reactivate the audio session and play; returns whether the engine accepted
    pub async fn resume(&self) -> bool {
        if let Err(e) = self.engine.activate_session().await {
            warn!(error = %e, "failed to activate audio session");
        }
        match self.engine.play().await {
            Ok(()) => {
                self.shared.update(|s| {
                    s.is_playing = true;
                    s.user_paused = false;
                });
                true
            }
            Err(e) => {
                error!(error = %e, "engine play failed");
                false
            }
        }
    }

    pub async fn pause(&self) {
        match self.engine.pause().await {
            Ok(()) => {
                self.shared.update(|s| {
                    s.is_playing = false;
                    s.user_paused = true;
                });
                self.flush_position().await;
            }
            Err(e) => error!(error = %e, "engine pause failed"),
        }
    }

    /// Seek within the current track, clamped to `[0, duration]`
    ///
    /// Returns the position actually sought to.
    pub async fn seek_to(&self, position: Duration) -> Option<Duration> {
        let track = self.shared.read(|s| s.current_track())?;
        let duration = match self.engine.duration().await {
            Ok(duration) if !duration.is_zero() => duration,
            _ => track.duration,
        };
        let target = position.min(duration);

        if let Err(e) = self.engine.seek_to(target).await {
            error!(target_ms = target.as_millis() as u64, error = %e, "engine seek failed");
            return None;
        }
        self.shared.update(|s| s.position = target);
        self.persist_position(&track, target, true).await;
        Some(target)
    }

    pub async fn seek_forward(&self) -> Option<Duration> {
        self.seek_forward_by(self.settings.seek_forward()).await
    }

    pub async fn seek_forward_by(&self, amount: Duration) -> Option<Duration> {
        let position = self.current_position().await;
        self.seek_to(position + amount).await
    }

    pub async fn seek_backward(&self) -> Option<Duration> {
        self.seek_backward_by(self.settings.seek_backward()).await
    }

    pub async fn seek_backward_by(&self, amount: Duration) -> Option<Duration> {
        let position = self.current_position().await;
        self.seek_to(position.saturating_sub(amount)).await
    }

    async fn current_position(&self) -> Duration {
        match self.engine.position().await {
            Ok(position) => position,
            Err(e) => {
                debug!(error = %e, "engine position unavailable");
                self.shared.read(|s| s.position)
            }
        }
    }

    /// Save the position and stop the engine
    pub async fn stop_playback(&self) {
        self.flush_position().await;
        if let Err(e) = self.engine.stop().await {
            error!(error = %e, "engine stop failed");
        }
        self.shared.update(|s| {
            s.is_playing = false;
            s.user_paused = true;
        });
    }

    /// Stop timers, save the position and destroy the engine
    ///
    /// Later calls do nothing.
    pub async fn cleanup(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        self.flush_position().await;
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
        let watchdog = self
            .load_watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        if let Err(e) = self.engine.destroy().await {
            warn!(error = %e, "engine destroy failed");
        }
        self.shared.update(|s| {
            s.is_playing = false;
            s.is_loading = false;
            s.pending = None;
            s.active_load_id = None;
            s.driving_load = None;
        });
        info!("playback controller cleaned up");
    }
}
