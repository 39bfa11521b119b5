use super::TrackQueueController;
use crate::engine::{EngineEvent, EngineState, EngineTrack, MetadataPatch};
use std::sync::PoisonError;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Measured and enqueued durations closer than this are left alone
const DURATION_TOLERANCE: Duration = Duration::from_secs(1);

impl TrackQueueController {
    /// Apply one engine event
    ///
    /// Track changes are matched against the active load through the
    /// entry's `load_id`; events from a superseded load are ignored.
    pub async fn handle_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::TrackChanged { index, track } => self.on_track_changed(index, track).await,
            EngineEvent::StateChanged(state) => self.on_state_changed(state),
            EngineEvent::Error { message } => self.on_engine_error(&message).await,
            EngineEvent::QueueEnded { index } => {
                info!(?index, "engine queue ended");
                self.shared.update(|s| s.is_playing = false);
            }
        }
    }

    async fn on_track_changed(&self, index: Option<usize>, track: Option<EngineTrack>) {
        let Some(track) = track else {
            debug!("engine cursor cleared");
            return;
        };

        let mut appended = false;
        let moved = self.shared.update(|s| {
            if s.active_load_id != Some(track.load_id) {
                debug!(
                    event_load_id = track.load_id,
                    active_load_id = ?s.active_load_id,
                    "ignoring track change from a superseded load"
                );
                return None;
            }

            let index = index.or_else(|| s.entries.iter().position(|e| e.id == track.id))?;
            if index == s.entries.len() {
                // Appended behind our back by the background service
                s.tracks.push(track.to_track());
                s.entries.push(track.clone());
                appended = true;
            }
            if index >= s.entries.len() || index == s.current_index {
                return None;
            }

            s.current_index = index;
            s.position = Duration::ZERO;
            s.mark_played(&track.url);
            Some(s.snapshot())
        });

        if appended {
            // Queue length changed
            self.reassert_capabilities().await;
        }
        let Some(snapshot) = moved else {
            return;
        };
        info!(index = snapshot.current_index, track = %track.title, "track changed");
        self.persister
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .start_track(&track.url);
        if let Err(e) = self.snapshots.save(&snapshot).await {
            warn!(error = %e, "failed to persist queue index");
        }
    }

    fn on_state_changed(&self, state: EngineState) {
        let load_id = self.shared.update(|s| {
            s.is_playing = state.is_playing();
            let active = s.active_load_id;
            if let Some(pending) = s.pending.as_mut().filter(|p| Some(p.load_id) == active) {
                pending.record_state(state);
            }
            active
        });
        debug!(?state, "engine state changed");

        if let (true, Some(load_id)) = (state.is_playing(), load_id) {
            self.confirm_playing(load_id);
        }
    }

    /// Count consecutive errors; skip forward once they persist
    async fn on_engine_error(&self, message: &str) {
        let threshold = self.settings.max_consecutive_errors;
        let (count, give_up) = self.shared.update(|s| {
            s.is_playing = false;
            s.consecutive_errors += 1;
            let count = s.consecutive_errors;
            let give_up = count >= threshold;
            if give_up {
                s.consecutive_errors = 0;
            }
            (count, give_up)
        });
        error!(count, message, "engine playback error");

        if give_up {
            warn!(count, "playback keeps failing, moving to the next track");
            let outcome = self.go_to_next_track().await;
            debug!(?outcome, "error fallback navigation");
        }
    }

    /// Sample the engine position once (the ticker calls this every throttle period)
    pub async fn sample_progress(&self) {
        let (playing, index, track) =
            self.shared
                .read(|s| (s.is_playing, s.current_index, s.current_track()));
        let Some(track) = track.filter(|_| playing) else {
            return;
        };

        let position = match self.engine.position().await {
            Ok(position) => position,
            Err(e) => {
                debug!(error = %e, "position unavailable");
                return;
            }
        };
        self.shared.update(|s| s.position = position);
        self.persist_position(&track, position, false).await;
        self.refine_duration(index, &track).await;
    }

    /// Feed one sample of the position stream
    pub async fn report_position(&self, position: Duration) {
        let Some(track) = self.shared.update(|s| {
            s.position = position;
            s.current_track()
        }) else {
            return;
        };
        self.persist_position(&track, position, false).await;
    }

    /// Write the current position now, bypassing the throttle
    pub async fn flush_position(&self) {
        let Some(track) = self.shared.read(|s| s.current_track()) else {
            return;
        };
        let position = match self.engine.position().await {
            Ok(position) => position,
            Err(_) => self.shared.read(|s| s.position),
        };
        self.persist_position(&track, position, true).await;
    }

    pub(super) async fn persist_position(&self, track: &EngineTrack, position: Duration, force: bool) {
        let write = self
            .persister
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(&track.url, position, force);
        if !write {
            return;
        }

        let position_ms = position.as_millis() as u64;
        match self.positions.upsert(&track.title, &track.url, position_ms).await {
            Ok(()) => debug!(url = %track.url, position_ms, force, "position saved"),
            Err(e) => warn!(url = %track.url, error = %e, "failed to save position"),
        }
    }

    /// Replace the enqueued duration with the measured one
    async fn refine_duration(&self, index: usize, track: &EngineTrack) {
        let measured = match self.engine.duration().await {
            Ok(duration) if !duration.is_zero() => duration,
            _ => return,
        };
        let diff = if measured > track.duration {
            measured - track.duration
        } else {
            track.duration - measured
        };
        if diff <= DURATION_TOLERANCE {
            return;
        }

        if let Err(e) = self
            .engine
            .update_metadata_for_track(index, MetadataPatch::duration(measured))
            .await
        {
            warn!(index, error = %e, "failed to update track duration");
            return;
        }

        self.shared.update(|s| {
            let matches = s.entries.get(index).is_some_and(|e| e.id == track.id);
            if !matches {
                return;
            }
            if let Some(entry) = s.entries.get_mut(index) {
                entry.duration = measured;
            }
            if let Some(source) = s.tracks.get_mut(index) {
                source.duration_secs = Some(measured.as_secs_f64());
            }
        });
        info!(
            index,
            enqueued_ms = track.duration.as_millis() as u64,
            measured_ms = measured.as_millis() as u64,
            "refined track duration"
        );
    }
}
