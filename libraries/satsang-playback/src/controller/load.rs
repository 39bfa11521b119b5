use super::{LoadOutcome, LoadRejection, LoadRequest, Shared, TrackQueueController};
use crate::engine::{EngineState, EngineTrack, MetadataPatch};
use crate::error::PlaybackError;
use crate::pending::{LoadStep, PendingPlaybackContext, PlaybackStage};
use satsang_core::{QueueSnapshot, Track};
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

impl TrackQueueController {
    /// Replace the whole queue and optionally start playback
    ///
    /// Engine calls run strictly in order: reset, add, capability
    /// registration, skip to the selected index, lock-screen metadata, seek to
    /// the saved position, then play. A second load while this one is in
    /// flight is rejected without side effects.
    pub async fn load_playlist(&self, request: LoadRequest) -> LoadOutcome {
        if self.is_shut_down() {
            warn!("queue load rejected: controller is shut down");
            return LoadOutcome::Rejected(LoadRejection::ShutDown);
        }
        if request.tracks.is_empty() {
            warn!("queue load rejected: empty playlist");
            return LoadOutcome::Rejected(LoadRejection::EmptyPlaylist);
        }
        let Some(_permit) = self
            .load_gate
            .try_acquire()
            .or_else(|| self.take_over_timed_out_load())
        else {
            warn!(
                tracks = request.tracks.len(),
                "queue load rejected: another load is in flight"
            );
            return LoadOutcome::Rejected(LoadRejection::Busy);
        };

        let playable: Vec<(usize, &Track)> = request
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.is_playable())
            .collect();
        if playable.is_empty() {
            warn!(
                tracks = request.tracks.len(),
                "queue load rejected: no track has a stream URL"
            );
            return LoadOutcome::Rejected(LoadRejection::NoPlayableTracks);
        }
        let dropped = request.tracks.len() - playable.len();
        if dropped > 0 {
            warn!(dropped, "dropping queue entries without a stream URL");
        }

        // The requested entry, or the next playable one after it
        let start = request.start_index.min(request.tracks.len() - 1);
        let index = playable
            .iter()
            .position(|(original, _)| *original >= start)
            .unwrap_or(playable.len() - 1);

        let load_id = self.load_ids.fetch_add(1, Ordering::SeqCst) + 1;
        let entries: Vec<EngineTrack> = playable
            .iter()
            .filter_map(|(original, track)| EngineTrack::from_track(track, *original, load_id))
            .collect();
        let tracks: Vec<Track> = playable.iter().map(|(_, track)| (*track).clone()).collect();
        let selected = entries[index].clone();

        self.shared.update(|s| {
            s.tracks.clone_from(&tracks);
            s.entries.clone_from(&entries);
            s.current_index = index;
            s.active_load_id = Some(load_id);
            s.driving_load = Some(load_id);
            s.pending = Some(PendingPlaybackContext::new(
                load_id,
                selected.id.clone(),
                &selected.title,
                s.app_state,
                request.should_play,
                request.saved_position,
            ));
            s.is_loading = true;
            s.is_playing = false;
            s.load_failed = false;
            s.position = request.saved_position;
            s.last_request = Some(request.clone());
            s.play_requested = request.should_play;
            s.user_paused = false;
            s.consecutive_errors = 0;
        });
        info!(
            load_id,
            tracks = entries.len(),
            index,
            track = %selected.title,
            should_play = request.should_play,
            saved_position_ms = request.saved_position.as_millis() as u64,
            "queue load accepted"
        );

        self.arm_load_watchdog(load_id);
        self.persister
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .start_track(&selected.url);

        if let Err(e) = self.snapshots.save(&QueueSnapshot::new(tracks, index)).await {
            warn!(load_id, error = %e, "failed to persist queue snapshot");
        }

        match self.drive_load(load_id, index, &selected, entries, &request).await {
            Ok(playing) => self.finish_load(load_id, index, &selected.url, playing),
            Err(Interrupted::Failed(step, e)) => self.fail_load(load_id, step, &e),
            Err(Interrupted::Superseded) => abandon_load(load_id),
        }
    }

    /// Issue the engine calls of one load
    ///
    /// Stops as soon as the load no longer owns the engine.
    async fn drive_load(
        &self,
        load_id: u64,
        index: usize,
        selected: &EngineTrack,
        entries: Vec<EngineTrack>,
        request: &LoadRequest,
    ) -> Result<bool, Interrupted> {
        self.engine
            .reset()
            .await
            .map_err(|e| Interrupted::Failed(LoadStep::Reset, e))?;
        self.ensure_driving(load_id)?;
        self.engine
            .add(entries)
            .await
            .map_err(|e| Interrupted::Failed(LoadStep::Add, e))?;
        self.ensure_driving(load_id)?;
        self.reassert_capabilities().await;
        self.ensure_driving(load_id)?;

        // By index: ids may repeat across loads
        self.engine
            .skip(index)
            .await
            .map_err(|e| Interrupted::Failed(LoadStep::Skip, e))?;
        self.ensure_driving(load_id)?;
        self.advance_stage(load_id, PlaybackStage::TrackSelected);

        if let Err(e) = self
            .engine
            .update_metadata_for_track(index, MetadataPatch::from(selected))
            .await
        {
            warn!(load_id, index, error = %e, "failed to prime lock-screen metadata");
        }
        self.ensure_driving(load_id)?;
        self.advance_stage(load_id, PlaybackStage::MetadataPrimed);

        if !request.saved_position.is_zero() {
            self.engine
                .seek_to(request.saved_position)
                .await
                .map_err(|e| Interrupted::Failed(LoadStep::Seek, e))?;
            self.ensure_driving(load_id)?;
        }
        self.advance_stage(load_id, PlaybackStage::PositionRestored);

        if !request.should_play {
            self.advance_stage(load_id, PlaybackStage::InitializedNoPlay);
            return Ok(false);
        }

        if let Err(e) = self.engine.activate_session().await {
            warn!(load_id, error = %e, "failed to activate audio session");
        }
        self.ensure_driving(load_id)?;
        self.advance_stage(load_id, PlaybackStage::PlayRequested);
        self.engine
            .play()
            .await
            .map_err(|e| Interrupted::Failed(LoadStep::Play, e))?;
        self.ensure_driving(load_id)?;
        self.advance_stage(load_id, PlaybackStage::PlayResolved);

        let playing = matches!(self.engine.state().await, Ok(EngineState::Playing));
        self.ensure_driving(load_id)?;
        if playing {
            self.confirm_playing(load_id);
        }
        Ok(playing)
    }

    fn ensure_driving(&self, load_id: u64) -> Result<(), Interrupted> {
        if self.shared.read(|s| s.is_driving(load_id)) {
            Ok(())
        } else {
            Err(Interrupted::Superseded)
        }
    }

    /// Load a single track
    ///
    /// Without an explicit `start_position` playback resumes from the
    /// position saved for the track's URL.
    pub async fn load_track(
        &self,
        track: Track,
        should_play: bool,
        start_position: Option<Duration>,
    ) -> LoadOutcome {
        let position = match start_position {
            Some(position) => position,
            None => self.saved_position(&track.url).await,
        };
        self.load_playlist(
            LoadRequest::new(vec![track])
                .resume_from(position)
                .with_play(should_play),
        )
        .await
    }

    /// Re-issue the most recent load request
    pub async fn retry_last_load(&self) -> Option<LoadOutcome> {
        let request = self.shared.read(|s| s.last_request.clone());
        let Some(request) = request else {
            debug!("nothing to retry");
            return None;
        };
        info!(tracks = request.tracks.len(), "retrying last queue load");
        Some(self.load_playlist(request).await)
    }

    /// Reload the persisted queue paused at the saved position
    pub async fn restore_session(&self) -> Option<LoadOutcome> {
        let snapshot = match self.snapshots.load().await {
            Ok(Some(snapshot)) if !snapshot.is_empty() => snapshot,
            Ok(_) => {
                debug!("no saved queue to restore");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "failed to read saved queue");
                return None;
            }
        };

        let position = match snapshot.current() {
            Some(track) => self.saved_position(&track.url).await,
            None => Duration::ZERO,
        };
        info!(
            tracks = snapshot.len(),
            index = snapshot.current_index,
            position_ms = position.as_millis() as u64,
            "restoring saved queue"
        );

        let request = LoadRequest::new(snapshot.tracks)
            .start_at(snapshot.current_index)
            .resume_from(position)
            .paused();
        Some(self.load_playlist(request).await)
    }

    pub(super) async fn saved_position(&self, url: &str) -> Duration {
        match self.positions.get(url).await {
            Ok(Some(ms)) => Duration::from_millis(ms),
            Ok(None) => Duration::ZERO,
            Err(e) => {
                warn!(url, error = %e, "failed to read saved position");
                Duration::ZERO
            }
        }
    }

    fn advance_stage(&self, load_id: u64, stage: PlaybackStage) {
        self.shared.update(|s| {
            if let Some(pending) = s.pending.as_mut().filter(|p| p.load_id == load_id) {
                if pending.advance(stage) {
                    debug!(load_id, stage = %stage, "load stage");
                }
            }
        });
    }

    /// The engine reports playing for `load_id`
    pub(super) fn confirm_playing(&self, load_id: u64) {
        self.shared.update(|s| {
            s.is_playing = true;
            s.consecutive_errors = 0;
            let Some(pending) = s.pending.as_mut().filter(|p| p.load_id == load_id) else {
                return;
            };
            pending.record_state(EngineState::Playing);
            if pending.stage.awaits_confirmation() && pending.advance(PlaybackStage::StatePlaying)
            {
                info!(load_id, "playback confirmed");
            }
        });
    }

    fn finish_load(&self, load_id: u64, index: usize, url: &str, playing: bool) -> LoadOutcome {
        let finished = self.shared.update(|s| {
            if !s.is_driving(load_id) {
                return false;
            }
            s.driving_load = None;
            s.is_loading = false;
            s.load_failed = false;
            s.loads_completed += 1;
            s.mark_played(url);
            true
        });
        if !finished {
            return abandon_load(load_id);
        }
        self.disarm_load_watchdog();
        info!(load_id, index, playing, "queue load complete");
        LoadOutcome::Loaded {
            load_id,
            index,
            playing,
        }
    }

    /// Abort the load but leave the selected track on screen
    fn fail_load(&self, load_id: u64, step: LoadStep, err: &PlaybackError) -> LoadOutcome {
        let failed = self.shared.update(|s| {
            if !s.is_driving(load_id) {
                return false;
            }
            if let Some(pending) = s.pending.as_mut().filter(|p| p.load_id == load_id) {
                pending.advance(PlaybackStage::Failed(step));
            }
            s.driving_load = None;
            s.is_loading = false;
            s.is_playing = false;
            s.load_failed = true;
            true
        });
        if !failed {
            debug!(load_id, step = step.as_str(), error = %err, "superseded load failed late");
            return abandon_load(load_id);
        }
        self.disarm_load_watchdog();
        error!(load_id, step = step.as_str(), error = %err, "queue load failed");
        LoadOutcome::Failed {
            load_id,
            step,
            message: err.to_string(),
        }
    }

    fn arm_load_watchdog(&self, load_id: u64) {
        let shared = Arc::clone(&self.shared);
        let timeout = self.settings.load_timeout();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expire_load(&shared, load_id, timeout);
        });
        let previous = self
            .load_watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn disarm_load_watchdog(&self) {
        let handle = self
            .load_watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Why a load stopped before completing
enum Interrupted {
    Failed(LoadStep, PlaybackError),
    Superseded,
}

/// A load the watchdog gave up on came back after another request took over
fn abandon_load(load_id: u64) -> LoadOutcome {
    info!(load_id, "timed-out queue load returned, keeping the newer state");
    LoadOutcome::Superseded { load_id }
}

/// The engine never finished `load_id`: stop showing a spinner
fn expire_load(shared: &Shared, load_id: u64, timeout: Duration) {
    let expired = shared.update(|s| {
        if !s.is_driving(load_id) || !s.is_loading {
            return false;
        }
        s.is_loading = false;
        s.load_failed = true;
        if let Some(pending) = s.pending.as_mut() {
            pending.timed_out = true;
        }
        true
    });
    if expired {
        warn!(
            load_id,
            timeout_ms = timeout.as_millis() as u64,
            "queue load timed out, showing selected track unconfirmed"
        );
    }
}
