//! Background remote-control service
//!
//! Lock-screen and notification controls may be delivered to a separate
//! execution context than the UI. The service therefore works from the
//! persisted queue snapshot rather than the controller's memory, and routes
//! next/previous through the same [`QueueAdvancePolicy`] the controller uses.

use crate::engine::{EngineEvent, EngineTrack, PlaybackEngine};
use crate::error::Result;
use crate::guard::NavigationGuard;
use crate::policy::{Advance, Direction, QueueAdvancePolicy};
use crate::settings::{EndOfQueue, PlaybackSettings};
use satsang_core::{CatalogSource, KeyValueStore, LastPlayed, QueueSnapshot};
use satsang_storage::last_played;
use satsang_storage::snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Transport command from the OS media controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEvent {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Handled,
    /// Nothing to do (start/end of queue, empty catalog)
    NoOp,
    /// Deferred to a manual navigation in progress
    Suppressed,
    Failed(String),
}

pub struct BackgroundService {
    engine: Arc<dyn PlaybackEngine>,
    store: Arc<dyn KeyValueStore>,
    snapshots: SnapshotStore,
    guard: Arc<NavigationGuard>,
    catalog: Option<Arc<dyn CatalogSource>>,
    end_of_queue: EndOfQueue,
}

impl BackgroundService {
    /// `guard` must be the controller's guard when both run in one process
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        store: Arc<dyn KeyValueStore>,
        guard: Arc<NavigationGuard>,
        settings: &PlaybackSettings,
    ) -> Self {
        Self {
            snapshots: SnapshotStore::new(Arc::clone(&store)),
            engine,
            store,
            guard,
            catalog: None,
            end_of_queue: settings.end_of_queue,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Listen for `QueueEnded` until the engine goes away
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let mut events = self.engine.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        self.handle_engine_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "background service lagged behind engine events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Handle one remote command; never fails outward
    pub async fn handle_remote(&self, event: RemoteEvent) -> RemoteOutcome {
        debug!(?event, "remote event");
        let result = match event {
            RemoteEvent::Play => self.remote_play().await,
            RemoteEvent::Pause => self.engine.pause().await.map(|()| RemoteOutcome::Handled),
            RemoteEvent::Stop => self.remote_stop().await,
            RemoteEvent::Next => self.remote_skip(Direction::Next).await,
            RemoteEvent::Previous => self.remote_skip(Direction::Previous).await,
            RemoteEvent::Seek(position) => self
                .engine
                .seek_to(position)
                .await
                .map(|()| RemoteOutcome::Handled),
        };

        result.unwrap_or_else(|e| {
            error!(?event, error = %e, "remote event handler failed");
            RemoteOutcome::Failed(e.to_string())
        })
    }

    /// Auto-continue when the engine runs out of queue
    pub async fn handle_engine_event(&self, event: &EngineEvent) -> RemoteOutcome {
        let EngineEvent::QueueEnded { index } = event else {
            return RemoteOutcome::NoOp;
        };
        if self.guard.is_suppressed() {
            info!(?index, "queue ended during manual navigation, deferring to it");
            return RemoteOutcome::Suppressed;
        }

        let snapshot = self.read_snapshot().await;
        self.continue_from_catalog(&snapshot)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "queue auto-continuation failed");
                RemoteOutcome::Failed(e.to_string())
            })
    }

    async fn remote_play(&self) -> Result<RemoteOutcome> {
        if let Err(e) = self.engine.activate_session().await {
            warn!(error = %e, "failed to activate audio session");
        }
        self.engine.play().await?;
        Ok(RemoteOutcome::Handled)
    }

    /// Leave a breadcrumb, then tear the engine down
    async fn remote_stop(&self) -> Result<RemoteOutcome> {
        let position = self.engine.position().await.unwrap_or_default();
        match self.engine.current_track().await {
            Ok(Some(track)) => {
                let breadcrumb = LastPlayed {
                    url: track.url,
                    position_ms: position.as_millis() as u64,
                };
                match last_played::save(&self.store, &breadcrumb).await {
                    Ok(()) => info!(url = %breadcrumb.url, position_ms = breadcrumb.position_ms, "saved last played"),
                    Err(e) => warn!(error = %e, "failed to save last played"),
                }
            }
            Ok(None) => debug!("remote stop with nothing loaded"),
            Err(e) => warn!(error = %e, "could not read current track before stop"),
        }

        self.engine.destroy().await?;
        Ok(RemoteOutcome::Handled)
    }

    async fn remote_skip(&self, direction: Direction) -> Result<RemoteOutcome> {
        self.guard.begin_manual_navigation();

        let snapshot = self.read_snapshot().await;
        match QueueAdvancePolicy::advance(&snapshot, direction) {
            Advance::Moved(target) => {
                self.engine.skip(target.current_index).await?;
                if let Err(e) = self.engine.activate_session().await {
                    warn!(error = %e, "failed to activate audio session");
                }
                self.engine.play().await?;
                self.save_snapshot(&target).await;
                info!(?direction, index = target.current_index, "remote navigation");
                Ok(RemoteOutcome::Handled)
            }
            Advance::EndOfQueue => self.continue_from_catalog(&snapshot).await,
            Advance::StartOfQueue | Advance::Empty => Ok(RemoteOutcome::NoOp),
        }
    }

    /// Append a catalog track behind the current queue and play it
    async fn continue_from_catalog(&self, snapshot: &QueueSnapshot) -> Result<RemoteOutcome> {
        let catalog = match (self.end_of_queue, &self.catalog) {
            (EndOfQueue::CatalogFallback, Some(catalog)) => catalog,
            _ => {
                debug!("end of queue, no auto-continuation");
                return Ok(RemoteOutcome::NoOp);
            }
        };

        let Some(track) = catalog.random_unplayed(&snapshot.urls()).await? else {
            info!("end of queue and the catalog is exhausted");
            return Ok(RemoteOutcome::NoOp);
        };

        // Tag the entry with the active load so the controller accepts its track change
        let load_id = self
            .engine
            .current_track()
            .await?
            .map_or(0, |current| current.load_id);
        let engine_index = self.engine.queue().await?.len();
        let Some(entry) = EngineTrack::from_track(&track, engine_index, load_id) else {
            return Ok(RemoteOutcome::NoOp);
        };

        self.engine.add(vec![entry]).await?;
        self.engine.skip(engine_index).await?;
        if let Err(e) = self.engine.activate_session().await {
            warn!(error = %e, "failed to activate audio session");
        }
        self.engine.play().await?;

        let mut tracks = snapshot.tracks.clone();
        tracks.push(track);
        let index = tracks.len() - 1;
        self.save_snapshot(&QueueSnapshot::new(tracks, index)).await;
        info!(index, "queue continued from catalog");
        Ok(RemoteOutcome::Handled)
    }

    /// Persisted snapshot, or the engine's own queue when none is saved
    async fn read_snapshot(&self) -> QueueSnapshot {
        match self.snapshots.load().await {
            Ok(Some(snapshot)) if !snapshot.is_empty() => return snapshot,
            Ok(_) => debug!("no saved queue, reading engine queue"),
            Err(e) => warn!(error = %e, "failed to read saved queue, reading engine queue"),
        }

        let tracks = self
            .engine
            .queue()
            .await
            .unwrap_or_default()
            .iter()
            .map(EngineTrack::to_track)
            .collect();
        let index = self.engine.current_index().await.ok().flatten().unwrap_or(0);
        QueueSnapshot::new(tracks, index)
    }

    async fn save_snapshot(&self, snapshot: &QueueSnapshot) {
        if let Err(e) = self.snapshots.save(snapshot).await {
            warn!(error = %e, "failed to persist queue snapshot");
        }
    }
}
