//! In-process engine driven by the tokio clock

use super::{
    Capabilities, EngineEvent, EngineState, EngineTrack, MetadataPatch, PlaybackEngine,
};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const EVENT_CAPACITY: usize = 64;

/// Engine that produces no sound
///
/// Position advances with the tokio clock while playing. With the clock task
/// running ([`HeadlessEngine::spawn_clock`]) it advances through the queue and
/// emits `QueueEnded` after the last entry, like a native engine would.
pub struct HeadlessEngine {
    inner: Mutex<Inner>,
    events: broadcast::Sender<EngineEvent>,
    clock: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct Inner {
    queue: Vec<EngineTrack>,
    index: Option<usize>,
    state: Option<EngineState>,
    offset: Duration,
    playing_since: Option<Instant>,
    capabilities: Option<Capabilities>,
    destroyed: bool,
}

impl Inner {
    fn state(&self) -> EngineState {
        self.state.unwrap_or(EngineState::None)
    }

    fn current(&self) -> Option<&EngineTrack> {
        self.index.and_then(|i| self.queue.get(i))
    }

    fn position(&self) -> Duration {
        let elapsed = self.playing_since.map_or(Duration::ZERO, |since| since.elapsed());
        let position = self.offset + elapsed;
        match self.current() {
            Some(track) => position.min(track.duration),
            None => Duration::ZERO,
        }
    }

    fn move_to(&mut self, index: usize) -> EngineEvent {
        self.index = Some(index);
        self.offset = Duration::ZERO;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        EngineEvent::TrackChanged {
            index: Some(index),
            track: self.queue.get(index).cloned(),
        }
    }

    fn freeze(&mut self) {
        self.offset = self.position();
        self.playing_since = None;
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
            clock: Mutex::new(None),
        }
    }

    /// Run [`HeadlessEngine::tick`] every `period` until the engine is dropped or destroyed
    pub fn spawn_clock(self: &Arc<Self>, period: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(engine) = weak.upgrade() else {
                    break;
                };
                engine.tick();
            }
        });
        if let Ok(mut clock) = self.clock.lock() {
            if let Some(previous) = clock.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Advance past finished tracks
    pub fn tick(&self) {
        let event = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if inner.destroyed || inner.state() != EngineState::Playing {
                return;
            }
            let (Some(index), Some(duration)) = (inner.index, inner.current().map(|t| t.duration))
            else {
                return;
            };
            if inner.position() < duration {
                return;
            }

            if index + 1 < inner.queue.len() {
                inner.move_to(index + 1)
            } else {
                inner.freeze();
                inner.state = Some(EngineState::Stopped);
                EngineEvent::QueueEnded { index: Some(index) }
            }
        };

        let stopped = matches!(event, EngineEvent::QueueEnded { .. });
        self.emit(event);
        if stopped {
            self.emit(EngineEvent::StateChanged(EngineState::Stopped));
        }
    }

    /// Capabilities most recently registered
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.inner.lock().ok().and_then(|i| i.capabilities.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| PlaybackError::engine("engine state poisoned"))?;
        if inner.destroyed {
            return Err(PlaybackError::Destroyed);
        }
        Ok(inner)
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: EngineState) -> Result<()> {
        {
            let mut inner = self.lock()?;
            if inner.state == Some(state) {
                return Ok(());
            }
            inner.state = Some(state);
        }
        self.emit(EngineEvent::StateChanged(state));
        Ok(())
    }

    fn step(&self, forward: bool) -> Result<()> {
        let event = {
            let mut inner = self.lock()?;
            let index = inner.index.ok_or(PlaybackError::QueueEmpty)?;
            let target = if forward {
                index + 1
            } else {
                index.checked_sub(1).ok_or(PlaybackError::IndexOutOfBounds(0))?
            };
            if target >= inner.queue.len() {
                return Err(PlaybackError::IndexOutOfBounds(target));
            }
            inner.move_to(target)
        };
        self.emit(event);
        Ok(())
    }
}

#[async_trait]
impl PlaybackEngine for HeadlessEngine {
    async fn reset(&self) -> Result<()> {
        {
            let mut inner = self.lock()?;
            inner.queue.clear();
            inner.index = None;
            inner.offset = Duration::ZERO;
            inner.playing_since = None;
        }
        self.set_state(EngineState::None)
    }

    async fn add(&self, tracks: Vec<EngineTrack>) -> Result<()> {
        let first = {
            let mut inner = self.lock()?;
            inner.queue.extend(tracks);
            if inner.index.is_none() && !inner.queue.is_empty() {
                Some(inner.move_to(0))
            } else {
                None
            }
        };
        if let Some(event) = first {
            self.emit(event);
            self.set_state(EngineState::Ready)?;
        }
        Ok(())
    }

    async fn skip(&self, index: usize) -> Result<()> {
        let event = {
            let mut inner = self.lock()?;
            if index >= inner.queue.len() {
                return Err(PlaybackError::IndexOutOfBounds(index));
            }
            inner.move_to(index)
        };
        self.emit(event);
        Ok(())
    }

    async fn skip_to_next(&self) -> Result<()> {
        self.step(true)
    }

    async fn skip_to_previous(&self) -> Result<()> {
        self.step(false)
    }

    async fn play(&self) -> Result<()> {
        {
            let mut inner = self.lock()?;
            if inner.current().is_none() {
                return Err(PlaybackError::QueueEmpty);
            }
            if inner.playing_since.is_none() {
                inner.playing_since = Some(Instant::now());
            }
        }
        self.set_state(EngineState::Playing)
    }

    async fn pause(&self) -> Result<()> {
        self.lock()?.freeze();
        self.set_state(EngineState::Paused)
    }

    async fn stop(&self) -> Result<()> {
        {
            let mut inner = self.lock()?;
            inner.playing_since = None;
            inner.offset = Duration::ZERO;
        }
        self.set_state(EngineState::Stopped)
    }

    async fn seek_to(&self, position: Duration) -> Result<()> {
        let mut inner = self.lock()?;
        let duration = inner
            .current()
            .map(|t| t.duration)
            .ok_or(PlaybackError::QueueEmpty)?;
        inner.offset = position.min(duration);
        if inner.playing_since.is_some() {
            inner.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn position(&self) -> Result<Duration> {
        Ok(self.lock()?.position())
    }

    async fn duration(&self) -> Result<Duration> {
        Ok(self.lock()?.current().map_or(Duration::ZERO, |t| t.duration))
    }

    async fn current_index(&self) -> Result<Option<usize>> {
        Ok(self.lock()?.index)
    }

    async fn current_track(&self) -> Result<Option<EngineTrack>> {
        Ok(self.lock()?.current().cloned())
    }

    async fn track(&self, index: usize) -> Result<Option<EngineTrack>> {
        Ok(self.lock()?.queue.get(index).cloned())
    }

    async fn queue(&self) -> Result<Vec<EngineTrack>> {
        Ok(self.lock()?.queue.clone())
    }

    async fn state(&self) -> Result<EngineState> {
        Ok(self.lock()?.state())
    }

    async fn update_metadata_for_track(&self, index: usize, patch: MetadataPatch) -> Result<()> {
        let mut inner = self.lock()?;
        let track = inner
            .queue
            .get_mut(index)
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        patch.apply(track);
        Ok(())
    }

    async fn update_options(&self, capabilities: Capabilities) -> Result<()> {
        self.lock()?.capabilities = Some(capabilities);
        Ok(())
    }

    async fn activate_session(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    async fn destroy(&self) -> Result<()> {
        let first = match self.inner.lock() {
            Ok(mut inner) => {
                let first = !inner.destroyed;
                *inner = Inner {
                    destroyed: true,
                    ..Inner::default()
                };
                first
            }
            Err(_) => false,
        };
        if let Ok(mut clock) = self.clock.lock() {
            if let Some(handle) = clock.take() {
                handle.abort();
            }
        }
        if first {
            self.emit(EngineEvent::StateChanged(EngineState::Stopped));
            self.emit(EngineEvent::TrackChanged {
                index: None,
                track: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
