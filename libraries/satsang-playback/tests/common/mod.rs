//! Test helpers for playback integration tests
//!
//! [`FakeEngine`] records every mutating call in order, can hold any
//! operation until released (to create overlapping requests deterministically)
//! and can be told to fail operations.

#![allow(dead_code)]

use async_trait::async_trait;
use satsang_core::Track;
use satsang_playback::{
    Capabilities, EngineEvent, EngineState, EngineTrack, MetadataPatch, PlaybackEngine,
    PlaybackError, Result,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Reset,
    Add(Vec<String>),
    Skip(usize),
    SkipToNext,
    SkipToPrevious,
    Play,
    Pause,
    Stop,
    SeekTo(Duration),
    UpdateMetadata(usize, Option<String>),
    UpdateOptions,
    ActivateSession,
    Destroy,
}

impl Call {
    fn op(&self) -> &'static str {
        match self {
            Call::Reset => "reset",
            Call::Add(_) => "add",
            Call::Skip(_) => "skip",
            Call::SkipToNext => "skip_to_next",
            Call::SkipToPrevious => "skip_to_previous",
            Call::Play => "play",
            Call::Pause => "pause",
            Call::Stop => "stop",
            Call::SeekTo(_) => "seek_to",
            Call::UpdateMetadata(..) => "update_metadata",
            Call::UpdateOptions => "update_options",
            Call::ActivateSession => "activate_session",
            Call::Destroy => "destroy",
        }
    }
}

#[derive(Default)]
struct FakeState {
    queue: Vec<EngineTrack>,
    index: Option<usize>,
    state: Option<EngineState>,
    position: Duration,
    measured_duration: Option<Duration>,
}

/// Engine calls still blocked by a hold that was detached
pub struct HeldCalls(Arc<Semaphore>);

impl HeldCalls {
    pub fn release(self) {
        self.0.add_permits(Semaphore::MAX_PERMITS);
    }
}

pub struct FakeEngine {
    calls: Mutex<Vec<Call>>,
    state: Mutex<FakeState>,
    holds: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
    failures: Mutex<HashSet<&'static str>>,
    events: broadcast::Sender<EngineEvent>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            state: Mutex::new(FakeState::default()),
            holds: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashSet::new()),
            events,
        })
    }

    /// Block `op` until [`FakeEngine::release`]
    pub fn hold(&self, op: &'static str) {
        self.holds
            .lock()
            .unwrap()
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, op: &'static str) {
        if let Some(hold) = self.holds.lock().unwrap().remove(op) {
            hold.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    /// Let new `op` calls through; calls already waiting stay blocked on the
    /// returned handle
    pub fn detach_hold(&self, op: &'static str) -> HeldCalls {
        let hold = self
            .holds
            .lock()
            .unwrap()
            .remove(op)
            .expect("op is not held");
        HeldCalls(hold)
    }

    pub fn fail(&self, op: &'static str) {
        self.failures.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls without session/capability bookkeeping
    pub fn transport_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::UpdateOptions | Call::ActivateSession))
            .collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Yield until `op` has been called at least once
    pub async fn wait_for(&self, op: &str) {
        for _ in 0..1_000 {
            if self.count(op) > 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("engine never received {op}");
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub fn set_position(&self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_state(&self, state: EngineState) {
        self.state.lock().unwrap().state = Some(state);
    }

    pub fn set_measured_duration(&self, duration: Duration) {
        self.state.lock().unwrap().measured_duration = Some(duration);
    }

    pub fn queue_snapshot(&self) -> Vec<EngineTrack> {
        self.state.lock().unwrap().queue.clone()
    }

    async fn enter(&self, call: Call) -> Result<()> {
        tokio::task::yield_now().await;
        let op = call.op();
        self.calls.lock().unwrap().push(call);

        let hold = self.holds.lock().unwrap().get(op).cloned();
        if let Some(hold) = hold {
            let _permit = hold.acquire().await;
        }

        if self.failures.lock().unwrap().contains(op) {
            return Err(PlaybackError::engine(format!("{op} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackEngine for FakeEngine {
    async fn reset(&self) -> Result<()> {
        self.enter(Call::Reset).await?;
        let mut state = self.state.lock().unwrap();
        state.queue.clear();
        state.index = None;
        state.position = Duration::ZERO;
        state.state = Some(EngineState::None);
        Ok(())
    }

    async fn add(&self, tracks: Vec<EngineTrack>) -> Result<()> {
        self.enter(Call::Add(tracks.iter().map(|t| t.title.clone()).collect()))
            .await?;
        let mut state = self.state.lock().unwrap();
        state.queue.extend(tracks);
        if state.index.is_none() && !state.queue.is_empty() {
            state.index = Some(0);
            state.state = Some(EngineState::Ready);
        }
        Ok(())
    }

    async fn skip(&self, index: usize) -> Result<()> {
        self.enter(Call::Skip(index)).await?;
        let mut state = self.state.lock().unwrap();
        if index >= state.queue.len() {
            return Err(PlaybackError::IndexOutOfBounds(index));
        }
        state.index = Some(index);
        state.position = Duration::ZERO;
        Ok(())
    }

    async fn skip_to_next(&self) -> Result<()> {
        self.enter(Call::SkipToNext).await?;
        let mut state = self.state.lock().unwrap();
        let next = state.index.map_or(0, |i| i + 1);
        if next >= state.queue.len() {
            return Err(PlaybackError::IndexOutOfBounds(next));
        }
        state.index = Some(next);
        state.position = Duration::ZERO;
        Ok(())
    }

    async fn skip_to_previous(&self) -> Result<()> {
        self.enter(Call::SkipToPrevious).await?;
        let mut state = self.state.lock().unwrap();
        let previous = state
            .index
            .and_then(|i| i.checked_sub(1))
            .ok_or(PlaybackError::IndexOutOfBounds(0))?;
        state.index = Some(previous);
        state.position = Duration::ZERO;
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.enter(Call::Play).await?;
        self.state.lock().unwrap().state = Some(EngineState::Playing);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.enter(Call::Pause).await?;
        self.state.lock().unwrap().state = Some(EngineState::Paused);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.enter(Call::Stop).await?;
        self.state.lock().unwrap().state = Some(EngineState::Stopped);
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> Result<()> {
        self.enter(Call::SeekTo(position)).await?;
        self.state.lock().unwrap().position = position;
        Ok(())
    }

    async fn position(&self) -> Result<Duration> {
        Ok(self.state.lock().unwrap().position)
    }

    async fn duration(&self) -> Result<Duration> {
        let state = self.state.lock().unwrap();
        Ok(state.measured_duration.unwrap_or_else(|| {
            state
                .index
                .and_then(|i| state.queue.get(i))
                .map_or(Duration::ZERO, |t| t.duration)
        }))
    }

    async fn current_index(&self) -> Result<Option<usize>> {
        Ok(self.state.lock().unwrap().index)
    }

    async fn current_track(&self) -> Result<Option<EngineTrack>> {
        let state = self.state.lock().unwrap();
        Ok(state.index.and_then(|i| state.queue.get(i)).cloned())
    }

    async fn track(&self, index: usize) -> Result<Option<EngineTrack>> {
        Ok(self.state.lock().unwrap().queue.get(index).cloned())
    }

    async fn queue(&self) -> Result<Vec<EngineTrack>> {
        Ok(self.state.lock().unwrap().queue.clone())
    }

    async fn state(&self) -> Result<EngineState> {
        Ok(self.state.lock().unwrap().state.unwrap_or(EngineState::None))
    }

    async fn update_metadata_for_track(&self, index: usize, patch: MetadataPatch) -> Result<()> {
        self.enter(Call::UpdateMetadata(index, patch.title.clone()))
            .await?;
        if let Some(track) = self.state.lock().unwrap().queue.get_mut(index) {
            patch.apply(track);
        }
        Ok(())
    }

    async fn update_options(&self, _capabilities: Capabilities) -> Result<()> {
        self.enter(Call::UpdateOptions).await
    }

    async fn activate_session(&self) -> Result<()> {
        self.enter(Call::ActivateSession).await
    }

    async fn destroy(&self) -> Result<()> {
        self.enter(Call::Destroy).await?;
        *self.state.lock().unwrap() = FakeState::default();
        self.emit(EngineEvent::StateChanged(EngineState::Stopped));
        self.emit(EngineEvent::TrackChanged {
            index: None,
            track: None,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

pub fn track(name: &str) -> Track {
    Track::new(format!("https://cdn.example/{name}.mp3"), name).with_duration_secs(600.0)
}

pub fn tracks(names: &[&str]) -> Vec<Track> {
    names.iter().map(|name| track(name)).collect()
}
