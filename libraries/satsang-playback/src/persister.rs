//! Write gating for the playback-position stream

use std::time::Duration;
use tokio::time::Instant;

/// Decides which position samples reach the position store
///
/// Samples closer together than `throttle` are dropped. An accepted sample is
/// written when it is the first non-zero position for the current track, or
/// when `min_interval` has passed since the last write. Forced non-zero
/// samples (seek, pause, teardown) are always written.
#[derive(Debug)]
pub struct PositionPersister {
    throttle: Duration,
    min_interval: Duration,
    url: Option<String>,
    last_sample: Option<Instant>,
    last_write: Option<Instant>,
}

impl PositionPersister {
    pub fn new(throttle: Duration, min_interval: Duration) -> Self {
        Self {
            throttle,
            min_interval,
            url: None,
            last_sample: None,
            last_write: None,
        }
    }

    /// Start a new write session for `url`
    pub fn start_track(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.last_sample = None;
        self.last_write = None;
    }

    /// Offer a sample; returns whether it should be written now
    pub fn observe(&mut self, url: &str, position: Duration, force: bool) -> bool {
        if self.url.as_deref() != Some(url) {
            self.start_track(url);
        }

        // Zero means "unplayed"; only an explicit reset may write it
        if position.is_zero() {
            return false;
        }

        let now = Instant::now();
        if force {
            self.last_sample = Some(now);
            self.last_write = Some(now);
            return true;
        }

        if self
            .last_sample
            .is_some_and(|last| now.duration_since(last) < self.throttle)
        {
            return false;
        }
        self.last_sample = Some(now);

        let due = self
            .last_write
            .map_or(true, |last| now.duration_since(last) >= self.min_interval);
        if due {
            self.last_write = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://cdn/a.mp3";

    fn persister() -> PositionPersister {
        PositionPersister::new(Duration::from_secs(1), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn updates_every_200ms_for_3s_write_once() {
        let mut persister = persister();
        let mut writes = 0;

        for tick in 1..=15u64 {
            if persister.observe(URL, Duration::from_millis(tick * 200), false) {
                writes += 1;
            }
            tokio::time::advance(Duration::from_millis(200)).await;
        }

        assert_eq!(writes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_write_always_hits() {
        let mut persister = persister();
        assert!(persister.observe(URL, Duration::from_secs(1), false));
        assert!(persister.observe(URL, Duration::from_secs(1), true));
        assert!(persister.observe(URL, Duration::from_secs(1), true));
    }

    #[tokio::test(start_paused = true)]
    async fn writes_again_after_min_interval() {
        let mut persister = persister();
        assert!(persister.observe(URL, Duration::from_secs(1), false));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!persister.observe(URL, Duration::from_secs(6), false));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(persister.observe(URL, Duration::from_secs(11), false));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_positions_are_not_written() {
        let mut persister = persister();
        assert!(!persister.observe(URL, Duration::ZERO, false));
        assert!(persister.observe(URL, Duration::from_millis(300), false));
    }

    #[tokio::test(start_paused = true)]
    async fn new_track_gets_its_own_first_write() {
        let mut persister = persister();
        assert!(persister.observe(URL, Duration::from_secs(3), false));
        assert!(persister.observe("https://cdn/b.mp3", Duration::from_secs(1), false));
    }
}
