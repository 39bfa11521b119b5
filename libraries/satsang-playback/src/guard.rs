//! Manual navigation suppression

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Shared "the user is skipping right now" window
///
/// The controller and the background service hold the same guard. While a
/// window is open, `QueueEnded`-driven auto-continuation defers to the skip
/// already in flight. Windows expire on their own, so a handler that fails
/// halfway can never leave suppression on permanently.
#[derive(Debug)]
pub struct NavigationGuard {
    window: Duration,
    until: Mutex<Option<Instant>>,
}

impl NavigationGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: Mutex::new(None),
        }
    }

    /// Open (or extend) the suppression window
    pub fn begin_manual_navigation(&self) {
        let deadline = Instant::now() + self.window;
        if let Ok(mut until) = self.until.lock() {
            *until = Some(deadline);
        }
        tracing::debug!(window_ms = self.window.as_millis() as u64, "manual navigation window opened");
    }

    pub fn is_suppressed(&self) -> bool {
        self.until
            .lock()
            .map(|until| until.is_some_and(|deadline| Instant::now() < deadline))
            .unwrap_or(false)
    }

    /// Close the window early
    pub fn release(&self) {
        if let Ok(mut until) = self.until.lock() {
            *until = None;
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn window_expires_on_its_own() {
        let guard = NavigationGuard::new(Duration::from_secs(3));
        assert!(!guard.is_suppressed());

        guard.begin_manual_navigation();
        assert!(guard.is_suppressed());

        tokio::time::advance(Duration::from_millis(2_999)).await;
        assert!(guard.is_suppressed());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!guard.is_suppressed());
    }

    #[tokio::test(start_paused = true)]
    async fn release_closes_window_early() {
        let guard = NavigationGuard::new(Duration::from_secs(3));
        guard.begin_manual_navigation();
        guard.release();
        assert!(!guard.is_suppressed());
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_extends_deadline() {
        let guard = NavigationGuard::new(Duration::from_secs(3));
        guard.begin_manual_navigation();
        tokio::time::advance(Duration::from_secs(2)).await;
        guard.begin_manual_navigation();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(guard.is_suppressed());
    }
}
