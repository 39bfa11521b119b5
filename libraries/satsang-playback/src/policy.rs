//! Pure decision functions shared by the in-app controller and the
//! background remote-control service

use crate::engine::EngineState;
use satsang_core::QueueSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Result of asking to move through a queue
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The cursor moves; carries the snapshot to persist
    Moved(QueueSnapshot),
    /// Already on the last entry
    EndOfQueue,
    /// Already on the first entry
    StartOfQueue,
    /// Nothing queued
    Empty,
}

/// Next/previous semantics over a queue snapshot
///
/// Both execution contexts route navigation through this one function so
/// they cannot drift apart.
pub struct QueueAdvancePolicy;

impl QueueAdvancePolicy {
    pub fn advance(snapshot: &QueueSnapshot, direction: Direction) -> Advance {
        if snapshot.is_empty() {
            return Advance::Empty;
        }

        let index = snapshot.current_index;
        match direction {
            Direction::Next if index + 1 >= snapshot.len() => Advance::EndOfQueue,
            Direction::Next => Advance::Moved(snapshot.with_index(index + 1)),
            Direction::Previous if index == 0 => Advance::StartOfQueue,
            Direction::Previous => Advance::Moved(snapshot.with_index(index - 1)),
        }
    }
}

/// What the foreground watchdog knows about the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFacts {
    /// Loads completed since the controller started
    pub loads_completed: u64,
    /// The last load asked for playback
    pub play_requested: bool,
    /// The user paused since then
    pub user_paused: bool,
    pub is_loading: bool,
    pub has_track: bool,
}

/// First-load auto-resume heuristic
///
/// Some platforms suspend the very first playback of a session without
/// telling anyone; the engine then sits in `Ready`. This resumes it, but only
/// for the first load and never against a deliberate pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoResumePolicy {
    pub enabled: bool,
}

impl AutoResumePolicy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn should_resume(&self, state: EngineState, facts: &SessionFacts) -> bool {
        self.enabled
            && state == EngineState::Ready
            && facts.loads_completed == 1
            && facts.play_requested
            && !facts.user_paused
            && !facts.is_loading
            && facts.has_track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use satsang_core::Track;

    fn snapshot(len: usize, index: usize) -> QueueSnapshot {
        let tracks = (0..len)
            .map(|i| Track::new(format!("https://cdn/{i}.mp3"), format!("Track {i}")))
            .collect();
        QueueSnapshot::new(tracks, index)
    }

    #[test]
    fn next_moves_forward() {
        match QueueAdvancePolicy::advance(&snapshot(3, 0), Direction::Next) {
            Advance::Moved(next) => assert_eq!(next.current_index, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn next_at_end_reports_end_of_queue() {
        assert_eq!(
            QueueAdvancePolicy::advance(&snapshot(3, 2), Direction::Next),
            Advance::EndOfQueue
        );
    }

    #[test]
    fn previous_at_start_reports_start_of_queue() {
        assert_eq!(
            QueueAdvancePolicy::advance(&snapshot(3, 0), Direction::Previous),
            Advance::StartOfQueue
        );
    }

    #[test]
    fn empty_queue_goes_nowhere() {
        assert_eq!(
            QueueAdvancePolicy::advance(&QueueSnapshot::default(), Direction::Next),
            Advance::Empty
        );
    }

    fn first_load() -> SessionFacts {
        SessionFacts {
            loads_completed: 1,
            play_requested: true,
            user_paused: false,
            is_loading: false,
            has_track: true,
        }
    }

    #[test]
    fn auto_resume_only_on_first_load() {
        let policy = AutoResumePolicy::new(true);
        assert!(policy.should_resume(EngineState::Ready, &first_load()));

        let second = SessionFacts {
            loads_completed: 2,
            ..first_load()
        };
        assert!(!policy.should_resume(EngineState::Ready, &second));
    }

    #[test]
    fn auto_resume_respects_deliberate_pause() {
        let policy = AutoResumePolicy::new(true);
        let paused = SessionFacts {
            user_paused: true,
            ..first_load()
        };
        assert!(!policy.should_resume(EngineState::Ready, &paused));
        assert!(!policy.should_resume(EngineState::Paused, &first_load()));
    }

    #[test]
    fn auto_resume_can_be_disabled() {
        let policy = AutoResumePolicy::new(false);
        assert!(!policy.should_resume(EngineState::Ready, &first_load()));
    }

    proptest! {
        #[test]
        fn moved_index_stays_in_bounds(len in 1usize..50, index in 0usize..100, forward in any::<bool>()) {
            let direction = if forward { Direction::Next } else { Direction::Previous };
            let start = snapshot(len, index);
            if let Advance::Moved(next) = QueueAdvancePolicy::advance(&start, direction) {
                prop_assert!(next.current_index < len);
                prop_assert_eq!(next.len(), len);
                prop_assert_eq!(next.current_index.abs_diff(start.current_index), 1);
            }
        }

        #[test]
        fn next_then_previous_returns_to_start(len in 2usize..50, index in 0usize..49) {
            let start = snapshot(len, index.min(len - 2));
            let Advance::Moved(next) = QueueAdvancePolicy::advance(&start, Direction::Next) else {
                return Err(TestCaseError::fail("next must move before the last entry"));
            };
            let Advance::Moved(back) = QueueAdvancePolicy::advance(&next, Direction::Previous) else {
                return Err(TestCaseError::fail("previous must move after the first entry"));
            };
            prop_assert_eq!(back.current_index, start.current_index);
        }
    }
}
