/// Playback configuration
use crate::engine::{Capabilities, Capability};
use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What `go_to_next_track` does past the last entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndOfQueue {
    /// Stay on the last track
    Stop,
    /// Load a random unplayed track from the catalog
    #[default]
    CatalogFallback,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    #[serde(default = "default_manual_navigation_window_ms")]
    pub manual_navigation_window_ms: u64,

    #[serde(default = "default_position_throttle_ms")]
    pub position_throttle_ms: u64,

    #[serde(default = "default_position_min_write_interval_ms")]
    pub position_min_write_interval_ms: u64,

    #[serde(default = "default_seek_forward_secs")]
    pub seek_forward_secs: u64,

    #[serde(default = "default_seek_backward_secs")]
    pub seek_backward_secs: u64,

    #[serde(default = "default_lifecycle_watchdog_interval_ms")]
    pub lifecycle_watchdog_interval_ms: u64,

    /// Resume a silently suspended first load when returning to foreground
    #[serde(default = "default_auto_resume_first_load")]
    pub auto_resume_first_load: bool,

    #[serde(default)]
    pub end_of_queue: EndOfQueue,

    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    #[serde(default = "default_compact_capabilities")]
    pub compact_capabilities: Vec<Capability>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            load_timeout_ms: default_load_timeout_ms(),
            manual_navigation_window_ms: default_manual_navigation_window_ms(),
            position_throttle_ms: default_position_throttle_ms(),
            position_min_write_interval_ms: default_position_min_write_interval_ms(),
            seek_forward_secs: default_seek_forward_secs(),
            seek_backward_secs: default_seek_backward_secs(),
            lifecycle_watchdog_interval_ms: default_lifecycle_watchdog_interval_ms(),
            auto_resume_first_load: default_auto_resume_first_load(),
            end_of_queue: EndOfQueue::default(),
            max_consecutive_errors: default_max_consecutive_errors(),
            compact_capabilities: default_compact_capabilities(),
        }
    }
}

impl PlaybackSettings {
    /// Load settings from an optional TOML file and `SATSANG_` environment variables
    ///
    /// `SATSANG_LOAD_TIMEOUT_MS=20000` overrides `load_timeout_ms`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path.filter(|p| p.exists()) {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SATSANG")
                .prefix_separator("_")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("compact_capabilities"),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("load_timeout_ms", self.load_timeout_ms),
            ("manual_navigation_window_ms", self.manual_navigation_window_ms),
            ("position_throttle_ms", self.position_throttle_ms),
            (
                "position_min_write_interval_ms",
                self.position_min_write_interval_ms,
            ),
            (
                "lifecycle_watchdog_interval_ms",
                self.lifecycle_watchdog_interval_ms,
            ),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, value)| *value == 0) {
            return Err(PlaybackError::Config(format!("{name} must be positive")));
        }

        if self.max_consecutive_errors == 0 {
            return Err(PlaybackError::Config(
                "max_consecutive_errors must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn manual_navigation_window(&self) -> Duration {
        Duration::from_millis(self.manual_navigation_window_ms)
    }

    pub fn position_throttle(&self) -> Duration {
        Duration::from_millis(self.position_throttle_ms)
    }

    pub fn position_min_write_interval(&self) -> Duration {
        Duration::from_millis(self.position_min_write_interval_ms)
    }

    pub fn seek_forward(&self) -> Duration {
        Duration::from_secs(self.seek_forward_secs)
    }

    pub fn seek_backward(&self) -> Duration {
        Duration::from_secs(self.seek_backward_secs)
    }

    pub fn lifecycle_watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.lifecycle_watchdog_interval_ms)
    }

    /// Capability registration for the remote transport surface
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::standard(self.compact_capabilities.clone())
    }
}

fn default_load_timeout_ms() -> u64 {
    15_000
}

fn default_manual_navigation_window_ms() -> u64 {
    3_000
}

fn default_position_throttle_ms() -> u64 {
    1_000
}

fn default_position_min_write_interval_ms() -> u64 {
    10_000
}

fn default_seek_forward_secs() -> u64 {
    30
}

fn default_seek_backward_secs() -> u64 {
    15
}

fn default_lifecycle_watchdog_interval_ms() -> u64 {
    5_000
}

fn default_auto_resume_first_load() -> bool {
    true
}

fn default_max_consecutive_errors() -> u32 {
    3
}

fn default_compact_capabilities() -> Vec<Capability> {
    vec![Capability::Play, Capability::Pause, Capability::SkipToNext]
}
