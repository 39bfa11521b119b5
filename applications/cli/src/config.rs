/// Host configuration
use anyhow::Context;
use satsang_diagnostics::DiagnosticsConfig;
use satsang_playback::PlaybackSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "satsang.toml";

/// Everything the `satsang` binary reads from `satsang.toml` and `SATSANG_*`
///
/// Playback settings live at the top level of the file; diagnostics under a
/// `[diagnostics]` table.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub database_url: String,
    pub diagnostics: DiagnosticsConfig,
    pub playback: PlaybackSettings,
}

#[derive(Debug, Deserialize)]
struct HostFile {
    #[serde(default = "default_database_url")]
    database_url: String,

    #[serde(default)]
    diagnostics: DiagnosticsConfig,
}

fn default_database_url() -> String {
    "sqlite://satsang.db".to_string()
}

impl HostConfig {
    /// Load from `path` (or `satsang.toml` in the working directory) and the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

        let mut settings = config::Config::builder();
        if path.exists() {
            settings = settings.add_source(config::File::from(path.as_path()));
        }
        settings = settings.add_source(
            config::Environment::with_prefix("SATSANG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let file: HostFile = settings
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        let playback = PlaybackSettings::load(Some(path.as_path())).context("invalid playback settings")?;

        Ok(Self {
            database_url: file.database_url,
            diagnostics: file.diagnostics,
            playback,
        })
    }

    /// Reject settings the host cannot start with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("database_url must not be empty");
        }
        if self.diagnostics.max_entries == 0 {
            anyhow::bail!("diagnostics.max_entries must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap();

        assert_eq!(config.database_url, "sqlite://satsang.db");
        assert_eq!(config.diagnostics, DiagnosticsConfig::default());
        assert_eq!(config.playback, PlaybackSettings::default());
        config.validate().unwrap();
    }

    #[test]
    fn file_sets_storage_diagnostics_and_playback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satsang.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
database_url = "sqlite:///tmp/lectures.db"
seek_forward_secs = 10

[diagnostics]
max_entries = 50
"#
        )
        .unwrap();

        let config = HostConfig::load(Some(path.as_path())).unwrap();

        assert_eq!(config.database_url, "sqlite:///tmp/lectures.db");
        assert_eq!(config.diagnostics.max_entries, 50);
        assert_eq!(config.diagnostics.max_persisted, 100);
        assert_eq!(config.playback.seek_forward_secs, 10);
    }

    #[test]
    fn empty_database_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HostConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        config.database_url.clear();

        assert!(config.validate().is_err());
    }
}
