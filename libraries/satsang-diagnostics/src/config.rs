use serde::{Deserialize, Serialize};

/// Configuration for the diagnostic log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Whether anything is recorded at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Ring buffer capacity
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Capacity of the persisted critical subset
    #[serde(default = "default_max_persisted")]
    pub max_persisted: usize,

    /// Info entries whose message or source contains one of these
    /// (case-insensitive) are treated as critical
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> usize {
    500
}

fn default_max_persisted() -> usize {
    100
}

fn default_keywords() -> Vec<String> {
    ["playback", "queue", "load", "remote", "lifecycle", "position"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_entries: default_max_entries(),
            max_persisted: default_max_persisted(),
            keywords: default_keywords(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: DiagnosticsConfig = serde_json::from_str(r#"{"max_entries": 10}"#).unwrap();
        assert_eq!(config.max_entries, 10);
        assert_eq!(config.max_persisted, 100);
        assert!(config.enabled);
        assert!(config.keywords.iter().any(|k| k == "remote"));
    }
}
