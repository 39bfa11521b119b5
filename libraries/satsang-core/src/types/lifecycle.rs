/// Application lifecycle state
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse application state as reported by the OS or browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    /// In the foreground and receiving input
    #[default]
    Active,
    /// Visible but not receiving input (transitioning, overlays, incoming call)
    Inactive,
    /// Not visible; only background audio keeps running
    Background,
}

impl AppState {
    /// Whether the UI is in the foreground
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Background => "background",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "background" => Some(Self::Background),
            _ => None,
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_display() {
        for state in [AppState::Active, AppState::Inactive, AppState::Background] {
            assert_eq!(AppState::parse(&state.to_string()), Some(state));
        }
        assert_eq!(AppState::parse("suspended"), None);
    }
}
