//! # Session Configuration
//!
//! Tuning knobs for the playback session coordinator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long `play_track` waits for the remembered position before it
    /// starts playback anyway.
    ///
    /// A position that arrives later is still applied as long as the same
    /// track is loaded.
    ///
    /// Default: 1.5 seconds.
    #[serde(default = "default_resume_lookup_grace")]
    pub resume_lookup_grace: Duration,

    /// Whether device progress ticks are forwarded to the event bus as
    /// `PositionChanged`. Snapshot watchers see them either way.
    ///
    /// Default: true.
    #[serde(default = "default_emit_position_events")]
    pub emit_position_events: bool,

    /// Path of the recently-played resource, relative to the API base URL.
    ///
    /// Default: `"recent"`.
    #[serde(default = "default_recent_path")]
    pub recent_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resume_lookup_grace: default_resume_lookup_grace(),
            emit_position_events: default_emit_position_events(),
            recent_path: default_recent_path(),
        }
    }
}

impl SessionConfig {
    /// Start playback without waiting for the resume lookup. The remembered
    /// position is applied whenever it arrives.
    pub fn immediate() -> Self {
        Self {
            resume_lookup_grace: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_resume_lookup_grace(mut self, grace: Duration) -> Self {
        self.resume_lookup_grace = grace;
        self
    }

    pub fn with_position_events(mut self, enabled: bool) -> Self {
        self.emit_position_events = enabled;
        self
    }
}

fn default_resume_lookup_grace() -> Duration {
    Duration::from_millis(1500)
}

fn default_emit_position_events() -> bool {
    true
}

fn default_recent_path() -> String {
    "recent".to_string()
}
