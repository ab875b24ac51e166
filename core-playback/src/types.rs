//! # Session Types
//!
//! Track descriptors, subject keys and the session snapshot rendered by UI
//! layers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Subjects
// ============================================================================

/// What kind of item a position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Track,
    Podcast,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Track => "track",
            SubjectKind::Podcast => "podcast",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity under which a playback position is persisted.
///
/// Renders as `"track:1"` or `"podcast:7"` in logs and events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectKey {
    pub id: String,
    pub kind: SubjectKind,
}

impl SubjectKey {
    pub fn new(id: impl Into<String>, kind: SubjectKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn track(id: impl Into<String>) -> Self {
        Self::new(id, SubjectKind::Track)
    }

    pub fn podcast(id: impl Into<String>) -> Self {
        Self::new(id, SubjectKind::Podcast)
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ============================================================================
// Track Descriptor
// ============================================================================

/// Immutable description of something playable.
///
/// Accepts both the camelCase shape used by list views and the snake_case
/// shape returned by the catalog API. Numeric ids are normalised to strings.
///
/// ```
/// use core_playback::{SubjectKind, Track};
///
/// let track: Track = serde_json::from_str(
///     r#"{"id": 7, "title": "Ep. 7", "artist": "Host", "audio_url": "https://cdn/7.mp3", "type": "podcast"}"#,
/// ).unwrap();
/// assert_eq!(track.subject_key().to_string(), "podcast:7");
/// assert_eq!(track.subject_key().kind, SubjectKind::Podcast);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(alias = "audio_url")]
    pub audio_url: String,
    #[serde(default, alias = "cover_url", skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(
        default,
        alias = "podcast_id",
        deserialize_with = "opt_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub podcast_id: Option<String>,
    /// Explicit kind. Wins over the presence of `podcast_id`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SubjectKind>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            audio_url: audio_url.into(),
            cover_url: None,
            podcast_id: None,
            kind: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_kind(mut self, kind: SubjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_podcast_id(mut self, podcast_id: impl Into<String>) -> Self {
        self.podcast_id = Some(podcast_id.into());
        self
    }

    pub fn subject_kind(&self) -> SubjectKind {
        match (self.kind, &self.podcast_id) {
            (Some(kind), _) => kind,
            (None, Some(_)) => SubjectKind::Podcast,
            (None, None) => SubjectKind::Track,
        }
    }

    pub fn subject_key(&self) -> SubjectKey {
        SubjectKey::new(self.id.clone(), self.subject_kind())
    }

    /// Same persisted subject, regardless of the other fields.
    pub fn same_subject(&self, other: &Track) -> bool {
        self.id == other.id && self.subject_kind() == other.subject_kind()
    }
}

pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Positions come back as numbers, numeric strings (decimal columns) or
/// null. Anything unreadable counts as "no position".
pub(crate) fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(seconds.filter(|s| s.is_finite()))
}

// ============================================================================
// Session State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

/// Snapshot of the single active session.
///
/// `status` is `Idle` exactly when `current_track` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_track: Option<Track>,
    pub status: PlaybackStatus,
    pub position_secs: f64,
    pub duration_secs: f64,
    /// Most recent device failure; cleared by the next successful transition.
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_track: None,
            status: PlaybackStatus::Idle,
            position_secs: 0.0,
            duration_secs: 0.0,
            last_error: None,
        }
    }
}

impl SessionState {
    pub(crate) fn loading(track: Track) -> Self {
        Self {
            current_track: Some(track),
            status: PlaybackStatus::Loading,
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_track.is_none()
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn subject(&self) -> Option<SubjectKey> {
        self.current_track.as_ref().map(Track::subject_key)
    }

    /// `"m:ss / m:ss"` readout for the mini player.
    ///
    /// ```
    /// use core_playback::SessionState;
    ///
    /// let state = SessionState { position_secs: 75.4, duration_secs: 200.0, ..Default::default() };
    /// assert_eq!(state.progress_label(), "1:15 / 3:20");
    /// ```
    pub fn progress_label(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.position_secs),
            format_clock(self.duration_secs)
        )
    }
}

/// Render seconds as `m:ss`. Negative and non-finite values render as
/// `0:00`.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
