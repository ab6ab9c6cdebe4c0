//! Payload types carried by MupEvent variants

use serde::{Deserialize, Serialize};

/// Cover image variant advertised to media-session integrations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub src: String,
    /// `"<w>x<h>"`
    pub sizes: String,
}

/// Now-playing metadata for OS media controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default)]
    pub artwork: Vec<Artwork>,
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Failures that stop the engine and are surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A playback-start command found nothing to play
    EmptyPlaylist,
    /// Too many consecutive load/playback failures
    RetryBudgetExceeded,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::EmptyPlaylist => write!(f, "playlist is empty"),
            FailureReason::RetryBudgetExceeded => write!(f, "too many playback failures"),
        }
    }
}
