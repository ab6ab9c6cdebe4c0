//! Event types for the MuPlayer event system
//!
//! Every observable engine change is pushed as a `MupEvent` through the
//! `EventBus`. Pushes are one-way: nothing waits for subscribers.

mod types;

pub use types::{Artwork, FailureReason, MediaMetadata, NoticeLevel};

use crate::models::{PlayMode, Song};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// MuPlayer event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MupEvent {
    /// Intended play state flipped (set at fade start, not fade end)
    PlayStateChanged {
        playing: bool,
        timestamp: DateTime<Utc>,
    },

    /// A song load started or finished
    LoadingChanged {
        loading: bool,
        timestamp: DateTime<Utc>,
    },

    /// Current song changed (`None` after a full reset)
    CurrentSongChanged {
        song: Option<Song>,
        index: Option<usize>,
        timestamp: DateTime<Utc>,
    },

    /// Periodic progress tick
    PlaybackProgress {
        /// Seconds into the track
        time: f64,
        /// Track length in seconds
        duration: f64,
        /// time / duration, clamped to [0, 1]
        progress: f64,
        /// Active lyric line, -1 before the first line
        lyric_index: i64,
        timestamp: DateTime<Utc>,
    },

    /// Active lyric line moved
    LyricLineChanged {
        index: i64,
        karaoke: bool,
        text: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Base mode or sub-mode changed
    ModeChanged {
        mode: PlayMode,
        heartbeat: bool,
        personal_radio: bool,
        timestamp: DateTime<Utc>,
    },

    /// Playlist contents or order changed
    PlaylistChanged {
        length: usize,
        index: Option<usize>,
        shuffled: bool,
        timestamp: DateTime<Utc>,
    },

    VolumeChanged {
        volume: f32,
        muted: bool,
        timestamp: DateTime<Utc>,
    },

    RateChanged {
        rate: f32,
        timestamp: DateTime<Utc>,
    },

    /// Now-playing metadata for OS media controls
    MediaMetadataChanged {
        metadata: MediaMetadata,
        /// `name - artists`
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Progress for a desktop taskbar indicator
    TaskbarProgress {
        progress: f64,
        timestamp: DateTime<Utc>,
    },

    /// Transient message for the user (toasts)
    Notice {
        level: NoticeLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Engine stopped and reset to idle
    PlaybackFailed {
        reason: FailureReason,
        timestamp: DateTime<Utc>,
    },
}

impl MupEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            MupEvent::PlayStateChanged { .. } => "PlayStateChanged",
            MupEvent::LoadingChanged { .. } => "LoadingChanged",
            MupEvent::CurrentSongChanged { .. } => "CurrentSongChanged",
            MupEvent::PlaybackProgress { .. } => "PlaybackProgress",
            MupEvent::LyricLineChanged { .. } => "LyricLineChanged",
            MupEvent::ModeChanged { .. } => "ModeChanged",
            MupEvent::PlaylistChanged { .. } => "PlaylistChanged",
            MupEvent::VolumeChanged { .. } => "VolumeChanged",
            MupEvent::RateChanged { .. } => "RateChanged",
            MupEvent::MediaMetadataChanged { .. } => "MediaMetadataChanged",
            MupEvent::TaskbarProgress { .. } => "TaskbarProgress",
            MupEvent::Notice { .. } => "Notice",
            MupEvent::PlaybackFailed { .. } => "PlaybackFailed",
        }
    }

    /// Convenience constructor for notices
    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        MupEvent::Notice {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast bus for MupEvents
///
/// Lagging subscribers lose the oldest events; emitters never block.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MupEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MupEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: MupEvent) -> Result<usize, broadcast::error::SendError<MupEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MupEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
