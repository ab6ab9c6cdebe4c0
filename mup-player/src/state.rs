//! Shared playback state
//!
//! The engine task owns all mutable playback state. What it exposes is a
//! published `EngineSnapshot` (refreshed after every handled message) and the
//! event bus that SSE clients and telemetry subscribers listen on.

use mup_common::events::{EventBus, MupEvent};
use mup_common::models::{PlayMode, Song, SongLyric};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

/// Default event buffer per subscriber
pub const EVENT_CAPACITY: usize = 256;

/// Session controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No session
    #[default]
    Idle,
    /// Resolving a source or waiting for backend metadata
    Loading,
    /// Metadata known, not playing
    Ready,
    Playing,
    Paused,
    /// Track reached its natural end
    Ended,
    /// Backend or resolution failure being handled
    Errored,
}

/// Read-only view of the engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub phase: SessionPhase,
    /// Intended play state
    pub playing: bool,
    pub loading: bool,
    pub index: Option<usize>,
    pub playlist: Vec<Song>,
    pub current_song: Option<Song>,
    pub mode: PlayMode,
    pub heartbeat: bool,
    pub personal_radio: bool,
    /// Visible order is a shuffle permutation
    pub shuffled: bool,
    pub playlist_id: Option<String>,
    pub generation: u64,
    pub retry_count: u32,
    pub current_time: f64,
    pub duration: f64,
    pub progress: f64,
    pub lyric_index: i64,
    pub lyric: SongLyric,
    pub karaoke: bool,
    pub lyric_offset: f64,
    pub volume: f32,
    pub muted: bool,
    pub rate: f32,
    /// Chorus start in seconds, when known
    pub chorus_secs: Option<f64>,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            playing: false,
            loading: false,
            index: None,
            playlist: Vec::new(),
            current_song: None,
            mode: PlayMode::Repeat,
            heartbeat: false,
            personal_radio: false,
            shuffled: false,
            playlist_id: None,
            generation: 0,
            retry_count: 0,
            current_time: 0.0,
            duration: 0.0,
            progress: 0.0,
            lyric_index: -1,
            lyric: SongLyric::default(),
            karaoke: false,
            lyric_offset: 0.0,
            volume: 0.0,
            muted: false,
            rate: 1.0,
            chorus_secs: None,
        }
    }
}

/// State shared between the engine task, the HTTP layer and telemetry
pub struct SharedState {
    events: EventBus,
    snapshot: RwLock<EngineSnapshot>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: EventBus::new(capacity),
            snapshot: RwLock::new(EngineSnapshot::default()),
        }
    }

    /// Broadcast an event to all listeners (no listeners is fine)
    pub fn broadcast_event(&self, event: MupEvent) {
        self.events.emit_lossy(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<MupEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn publish_snapshot(&self, snapshot: EngineSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
