//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: actor state, run loop, message dispatch, snapshot
//! - `playback.rs`: transport (play, pause, seek, rate, volume)
//! - `queue.rs`: playlist commands, advance, mode changes
//! - `loading.rs`: song loading, resolution, session lifecycle events
//! - `recovery.rs`: failure classification and retry policy
//! - `radio.rs`: heartbeat and personal radio sub-modes
//! - `tick.rs`: synchronization tick (position, lyric line, telemetry)
//!
//! The engine is a single tokio task that owns every piece of mutable
//! playback state. `PlaybackEngine` is the cloneable handle used to talk to
//! it.

mod core;
mod loading;
mod playback;
mod queue;
mod radio;
mod recovery;
mod tick;

use crate::audio::backend::AudioBackend;
use crate::config::EngineSettings;
use crate::db::{PersistedSession, PlaybackStore};
use crate::error::{Error, Result};
use crate::gateway::{LyricSource, RecommendationSource, StreamGateway};
use crate::state::{EngineSnapshot, SharedState};
use mup_common::events::MupEvent;
use mup_common::models::{PlayMode, Song, SongId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use self::core::{EngineCore, EngineRequest};

/// Command queue depth
const COMMAND_CAPACITY: usize = 64;

/// Collaborators injected into the engine
#[derive(Clone)]
pub struct EngineContext {
    pub backend: Arc<dyn AudioBackend>,
    pub streams: Arc<dyn StreamGateway>,
    pub lyrics: Arc<dyn LyricSource>,
    pub recommendations: Arc<dyn RecommendationSource>,
    pub store: Arc<dyn PlaybackStore>,
    pub settings: EngineSettings,
}

/// Direction for `AdjustVolume`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeStep {
    Up,
    Down,
}

/// Commands accepted by the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Replace the playlist; start from `start` when given (else the first
    /// visible entry)
    LoadPlaylist {
        songs: Vec<Song>,
        start: Option<SongId>,
        playlist_id: Option<String>,
        play: bool,
    },
    Play,
    Pause,
    TogglePlay,
    /// Seconds from the start of the track
    Seek(f64),
    SetRate(f32),
    SetVolume(f32),
    AdjustVolume(VolumeStep),
    ToggleMute,
    Next,
    Prev,
    /// `None` cycles to the next base mode
    SetMode(Option<PlayMode>),
    InsertNext {
        song: Song,
        play: bool,
    },
    RemoveAt(usize),
    ClearPlaylist,
    PlayIndex {
        index: usize,
        play: bool,
    },
    SetHeartbeat(bool),
    SetPersonalRadio(bool),
    TrashRadioSong(SongId),
    /// Seconds added to the playback position before lyric lookup
    SetLyricOffset(f64),
    SetKaraokeLyrics(bool),
    /// Load a saved session without starting playback
    Restore(PersistedSession),
}

impl EngineCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::LoadPlaylist { .. } => "load_playlist",
            EngineCommand::Play => "play",
            EngineCommand::Pause => "pause",
            EngineCommand::TogglePlay => "toggle_play",
            EngineCommand::Seek(_) => "seek",
            EngineCommand::SetRate(_) => "set_rate",
            EngineCommand::SetVolume(_) => "set_volume",
            EngineCommand::AdjustVolume(_) => "adjust_volume",
            EngineCommand::ToggleMute => "toggle_mute",
            EngineCommand::Next => "next",
            EngineCommand::Prev => "prev",
            EngineCommand::SetMode(_) => "set_mode",
            EngineCommand::InsertNext { .. } => "insert_next",
            EngineCommand::RemoveAt(_) => "remove_at",
            EngineCommand::ClearPlaylist => "clear_playlist",
            EngineCommand::PlayIndex { .. } => "play_index",
            EngineCommand::SetHeartbeat(_) => "set_heartbeat",
            EngineCommand::SetPersonalRadio(_) => "set_personal_radio",
            EngineCommand::TrashRadioSong(_) => "trash_radio_song",
            EngineCommand::SetLyricOffset(_) => "set_lyric_offset",
            EngineCommand::SetKaraokeLyrics(_) => "set_karaoke_lyrics",
            EngineCommand::Restore(_) => "restore",
        }
    }
}

/// Handle to the engine task
#[derive(Clone)]
pub struct PlaybackEngine {
    tx: mpsc::Sender<EngineRequest>,
    state: Arc<SharedState>,
}

impl PlaybackEngine {
    /// Spawn the engine task
    pub fn spawn(ctx: EngineContext, state: Arc<SharedState>) -> Self {
        Self::spawn_with_rng(ctx, state, StdRng::from_entropy())
    }

    /// Spawn with a fixed shuffle source
    pub fn spawn_with_rng(ctx: EngineContext, state: Arc<SharedState>, rng: StdRng) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let core = EngineCore::new(ctx, Arc::clone(&state), message_tx, rng);
        tokio::spawn(core.run(rx, message_rx));
        Self { tx, state }
    }

    /// Run a command and wait for its result
    pub async fn execute(&self, command: EngineCommand) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Command { command, reply })
            .await
            .map_err(|_| Error::EngineStopped)?;
        rx.await.map_err(|_| Error::EngineStopped)?
    }

    /// Snapshot taken inside the engine task (reflects every prior command)
    pub async fn snapshot(&self) -> Result<EngineSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Snapshot { reply })
            .await
            .map_err(|_| Error::EngineStopped)?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MupEvent> {
        self.state.subscribe_events()
    }

    /// Stop the engine task, persisting the position first
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Shutdown { reply })
            .await
            .map_err(|_| Error::EngineStopped)?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    pub async fn play(&self) -> Result<()> {
        self.execute(EngineCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.execute(EngineCommand::Pause).await
    }

    pub async fn next(&self) -> Result<()> {
        self.execute(EngineCommand::Next).await
    }

    pub async fn prev(&self) -> Result<()> {
        self.execute(EngineCommand::Prev).await
    }

    pub async fn seek(&self, secs: f64) -> Result<()> {
        self.execute(EngineCommand::Seek(secs)).await
    }

    pub async fn load_playlist(&self, songs: Vec<Song>, start: Option<SongId>, play: bool) -> Result<()> {
        self.execute(EngineCommand::LoadPlaylist {
            songs,
            start,
            playlist_id: None,
            play,
        })
        .await
    }
}
