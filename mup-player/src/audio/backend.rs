//! Audio backend seam
//!
//! The engine talks to audio exclusively through `AudioBackend` (which opens
//! sessions) and `AudioSession` (one live track). Backends report lifecycle
//! changes through the `SessionEvents` handle they receive at open time;
//! every report is tagged with the generation of the load that opened the
//! session, so reports from a torn-down session are ignored by the engine.

use crate::error::Result;
use crate::playback::events::EngineMessage;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Where a session reads its audio from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayableSource {
    LocalFile(PathBuf),
    Remote(String),
}

impl PlayableSource {
    /// File extension hint for the decoder, ignoring any URL query
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            PlayableSource::LocalFile(path) => path.to_string_lossy().into_owned(),
            PlayableSource::Remote(url) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
        };
        let file = path.rsplit('/').next()?;
        let (_, ext) = file.rsplit_once('.')?;
        (!ext.is_empty() && ext.len() <= 5).then(|| ext.to_ascii_lowercase())
    }
}

/// Parameters for opening a session
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub source: PlayableSource,
    pub volume: f32,
    pub rate: f32,
}

/// Failure classes reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorKind {
    /// Source URL expired or was revoked; a fresh resolution may work
    Stale,
    /// Transport failure while fetching
    Network,
    /// Data could not be decoded
    Decode,
    /// Output device failure
    Output,
    /// Local file missing or unreadable
    Unavailable,
}

/// Lifecycle report from a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Metadata known; `duration` in seconds
    Loaded { duration: f64 },
    /// Audio actually started (or resumed) playing
    Started,
    /// Natural end of track
    Ended,
    Error {
        kind: SessionErrorKind,
        message: String,
    },
    /// A `fade` call finished
    FadeComplete { token: u64 },
}

/// Reporting handle given to a backend when a session is opened
#[derive(Debug, Clone)]
pub struct SessionEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<EngineMessage>,
}

impl SessionEvents {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<EngineMessage>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event; a stopped engine is ignored
    pub fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(EngineMessage::Session {
            generation: self.generation,
            event,
        });
    }

    pub fn loaded(&self, duration: f64) {
        self.send(SessionEvent::Loaded { duration });
    }

    pub fn started(&self) {
        self.send(SessionEvent::Started);
    }

    pub fn ended(&self) {
        self.send(SessionEvent::Ended);
    }

    pub fn error(&self, kind: SessionErrorKind, message: impl Into<String>) {
        self.send(SessionEvent::Error {
            kind,
            message: message.into(),
        });
    }

    pub fn fade_complete(&self, token: u64) {
        self.send(SessionEvent::FadeComplete { token });
    }
}

/// One live track. Dropping the session tears it down.
pub trait AudioSession: Send + Sync {
    /// Start or resume; before `Loaded` this only records the intent
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn is_loaded(&self) -> bool;
    /// Seek to `secs` from the start
    fn seek(&mut self, secs: f64);
    /// Current position in seconds
    fn position(&self) -> f64;
    /// Track length in seconds (0 until loaded)
    fn duration(&self) -> f64;
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn set_rate(&mut self, rate: f32);
    /// Linear volume ramp; reports `FadeComplete { token }` when done
    fn fade(&mut self, from: f32, to: f32, duration: Duration, token: u64);
}

/// Factory for sessions
pub trait AudioBackend: Send + Sync {
    fn open(&self, request: SessionRequest, events: SessionEvents) -> Result<Box<dyn AudioSession>>;
}
