//! Messages posted back to the engine task
//!
//! Everything asynchronous (backend callbacks, URL resolution, lyric fetches,
//! recommendation fetches) reaches the engine as one of these. Load-cycle
//! results are tagged with the generation that was current when the work
//! started and are dropped once it moves on. Recommendation lists carry
//! their own request token instead, since fetching one must not disturb the
//! session that is playing.

use crate::audio::backend::SessionEvent;
use crate::gateway::Resolution;
use mup_common::models::{Song, SongLyric};

/// Which recommendation request produced a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    Heartbeat,
    /// Personal radio entered or refilled
    PersonalRadio,
}

#[derive(Debug)]
pub enum EngineMessage {
    Session {
        generation: u64,
        event: SessionEvent,
    },
    Resolved {
        generation: u64,
        resolution: Resolution,
    },
    LyricFetched {
        generation: u64,
        lyric: SongLyric,
    },
    ChorusFetched {
        generation: u64,
        start_ms: u64,
    },
    Recommendations {
        token: u64,
        kind: RecommendationKind,
        /// Start playing once the list is loaded
        autoplay: bool,
        result: std::result::Result<Vec<Song>, String>,
    },
    RadioSongTrashed {
        generation: u64,
        result: std::result::Result<(), String>,
    },
}

impl EngineMessage {
    /// Load cycle this message belongs to, `None` for recommendation lists
    pub fn generation(&self) -> Option<u64> {
        match self {
            EngineMessage::Session { generation, .. }
            | EngineMessage::Resolved { generation, .. }
            | EngineMessage::LyricFetched { generation, .. }
            | EngineMessage::ChorusFetched { generation, .. }
            | EngineMessage::RadioSongTrashed { generation, .. } => Some(*generation),
            EngineMessage::Recommendations { .. } => None,
        }
    }
}
