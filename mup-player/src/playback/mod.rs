//! Playback engine and the pure state machines it drives

pub mod engine;
pub mod events;
pub mod mode;
pub mod persist;
pub mod playlist;
pub mod retry;

pub use engine::{EngineCommand, EngineContext, PlaybackEngine, VolumeStep};
pub use mode::{Advance, Direction, ModeState};
pub use playlist::Playlist;
