//! # MuPlayer Common Library
//!
//! Shared code for the MuPlayer workspace:
//! - Domain models (songs, play modes, lyric lines)
//! - Event types (MupEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Time and progress helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, MupEvent};
pub use models::{LyricLine, PlayMode, Song, SongId, SongLyric, SongSource};
