//! # MuPlayer Playback Service (mup-player)
//!
//! Playback engine for a streaming music client: one audio session at a
//! time, playlist advance under repeat/shuffle/recommendation modes, lyric
//! sync, and failure recovery.
//!
//! **Architecture:** the engine is a single tokio actor; audio goes through
//! the `AudioBackend` seam (symphonia + rubato, optionally cpal); songs are
//! resolved through the music API gateway; state is persisted to SQLite and
//! exposed over HTTP/SSE.

pub mod api;
pub mod audio;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod lyrics;
pub mod playback;
pub mod state;
pub mod telemetry;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
pub use state::SharedState;
