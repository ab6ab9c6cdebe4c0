//! Error types for the MuPlayer playback service

use thiserror::Error;

/// Playback service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] mup_common::Error),

    /// HTTP transport errors talking to the music API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Music API answered but the payload was unusable
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Audio decoding errors
    #[error("Decode error: {0}")]
    Decode(String),

    /// Audio output errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A playback-start command found nothing to play
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Consecutive failure budget exhausted
    #[error("Playback failed {attempts} times in a row")]
    RetryBudgetExceeded { attempts: u32 },

    /// Engine task is gone (shutdown or panic)
    #[error("Playback engine stopped")]
    EngineStopped,

    /// Invalid state errors
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type for playback service operations
pub type Result<T> = std::result::Result<T, Error>;
