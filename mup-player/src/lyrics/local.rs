//! Sidecar lyrics for local files
//!
//! A local track `song.flac` picks up `song.lrc` from the same directory.

use super::parser::build_song_lyric;
use mup_common::models::SongLyric;
use std::path::Path;
use tracing::debug;

/// Read the `.lrc` file next to `audio_path`, if any
pub async fn read_sidecar_lyric(audio_path: &Path) -> Option<SongLyric> {
    let lrc_path = audio_path.with_extension("lrc");
    match tokio::fs::read_to_string(&lrc_path).await {
        Ok(text) => {
            let lyric = build_song_lyric(Some(&text), None, None, None);
            (!lyric.is_empty()).then_some(lyric)
        }
        Err(e) => {
            debug!("No sidecar lyric at {}: {}", lrc_path.display(), e);
            None
        }
    }
}
