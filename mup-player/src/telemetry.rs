//! Metadata & telemetry bridge
//!
//! One-way sink from the engine to whoever listens on the event bus (SSE
//! clients, media-session integrations, a taskbar indicator). Nothing here
//! reads state back.

use crate::state::SharedState;
use chrono::Utc;
use mup_common::events::{Artwork, FailureReason, MediaMetadata, MupEvent, NoticeLevel};
use mup_common::models::{PlayMode, Song};
use mup_common::time;
use std::sync::Arc;

/// Artist/album shown for radio programs
pub const RADIO_LABEL: &str = "Podcast Radio";

const STANDARD_COVER_SIZES: [u32; 5] = [512, 100, 300, 1024, 1920];
const HIGH_QUALITY_COVER_SIZES: [u32; 1] = [1920];

/// Sized cover variant; remote covers are resized server-side with `param=WxH`
fn cover_variant(cover: &str, size: u32) -> Artwork {
    let src = if cover.starts_with("http://") || cover.starts_with("https://") {
        let sep = if cover.contains('?') { '&' } else { '?' };
        format!("{}{}param={}y{}", cover, sep, size, size)
    } else {
        cover.to_string()
    };
    Artwork {
        src,
        sizes: format!("{}x{}", size, size),
    }
}

/// Build now-playing metadata for `song`
pub fn build_media_metadata(song: &Song, high_quality_cover: bool) -> MediaMetadata {
    let (artist, album) = if song.is_radio() {
        (RADIO_LABEL.to_string(), RADIO_LABEL.to_string())
    } else {
        (
            song.artist_names(" / "),
            song.album.as_ref().map(|a| a.name.clone()).unwrap_or_default(),
        )
    };

    let sizes: &[u32] = if high_quality_cover {
        &HIGH_QUALITY_COVER_SIZES
    } else {
        &STANDARD_COVER_SIZES
    };
    let artwork = song
        .cover
        .as_deref()
        .map(|cover| sizes.iter().map(|size| cover_variant(cover, *size)).collect())
        .unwrap_or_default();

    MediaMetadata {
        title: song.name.clone(),
        artist,
        album,
        artwork,
    }
}

/// Pushes engine changes onto the event bus
#[derive(Clone)]
pub struct TelemetryBridge {
    state: Arc<SharedState>,
    high_quality_cover: bool,
}

impl TelemetryBridge {
    pub fn new(state: Arc<SharedState>, high_quality_cover: bool) -> Self {
        Self {
            state,
            high_quality_cover,
        }
    }

    fn emit(&self, event: MupEvent) {
        self.state.broadcast_event(event);
    }

    pub fn play_state(&self, playing: bool) {
        self.emit(MupEvent::PlayStateChanged {
            playing,
            timestamp: Utc::now(),
        });
    }

    pub fn loading(&self, loading: bool) {
        self.emit(MupEvent::LoadingChanged {
            loading,
            timestamp: Utc::now(),
        });
    }

    /// Current song changed; also refreshes media metadata
    pub fn current_song(&self, song: Option<&Song>, index: Option<usize>) {
        self.emit(MupEvent::CurrentSongChanged {
            song: song.cloned(),
            index,
            timestamp: Utc::now(),
        });
        if let Some(song) = song {
            self.emit(MupEvent::MediaMetadataChanged {
                metadata: build_media_metadata(song, self.high_quality_cover),
                title: song.display_title(),
                timestamp: Utc::now(),
            });
        }
    }

    pub fn progress(&self, time: f64, duration: f64, lyric_index: i64) {
        self.emit(MupEvent::PlaybackProgress {
            time,
            duration,
            progress: time::progress(time, duration),
            lyric_index,
            timestamp: Utc::now(),
        });
    }

    pub fn lyric_line(&self, index: i64, karaoke: bool, text: Option<String>) {
        self.emit(MupEvent::LyricLineChanged {
            index,
            karaoke,
            text,
            timestamp: Utc::now(),
        });
    }

    pub fn taskbar(&self, progress: f64) {
        self.emit(MupEvent::TaskbarProgress {
            progress,
            timestamp: Utc::now(),
        });
    }

    pub fn mode(&self, mode: PlayMode, heartbeat: bool, personal_radio: bool) {
        self.emit(MupEvent::ModeChanged {
            mode,
            heartbeat,
            personal_radio,
            timestamp: Utc::now(),
        });
    }

    pub fn playlist(&self, length: usize, index: Option<usize>, shuffled: bool) {
        self.emit(MupEvent::PlaylistChanged {
            length,
            index,
            shuffled,
            timestamp: Utc::now(),
        });
    }

    pub fn volume(&self, volume: f32, muted: bool) {
        self.emit(MupEvent::VolumeChanged {
            volume,
            muted,
            timestamp: Utc::now(),
        });
    }

    pub fn rate(&self, rate: f32) {
        self.emit(MupEvent::RateChanged {
            rate,
            timestamp: Utc::now(),
        });
    }

    pub fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(MupEvent::notice(level, message));
    }

    pub fn failed(&self, reason: FailureReason) {
        self.emit(MupEvent::PlaybackFailed {
            reason,
            timestamp: Utc::now(),
        });
    }
}
