//! Runtime playback settings
//!
//! Bootstrap values (port, database path, API base URL) live in
//! `mup_common::config::TomlConfig`. Everything the engine consults while
//! running is an `EngineSettings` value, loaded from the `settings` table by
//! `db::settings::load_engine_settings` with the defaults below filling any
//! missing keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Alternate source queried when the catalogue has no playable URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockProvider {
    /// Looked up by song id
    Netease,
    /// Looked up by `name-artist` keyword
    Kuwo,
}

impl UnlockProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnlockProvider::Netease => "netease",
            UnlockProvider::Kuwo => "kuwo",
        }
    }
}

impl fmt::Display for UnlockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnlockProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "netease" => Ok(UnlockProvider::Netease),
            "kuwo" => Ok(UnlockProvider::Kuwo),
            other => Err(format!("unknown unlock provider: {}", other)),
        }
    }
}

/// Settings consulted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Fade volume on play/pause
    pub fade_enabled: bool,
    /// Fade length in milliseconds
    pub fade_time_ms: u64,
    /// Play preview-only URLs instead of treating them as unresolved
    pub allow_trial_playback: bool,
    /// Race unlock providers when the catalogue has no URL
    pub unlock_enabled: bool,
    pub unlock_providers: Vec<UnlockProvider>,
    /// Quality level requested from the stream gateway
    pub song_level: String,
    /// Prefer the word-timed karaoke track when a song has one
    pub karaoke_lyrics: bool,
    /// Emit taskbar progress on every tick
    pub taskbar_progress: bool,
    /// Advertise large artwork variants in media metadata
    pub high_quality_cover: bool,
    pub tick_interval_ms: u64,
    /// Consecutive failures tolerated before the engine gives up
    pub max_retries: u32,
    /// Minimum remaining seconds for a saved position to be restored
    pub restore_guard_secs: f64,
    pub volume: f32,
    pub rate: f32,
    /// Step used by volume up/down
    pub volume_step: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fade_enabled: true,
            fade_time_ms: 300,
            allow_trial_playback: false,
            unlock_enabled: true,
            unlock_providers: vec![UnlockProvider::Netease, UnlockProvider::Kuwo],
            song_level: "exhigh".to_string(),
            karaoke_lyrics: true,
            taskbar_progress: false,
            high_quality_cover: false,
            tick_interval_ms: 250,
            max_retries: 5,
            restore_guard_secs: 2.0,
            volume: 0.7,
            rate: 1.0,
            volume_step: 0.05,
        }
    }
}

impl EngineSettings {
    /// Effective fade length (zero when fading is off)
    pub fn fade_duration(&self) -> Duration {
        if self.fade_enabled {
            Duration::from_millis(self.fade_time_ms)
        } else {
            Duration::ZERO
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(10))
    }
}

/// Playback rate bounds accepted by `set_rate`
pub const MIN_RATE: f32 = 0.25;
pub const MAX_RATE: f32 = 4.0;
