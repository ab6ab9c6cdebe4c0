//! Domain models shared between the engine and its collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Song identifier
///
/// Catalogue ids are numeric on some platforms and opaque strings on others,
/// so they are carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for SongId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for SongId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SongId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where the audio for a song comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SongSource {
    /// Resolved to a URL through the streaming gateway
    #[default]
    Streamed,
    /// File on local disk, played directly
    LocalFile,
    /// Radio/podcast program; resolved by program id, never unlocked
    RadioProgram,
}

/// Catalogue platform a streamed song belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Netease,
    #[serde(rename = "qqmusic")]
    QqMusic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Netease => "netease",
            Platform::QqMusic => "qqmusic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<SongId>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub id: Option<SongId>,
    pub name: String,
}

/// A playable song
///
/// Immutable once placed in a playlist; only `cover` may be filled in late
/// by collaborators before insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    /// Catalogue duration in milliseconds (0 when unknown)
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub source: SongSource,
    /// Local file path, present for `SongSource::LocalFile`
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Program id used for URL resolution of radio items
    #[serde(default)]
    pub program_id: Option<SongId>,
    #[serde(default)]
    pub cover: Option<String>,
}

impl Song {
    /// Streamed catalogue song with no artist or album data
    pub fn new(id: impl Into<SongId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists: Vec::new(),
            album: None,
            duration_ms: 0,
            source: SongSource::Streamed,
            path: None,
            platform: None,
            program_id: None,
            cover: None,
        }
    }

    pub fn local(id: impl Into<SongId>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source: SongSource::LocalFile,
            path: Some(path.into()),
            ..Self::new(id, name)
        }
    }

    pub fn radio(id: impl Into<SongId>, name: impl Into<String>, program_id: impl Into<SongId>) -> Self {
        Self {
            source: SongSource::RadioProgram,
            program_id: Some(program_id.into()),
            ..Self::new(id, name)
        }
    }

    pub fn with_artist(mut self, name: impl Into<String>) -> Self {
        self.artists.push(ArtistRef { id: None, name: name.into() });
        self
    }

    pub fn with_album(mut self, name: impl Into<String>) -> Self {
        self.album = Some(AlbumRef { id: None, name: name.into() });
        self
    }

    pub fn is_radio(&self) -> bool {
        self.source == SongSource::RadioProgram
    }

    pub fn is_local(&self) -> bool {
        self.source == SongSource::LocalFile
    }

    /// Id handed to the stream gateway (the program id for radio items)
    pub fn resolution_id(&self) -> &SongId {
        match (&self.source, &self.program_id) {
            (SongSource::RadioProgram, Some(program)) => program,
            _ => &self.id,
        }
    }

    /// Artist names joined with `separator`
    pub fn artist_names(&self, separator: &str) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Search phrase for unlock providers that look songs up by text
    pub fn search_keyword(&self) -> String {
        match self.artists.first() {
            Some(artist) => format!("{}-{}", self.name, artist.name),
            None => self.name.clone(),
        }
    }

    /// `name - artists` line used for window titles and notifications
    pub fn display_title(&self) -> String {
        let artists = self.artist_names("/");
        if artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, artists)
        }
    }
}

/// Base playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayMode {
    /// Loop the whole playlist
    #[default]
    Repeat,
    /// Loop the current song
    RepeatOnce,
    Shuffle,
}

impl PlayMode {
    /// Next mode in the user-facing cycle
    pub fn cycle(self) -> Self {
        match self {
            PlayMode::Repeat => PlayMode::RepeatOnce,
            PlayMode::RepeatOnce => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::Repeat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayMode::Repeat => "repeat",
            PlayMode::RepeatOnce => "repeat-once",
            PlayMode::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repeat" => Ok(PlayMode::Repeat),
            "repeat-once" => Ok(PlayMode::RepeatOnce),
            "shuffle" => Ok(PlayMode::Shuffle),
            other => Err(format!("unknown play mode: {}", other)),
        }
    }
}

/// Timed word inside a karaoke line (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricWord {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// One lyric line; `time` and `end_time` are in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    pub time: f64,
    #[serde(default)]
    pub end_time: Option<f64>,
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub romanization: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<LyricWord>,
}

impl LyricLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            end_time: None,
            text: text.into(),
            translation: None,
            romanization: None,
            words: Vec::new(),
        }
    }
}

/// Lyrics of a song: a line-timed track and an optional karaoke track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongLyric {
    #[serde(default)]
    pub lrc: Vec<LyricLine>,
    #[serde(default)]
    pub yrc: Vec<LyricLine>,
}

impl SongLyric {
    pub fn is_empty(&self) -> bool {
        self.lrc.is_empty() && self.yrc.is_empty()
    }

    /// Whether the karaoke track is the active one
    pub fn uses_karaoke(&self, prefer_karaoke: bool) -> bool {
        prefer_karaoke && !self.yrc.is_empty()
    }

    /// Active track given the user's karaoke preference
    pub fn track(&self, prefer_karaoke: bool) -> &[LyricLine] {
        if self.uses_karaoke(prefer_karaoke) {
            &self.yrc
        } else {
            &self.lrc
        }
    }
}
