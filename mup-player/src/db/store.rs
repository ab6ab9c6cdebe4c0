//! Playback document store
//!
//! Playlist, position and history are JSON documents in the `kv_store`
//! table. Volume and rate go to the `settings` table so they are picked up by
//! `load_engine_settings` on the next start.

use crate::db::settings::set_setting;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use mup_common::models::{PlayMode, Song};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::warn;

/// Maximum entries kept in the play history
pub const HISTORY_LIMIT: usize = 500;

const KEY_PLAYLIST: &str = "playlist";
const KEY_POSITION: &str = "position";
const KEY_HISTORY: &str = "history";

/// Playback state saved between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub playlist: Vec<Song>,
    /// Pre-shuffle order when the playlist was saved shuffled
    #[serde(default)]
    pub original: Option<Vec<Song>>,
    pub index: Option<usize>,
    #[serde(default)]
    pub mode: PlayMode,
    /// Seconds into the current song
    #[serde(default)]
    pub time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlaylistDocument {
    songs: Vec<Song>,
    #[serde(default)]
    original: Option<Vec<Song>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PositionDocument {
    index: Option<usize>,
    #[serde(default)]
    mode: PlayMode,
    #[serde(default)]
    time: f64,
}

/// Persistent storage used by the engine
#[async_trait]
pub trait PlaybackStore: Send + Sync {
    async fn save_playlist(&self, songs: &[Song], original: Option<&[Song]>) -> Result<()>;

    /// Current index, base mode and seconds into the current song
    async fn save_position(&self, index: Option<usize>, mode: PlayMode, time: f64) -> Result<()>;

    async fn save_levels(&self, volume: f32, rate: f32) -> Result<()>;

    /// Push to the front of the history, dropping an older entry for the same song
    async fn append_history(&self, song: &Song) -> Result<()>;

    async fn load_session(&self) -> Result<Option<PersistedSession>>;

    /// Most recent first
    async fn history(&self) -> Result<Vec<Song>>;
}

/// Apply a history append to an in-memory list
pub fn push_history(history: &mut Vec<Song>, song: &Song) {
    history.retain(|s| s.id != song.id);
    history.insert(0, song.clone());
    history.truncate(HISTORY_LIMIT);
}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(mup_common::Error::from)?;
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Read a document; unreadable JSON is logged and treated as absent
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;

        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding unreadable '{}' document: {}", key, e);
                None
            }
        }))
    }
}

#[async_trait]
impl PlaybackStore for SqliteStore {
    async fn save_playlist(&self, songs: &[Song], original: Option<&[Song]>) -> Result<()> {
        let doc = PlaylistDocument {
            songs: songs.to_vec(),
            original: original.map(<[Song]>::to_vec),
        };
        self.put(KEY_PLAYLIST, &doc).await
    }

    async fn save_position(&self, index: Option<usize>, mode: PlayMode, time: f64) -> Result<()> {
        self.put(KEY_POSITION, &PositionDocument { index, mode, time }).await
    }

    async fn save_levels(&self, volume: f32, rate: f32) -> Result<()> {
        set_setting(&self.db, "volume", volume).await?;
        set_setting(&self.db, "rate", rate).await
    }

    async fn append_history(&self, song: &Song) -> Result<()> {
        let mut history: Vec<Song> = self.get(KEY_HISTORY).await?.unwrap_or_default();
        push_history(&mut history, song);
        self.put(KEY_HISTORY, &history).await
    }

    async fn load_session(&self) -> Result<Option<PersistedSession>> {
        let Some(playlist) = self.get::<PlaylistDocument>(KEY_PLAYLIST).await? else {
            return Ok(None);
        };
        let position = self.get::<PositionDocument>(KEY_POSITION).await?;
        let (index, mode, time) = position
            .map(|p| (p.index, p.mode, p.time))
            .unwrap_or((None, PlayMode::default(), 0.0));

        // A saved index past the end of the saved list is dropped
        let index = index.filter(|i| *i < playlist.songs.len());

        Ok(Some(PersistedSession {
            playlist: playlist.songs,
            original: playlist.original,
            index,
            mode,
            time: if index.is_some() { time.max(0.0) } else { 0.0 },
        }))
    }

    async fn history(&self) -> Result<Vec<Song>> {
        Ok(self.get(KEY_HISTORY).await?.unwrap_or_default())
    }
}
