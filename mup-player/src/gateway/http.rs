//! HTTP gateway against a NeteaseCloudMusicApi-compatible server

use super::format::parse_songs;
use super::{LyricSource, RecommendationSource, StreamGateway, StreamResolution};
use crate::config::UnlockProvider;
use crate::error::{Error, Result};
use crate::lyrics::build_song_lyric;
use async_trait::async_trait;
use mup_common::models::{Platform, Song, SongId, SongLyric};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Request timeout applied to every call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Music API client
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    default_platform: Platform,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_platform: Platform::Netease,
        })
    }

    /// Platform used when a song carries none
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.default_platform = platform;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)], platform: Option<Platform>) -> Result<Value> {
        let platform = platform.unwrap_or(self.default_platform);
        debug!("GET {} {:?}", path, query);
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .query(&[
                ("platform", platform.as_str().to_string()),
                ("timestamp", chrono::Utc::now().timestamp_millis().to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

/// Reject payloads whose `code` is present and not 200
fn ensure_ok(value: &Value) -> Result<()> {
    match value.get("code").and_then(Value::as_i64) {
        None | Some(200) => Ok(()),
        Some(code) => {
            let message = value
                .get("message")
                .or_else(|| value.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("request rejected");
            Err(Error::Gateway(format!("code {}: {}", code, message)))
        }
    }
}

pub(crate) fn parse_stream_resolution(value: &Value) -> StreamResolution {
    let entry = value.get("data").and_then(|d| d.get(0));
    let url = entry
        .and_then(|e| e.get("url"))
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let trial_only = entry
        .and_then(|e| e.get("freeTrialInfo"))
        .map(|t| !t.is_null())
        .unwrap_or(false);
    StreamResolution { url, trial_only }
}

pub(crate) fn parse_unlock(value: &Value) -> Option<String> {
    if value.get("code").and_then(Value::as_i64) != Some(200) {
        return None;
    }
    value
        .get("url")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_lyric(value: &Value) -> Option<SongLyric> {
    let section = |key: &str| {
        value
            .get(key)
            .and_then(|s| s.get("lyric"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    };
    let lyric = build_song_lyric(section("lrc"), section("tlyric"), section("romalrc"), section("yrc"));
    (!lyric.is_empty()).then_some(lyric)
}

pub(crate) fn parse_chorus(value: &Value) -> Option<u64> {
    value
        .get("chorus")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("startTime"))
        .and_then(Value::as_u64)
}

#[async_trait]
impl StreamGateway for HttpGateway {
    async fn resolve_stream_url(
        &self,
        song_id: &SongId,
        platform: Option<Platform>,
        level: &str,
    ) -> Result<StreamResolution> {
        let value = self
            .get_json(
                "/song/url/v1",
                &[("id", song_id.to_string()), ("level", level.to_string())],
                platform,
            )
            .await?;
        ensure_ok(&value)?;
        Ok(parse_stream_resolution(&value))
    }

    async fn resolve_unlock_url(
        &self,
        song_id: &SongId,
        keyword: &str,
        provider: UnlockProvider,
    ) -> Result<Option<String>> {
        let body = match provider {
            UnlockProvider::Netease => json!({ "id": song_id.as_str() }),
            UnlockProvider::Kuwo => json!({ "keyword": keyword }),
        };
        let value = self.post_json(&format!("/unblock/{}", provider), body).await?;
        Ok(parse_unlock(&value))
    }
}

#[async_trait]
impl LyricSource for HttpGateway {
    async fn fetch_lyrics(&self, song_id: &SongId) -> Result<Option<SongLyric>> {
        let value = self
            .get_json("/lyric/new", &[("id", song_id.to_string())], None)
            .await?;
        ensure_ok(&value)?;
        Ok(parse_lyric(&value))
    }

    async fn fetch_chorus_offset(&self, song_id: &SongId) -> Result<Option<u64>> {
        let value = self
            .get_json("/song/chorus", &[("id", song_id.to_string())], None)
            .await?;
        ensure_ok(&value)?;
        Ok(parse_chorus(&value))
    }
}

#[async_trait]
impl RecommendationSource for HttpGateway {
    async fn heartbeat_list(&self, song_id: &SongId, playlist_id: Option<&str>) -> Result<Vec<Song>> {
        let mut query = vec![("id", song_id.to_string())];
        if let Some(pid) = playlist_id {
            query.push(("pid", pid.to_string()));
        }
        let value = self
            .get_json("/playmode/intelligence/list", &query, None)
            .await?;
        ensure_ok(&value)?;
        Ok(parse_songs(value.get("data"), self.default_platform))
    }

    async fn personal_radio(&self) -> Result<Vec<Song>> {
        let value = self.get_json("/personal/fm", &[], None).await?;
        ensure_ok(&value)?;
        Ok(parse_songs(value.get("data"), self.default_platform))
    }

    async fn trash_radio_song(&self, song_id: &SongId) -> Result<()> {
        let value = self
            .get_json("/fm/trash", &[("id", song_id.to_string())], None)
            .await?;
        ensure_ok(&value)
    }
}
