//! External resolution gateway
//!
//! Traits for the music API collaborators (stream URLs, unlock providers,
//! lyrics, recommendations) and the resolution policy that turns a song into
//! something playable.

pub mod format;
pub mod http;
pub mod unlock;

pub use http::HttpGateway;
pub use unlock::race_unlock;

use crate::config::{EngineSettings, UnlockProvider};
use crate::error::Result;
use async_trait::async_trait;
use mup_common::models::{Platform, Song, SongId, SongLyric};
use tracing::{debug, info, warn};

/// Answer of the primary stream lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamResolution {
    pub url: Option<String>,
    /// URL only covers a preview clip
    pub trial_only: bool,
}

#[async_trait]
pub trait StreamGateway: Send + Sync {
    /// Primary URL lookup
    async fn resolve_stream_url(
        &self,
        song_id: &SongId,
        platform: Option<Platform>,
        level: &str,
    ) -> Result<StreamResolution>;

    /// Best-effort lookup on an alternate provider
    async fn resolve_unlock_url(
        &self,
        song_id: &SongId,
        keyword: &str,
        provider: UnlockProvider,
    ) -> Result<Option<String>>;
}

#[async_trait]
pub trait LyricSource: Send + Sync {
    async fn fetch_lyrics(&self, song_id: &SongId) -> Result<Option<SongLyric>>;

    /// Chorus start in milliseconds
    async fn fetch_chorus_offset(&self, song_id: &SongId) -> Result<Option<u64>>;
}

#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Similarity list seeded by a song (and optionally a playlist)
    async fn heartbeat_list(&self, song_id: &SongId, playlist_id: Option<&str>) -> Result<Vec<Song>>;

    /// Next batch of personal radio songs
    async fn personal_radio(&self) -> Result<Vec<Song>>;

    /// Tell the service a radio song should not come back
    async fn trash_radio_song(&self, song_id: &SongId) -> Result<()>;
}

/// Outcome of resolving a streamed or radio song
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Playable {
        url: String,
        trial_only: bool,
        /// Set when the URL came from an unlock provider
        unlocked_by: Option<UnlockProvider>,
    },
    /// No URL from any allowed source
    Unavailable,
    /// The lookup itself failed (transport, timeout, bad payload)
    Failed(String),
}

/// Settings that shape resolution
#[derive(Debug, Clone)]
pub struct ResolvePolicy {
    pub level: String,
    pub allow_trial: bool,
    pub unlock_enabled: bool,
    pub providers: Vec<UnlockProvider>,
}

impl From<&EngineSettings> for ResolvePolicy {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            level: settings.song_level.clone(),
            allow_trial: settings.allow_trial_playback,
            unlock_enabled: settings.unlock_enabled,
            providers: settings.unlock_providers.clone(),
        }
    }
}

/// Resolve a non-local song to a URL
///
/// Trial-only answers count as unresolved unless trial playback is allowed.
/// Unresolved songs go to the unlock providers, except radio programs which
/// are never unlocked.
pub async fn resolve_playable(
    streams: &dyn StreamGateway,
    song: &Song,
    policy: &ResolvePolicy,
) -> Resolution {
    match streams
        .resolve_stream_url(song.resolution_id(), song.platform, &policy.level)
        .await
    {
        Ok(StreamResolution { url: Some(url), trial_only }) if !trial_only || policy.allow_trial => {
            return Resolution::Playable {
                url,
                trial_only,
                unlocked_by: None,
            };
        }
        Ok(StreamResolution { url: Some(_), .. }) => {
            debug!("'{}' is preview-only and previews are disabled", song.name);
        }
        Ok(StreamResolution { url: None, .. }) => {
            debug!("No stream URL for '{}'", song.name);
        }
        Err(e) => {
            warn!("Stream lookup for '{}' failed: {}", song.name, e);
            return Resolution::Failed(e.to_string());
        }
    }

    if !policy.unlock_enabled || song.is_radio() {
        return Resolution::Unavailable;
    }

    match race_unlock(streams, song, &policy.providers).await {
        Some((provider, url)) => {
            info!("Unlocked '{}' via {}", song.name, provider);
            Resolution::Playable {
                url,
                trial_only: false,
                unlocked_by: Some(provider),
            }
        }
        None => Resolution::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted gateway for resolution tests
    #[derive(Default)]
    struct ScriptedStreams {
        primary: Mutex<Option<Result<StreamResolution>>>,
        unlock: HashMap<UnlockProvider, Option<String>>,
        unlock_calls: Mutex<Vec<UnlockProvider>>,
    }

    #[async_trait]
    impl StreamGateway for ScriptedStreams {
        async fn resolve_stream_url(
            &self,
            _song_id: &SongId,
            _platform: Option<Platform>,
            _level: &str,
        ) -> Result<StreamResolution> {
            self.primary
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(StreamResolution::default()))
        }

        async fn resolve_unlock_url(
            &self,
            _song_id: &SongId,
            _keyword: &str,
            provider: UnlockProvider,
        ) -> Result<Option<String>> {
            self.unlock_calls.lock().unwrap().push(provider);
            Ok(self.unlock.get(&provider).cloned().flatten())
        }
    }

    fn policy(allow_trial: bool, unlock_enabled: bool) -> ResolvePolicy {
        ResolvePolicy {
            level: "exhigh".into(),
            allow_trial,
            unlock_enabled,
            providers: vec![UnlockProvider::Netease, UnlockProvider::Kuwo],
        }
    }

    fn primary(url: Option<&str>, trial_only: bool) -> Mutex<Option<Result<StreamResolution>>> {
        Mutex::new(Some(Ok(StreamResolution {
            url: url.map(str::to_string),
            trial_only,
        })))
    }

    #[tokio::test]
    async fn test_direct_url_wins() {
        let streams = ScriptedStreams {
            primary: primary(Some("http://a/1.mp3"), false),
            ..Default::default()
        };
        let song = Song::new(1u64, "one");
        let resolution = resolve_playable(&streams, &song, &policy(false, true)).await;
        assert_eq!(
            resolution,
            Resolution::Playable {
                url: "http://a/1.mp3".into(),
                trial_only: false,
                unlocked_by: None
            }
        );
        assert!(streams.unlock_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trial_allowed_plays_preview() {
        let streams = ScriptedStreams {
            primary: primary(Some("http://a/preview.mp3"), true),
            ..Default::default()
        };
        let song = Song::new(1u64, "one");
        match resolve_playable(&streams, &song, &policy(true, true)).await {
            Resolution::Playable { trial_only, .. } => assert!(trial_only),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trial_disallowed_falls_back_to_unlock() {
        let mut unlock = HashMap::new();
        unlock.insert(UnlockProvider::Kuwo, Some("http://kuwo/1.mp3".to_string()));
        let streams = ScriptedStreams {
            primary: primary(Some("http://a/preview.mp3"), true),
            unlock,
            ..Default::default()
        };
        let song = Song::new(1u64, "one").with_artist("someone");
        match resolve_playable(&streams, &song, &policy(false, true)).await {
            Resolution::Playable { url, unlocked_by, .. } => {
                assert_eq!(url, "http://kuwo/1.mp3");
                assert_eq!(unlocked_by, Some(UnlockProvider::Kuwo));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_radio_items_are_never_unlocked() {
        let mut unlock = HashMap::new();
        unlock.insert(UnlockProvider::Netease, Some("http://n/1.mp3".to_string()));
        let streams = ScriptedStreams {
            primary: primary(None, false),
            unlock,
            ..Default::default()
        };
        let song = Song::radio(1u64, "episode", 77u64);
        let resolution = resolve_playable(&streams, &song, &policy(false, true)).await;
        assert_eq!(resolution, Resolution::Unavailable);
        assert!(streams.unlock_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unlock_disabled_is_unavailable() {
        let streams = ScriptedStreams {
            primary: primary(None, false),
            ..Default::default()
        };
        let song = Song::new(1u64, "one");
        let resolution = resolve_playable(&streams, &song, &policy(false, false)).await;
        assert_eq!(resolution, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn test_lookup_error_is_failed() {
        let streams = ScriptedStreams {
            primary: Mutex::new(Some(Err(Error::Gateway("timeout".into())))),
            ..Default::default()
        };
        let song = Song::new(1u64, "one");
        match resolve_playable(&streams, &song, &policy(false, true)).await {
            Resolution::Failed(message) => assert!(message.contains("timeout")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
