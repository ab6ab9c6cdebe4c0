//! Shared fixtures for engine integration tests
//!
//! A scriptable audio backend, in-process gateways and an in-memory store,
//! plus `Harness` which wires them into a running engine.

#![allow(dead_code)]

use async_trait::async_trait;
use mup_common::events::MupEvent;
use mup_common::models::{Platform, PlayMode, Song, SongId, SongLyric};
use mup_player::audio::{AudioBackend, AudioSession, PlayableSource, SessionErrorKind, SessionEvents, SessionRequest};
use mup_player::config::{EngineSettings, UnlockProvider};
use mup_player::db::store::push_history;
use mup_player::db::{PersistedSession, PlaybackStore};
use mup_player::gateway::{LyricSource, RecommendationSource, StreamGateway, StreamResolution};
use mup_player::playback::{EngineCommand, EngineContext, PlaybackEngine};
use mup_player::state::{EngineSnapshot, SharedState};
use mup_player::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Audio backend
// ============================================================================

/// Observable state of one mock session
#[derive(Debug, Default, Clone)]
pub struct MockSessionState {
    pub loaded: bool,
    pub playing: bool,
    pub position: f64,
    pub duration: f64,
    pub volume: f32,
    pub rate: f32,
    pub seeks: Vec<f64>,
    pub dropped: bool,
}

struct OpenedSession {
    source: PlayableSource,
    events: SessionEvents,
    state: Arc<Mutex<MockSessionState>>,
}

/// Backend that records every open and lets the test drive lifecycle events
#[derive(Default)]
pub struct MockBackend {
    opened: Mutex<Vec<OpenedSession>>,
    fail_open: Mutex<bool>,
}

impl MockBackend {
    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn sources(&self) -> Vec<PlayableSource> {
        self.opened.lock().unwrap().iter().map(|s| s.source.clone()).collect()
    }

    pub fn last_source(&self) -> Option<PlayableSource> {
        self.opened.lock().unwrap().last().map(|s| s.source.clone())
    }

    /// Event handle of the `n`th opened session
    pub fn events(&self, n: usize) -> SessionEvents {
        self.opened.lock().unwrap()[n].events.clone()
    }

    pub fn session_state(&self, n: usize) -> MockSessionState {
        self.opened.lock().unwrap()[n].state.lock().unwrap().clone()
    }

    pub fn last_state(&self) -> MockSessionState {
        let opened = self.opened.lock().unwrap();
        let last = opened.last().expect("no session opened");
        let state = last.state.lock().unwrap().clone();
        state
    }

    pub fn set_fail_open(&self, fail: bool) {
        *self.fail_open.lock().unwrap() = fail;
    }

    fn with_last<F: FnOnce(&SessionEvents, &mut MockSessionState)>(&self, f: F) {
        let opened = self.opened.lock().unwrap();
        let last = opened.last().expect("no session opened");
        let mut state = last.state.lock().unwrap();
        f(&last.events, &mut state);
    }

    /// Latest session reports metadata
    pub fn loaded(&self, duration: f64) {
        self.with_last(|events, state| {
            state.loaded = true;
            state.duration = duration;
            events.loaded(duration);
        });
    }

    /// Latest session reaches its natural end
    pub fn ended(&self) {
        self.with_last(|events, state| {
            state.playing = false;
            state.position = state.duration;
            events.ended();
        });
    }

    pub fn error(&self, kind: SessionErrorKind) {
        self.with_last(|events, _| events.error(kind, "injected failure"));
    }

    /// Move the latest session's playhead
    pub fn set_position(&self, secs: f64) {
        self.with_last(|_, state| state.position = secs);
    }
}

impl AudioBackend for MockBackend {
    fn open(&self, request: SessionRequest, events: SessionEvents) -> Result<Box<dyn AudioSession>> {
        if *self.fail_open.lock().unwrap() {
            return Err(Error::AudioOutput("mock open failure".to_string()));
        }
        let state = Arc::new(Mutex::new(MockSessionState {
            volume: request.volume,
            rate: request.rate,
            ..MockSessionState::default()
        }));
        self.opened.lock().unwrap().push(OpenedSession {
            source: request.source,
            events: events.clone(),
            state: Arc::clone(&state),
        });
        Ok(Box::new(MockSession { state, events }))
    }
}

pub struct MockSession {
    state: Arc<Mutex<MockSessionState>>,
    events: SessionEvents,
}

impl AudioSession for MockSession {
    fn play(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.playing = true;
        if state.loaded {
            self.events.started();
        }
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn is_loaded(&self) -> bool {
        self.state.lock().unwrap().loaded
    }

    fn seek(&mut self, secs: f64) {
        let mut state = self.state.lock().unwrap();
        state.position = secs;
        state.seeks.push(secs);
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_rate(&mut self, rate: f32) {
        self.state.lock().unwrap().rate = rate;
    }

    /// Completes immediately
    fn fade(&mut self, _from: f32, to: f32, _duration: Duration, token: u64) {
        self.state.lock().unwrap().volume = to;
        self.events.fade_complete(token);
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.state.lock().unwrap().dropped = true;
    }
}

// ============================================================================
// Gateways
// ============================================================================

/// URL the mock stream gateway hands out for `id`
pub fn stream_url(id: &str) -> String {
    format!("http://mock.test/{}.mp3", id)
}

pub fn remote(id: &str) -> PlayableSource {
    PlayableSource::Remote(stream_url(id))
}

#[derive(Default)]
pub struct MockStreams {
    unavailable: Mutex<HashSet<SongId>>,
    trial_only: Mutex<HashSet<SongId>>,
    lookups: Mutex<Vec<SongId>>,
    delays: Mutex<HashMap<SongId, Duration>>,
}

impl MockStreams {
    pub fn mark_unavailable(&self, id: &str) {
        self.unavailable.lock().unwrap().insert(SongId::from(id));
    }

    pub fn mark_trial_only(&self, id: &str) {
        self.trial_only.lock().unwrap().insert(SongId::from(id));
    }

    pub fn lookups(&self) -> Vec<SongId> {
        self.lookups.lock().unwrap().clone()
    }

    /// Hold back the URL for `id` by `delay`
    pub fn delay(&self, id: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(SongId::from(id), delay);
    }
}

#[async_trait]
impl StreamGateway for MockStreams {
    async fn resolve_stream_url(
        &self,
        song_id: &SongId,
        _platform: Option<Platform>,
        _level: &str,
    ) -> Result<StreamResolution> {
        self.lookups.lock().unwrap().push(song_id.clone());
        let delay = self.delays.lock().unwrap().get(song_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.lock().unwrap().contains(song_id) {
            return Ok(StreamResolution::default());
        }
        Ok(StreamResolution {
            url: Some(stream_url(song_id.as_str())),
            trial_only: self.trial_only.lock().unwrap().contains(song_id),
        })
    }

    async fn resolve_unlock_url(
        &self,
        _song_id: &SongId,
        _keyword: &str,
        _provider: UnlockProvider,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct MockLyrics {
    /// Served for every song without its own entry
    pub lyric: Mutex<Option<SongLyric>>,
    pub per_song: Mutex<HashMap<SongId, SongLyric>>,
    pub delays: Mutex<HashMap<SongId, Duration>>,
    pub chorus_ms: Mutex<Option<u64>>,
}

impl MockLyrics {
    pub fn set_for(&self, id: &str, lyric: SongLyric) {
        self.per_song.lock().unwrap().insert(SongId::from(id), lyric);
    }

    /// Hold back the lyric for `id` by `delay`
    pub fn delay(&self, id: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(SongId::from(id), delay);
    }
}

#[async_trait]
impl LyricSource for MockLyrics {
    async fn fetch_lyrics(&self, song_id: &SongId) -> Result<Option<SongLyric>> {
        let delay = self.delays.lock().unwrap().get(song_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(lyric) = self.per_song.lock().unwrap().get(song_id) {
            return Ok(Some(lyric.clone()));
        }
        Ok(self.lyric.lock().unwrap().clone())
    }

    async fn fetch_chorus_offset(&self, _song_id: &SongId) -> Result<Option<u64>> {
        Ok(*self.chorus_ms.lock().unwrap())
    }
}

#[derive(Default)]
pub struct MockRecommendations {
    pub heartbeat: Mutex<Vec<Song>>,
    /// Batches handed out by successive personal radio requests
    pub radio_batches: Mutex<VecDeque<Vec<Song>>>,
    pub trashed: Mutex<Vec<SongId>>,
    pub heartbeat_seeds: Mutex<Vec<(SongId, Option<String>)>>,
    pub fail_heartbeat: Mutex<bool>,
}

#[async_trait]
impl RecommendationSource for MockRecommendations {
    async fn heartbeat_list(&self, song_id: &SongId, playlist_id: Option<&str>) -> Result<Vec<Song>> {
        self.heartbeat_seeds
            .lock()
            .unwrap()
            .push((song_id.clone(), playlist_id.map(str::to_string)));
        if *self.fail_heartbeat.lock().unwrap() {
            return Err(Error::Gateway("recommendation service unreachable".to_string()));
        }
        Ok(self.heartbeat.lock().unwrap().clone())
    }

    async fn personal_radio(&self) -> Result<Vec<Song>> {
        Ok(self.radio_batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn trash_radio_song(&self, song_id: &SongId) -> Result<()> {
        self.trashed.lock().unwrap().push(song_id.clone());
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    pub playlist: Mutex<Option<(Vec<Song>, Option<Vec<Song>>)>>,
    pub position: Mutex<Option<(Option<usize>, PlayMode, f64)>>,
    pub levels: Mutex<Option<(f32, f32)>>,
    pub history: Mutex<Vec<Song>>,
    /// Slow down position writes
    pub write_delay: Mutex<Option<Duration>>,
}

#[async_trait]
impl PlaybackStore for MemoryStore {
    async fn save_playlist(&self, songs: &[Song], original: Option<&[Song]>) -> Result<()> {
        *self.playlist.lock().unwrap() = Some((songs.to_vec(), original.map(<[Song]>::to_vec)));
        Ok(())
    }

    async fn save_position(&self, index: Option<usize>, mode: PlayMode, time: f64) -> Result<()> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        *self.position.lock().unwrap() = Some((index, mode, time));
        Ok(())
    }

    async fn save_levels(&self, volume: f32, rate: f32) -> Result<()> {
        *self.levels.lock().unwrap() = Some((volume, rate));
        Ok(())
    }

    async fn append_history(&self, song: &Song) -> Result<()> {
        push_history(&mut self.history.lock().unwrap(), song);
        Ok(())
    }

    async fn load_session(&self) -> Result<Option<PersistedSession>> {
        let Some((playlist, original)) = self.playlist.lock().unwrap().clone() else {
            return Ok(None);
        };
        let saved = *self.position.lock().unwrap();
        let (index, mode, time) = saved.unwrap_or((None, PlayMode::Repeat, 0.0));
        Ok(Some(PersistedSession {
            playlist,
            original,
            index,
            mode,
            time,
        }))
    }

    async fn history(&self) -> Result<Vec<Song>> {
        Ok(self.history.lock().unwrap().clone())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn songs(ids: &[&str]) -> Vec<Song> {
    ids.iter()
        .map(|id| Song::new(*id, format!("Song {}", id)).with_artist("Artist"))
        .collect()
}

pub fn ids(songs: &[Song]) -> Vec<String> {
    songs.iter().map(|s| s.id.to_string()).collect()
}

/// Settings with the defaults the engine ships with
pub fn test_settings() -> EngineSettings {
    EngineSettings::default()
}

pub struct Harness {
    pub engine: PlaybackEngine,
    pub state: Arc<SharedState>,
    pub backend: Arc<MockBackend>,
    pub streams: Arc<MockStreams>,
    pub lyrics: Arc<MockLyrics>,
    pub recommendations: Arc<MockRecommendations>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let backend = Arc::new(MockBackend::default());
        let streams = Arc::new(MockStreams::default());
        let lyrics = Arc::new(MockLyrics::default());
        let recommendations = Arc::new(MockRecommendations::default());
        let store = Arc::new(MemoryStore::default());

        let ctx = EngineContext {
            backend: backend.clone(),
            streams: streams.clone(),
            lyrics: lyrics.clone(),
            recommendations: recommendations.clone(),
            store: store.clone(),
            settings,
        };
        let state = Arc::new(SharedState::new());
        let engine = PlaybackEngine::spawn_with_rng(ctx, Arc::clone(&state), StdRng::seed_from_u64(7));

        Self {
            engine,
            state,
            backend,
            streams,
            lyrics,
            recommendations,
            store,
        }
    }

    pub async fn run(&self, command: EngineCommand) -> Result<()> {
        self.engine.execute(command).await
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.engine.snapshot().await.expect("engine running")
    }

    /// Load `ids` as the playlist and let resolution finish
    pub async fn load(&self, ids: &[&str], start: Option<&str>, play: bool) {
        self.run(EngineCommand::LoadPlaylist {
            songs: songs(ids),
            start: start.map(SongId::from),
            playlist_id: None,
            play,
        })
        .await
        .expect("load playlist");
        settle().await;
    }
}

/// Let spawned work and posted messages run to completion
///
/// Intended for `start_paused` runtimes, where the clock only moves once
/// every task is idle.
pub async fn settle() {
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Everything currently buffered on `rx`
pub fn drain(rx: &mut broadcast::Receiver<MupEvent>) -> Vec<MupEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn notices(events: &[MupEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            MupEvent::Notice { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}
