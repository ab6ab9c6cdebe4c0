//! Engine state and run loop

use super::{EngineCommand, EngineContext};
use crate::audio::backend::AudioSession;
use crate::error::{Error, Result};
use crate::gateway::ResolvePolicy;
use crate::lyrics::LyricCursor;
use crate::playback::events::EngineMessage;
use crate::playback::mode::{Direction, ModeState};
use crate::playback::persist::PersistenceWriter;
use crate::playback::playlist::Playlist;
use crate::playback::retry::RetryState;
use crate::state::{EngineSnapshot, SessionPhase, SharedState};
use crate::telemetry::TelemetryBridge;
use mup_common::events::{FailureReason, NoticeLevel};
use mup_common::models::{Song, SongLyric};
use rand::rngs::StdRng;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Requests carried on the command channel
pub(crate) enum EngineRequest {
    Command {
        command: EngineCommand,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// All mutable playback state, owned by the engine task
pub(super) struct EngineCore {
    pub(super) ctx: EngineContext,
    pub(super) policy: ResolvePolicy,
    pub(super) shared: Arc<SharedState>,
    pub(super) telemetry: TelemetryBridge,
    pub(super) persist: PersistenceWriter,
    pub(super) messages: mpsc::UnboundedSender<EngineMessage>,
    pub(super) rng: StdRng,

    pub(super) playlist: Playlist,
    pub(super) playlist_id: Option<String>,
    pub(super) mode: ModeState,
    pub(super) retry: RetryState,

    /// At most one live session
    pub(super) session: Option<Box<dyn AudioSession>>,
    /// Alive only while `session` is
    pub(super) ticker: Option<Interval>,
    pub(super) phase: SessionPhase,
    /// Tags every load cycle; async results from older cycles are dropped
    pub(super) generation: u64,
    pub(super) fade_token: u64,
    /// Fade-out that should end in a backend pause
    pub(super) pending_pause: Option<u64>,
    /// Intended play state
    pub(super) playing: bool,
    pub(super) loading: bool,
    /// Start playback once the loading session reports metadata
    pub(super) autoplay: bool,
    /// Position to restore once metadata is known
    pub(super) pending_seek: Option<f64>,
    /// Position from a restored session, applied on the first load
    pub(super) restored_time: Option<f64>,
    /// Latest recommendation request; older lists are ignored
    pub(super) recommendation_token: u64,
    /// A recommendation fetch started from idle owns the loading state
    pub(super) awaiting_recommendations: bool,

    pub(super) current_song: Option<Song>,
    pub(super) current_time: f64,
    pub(super) duration: f64,
    pub(super) progress: f64,

    pub(super) lyric: SongLyric,
    pub(super) lyric_cursor: LyricCursor,
    pub(super) lyric_index: i64,
    pub(super) lyric_offset: f64,
    pub(super) karaoke_lyrics: bool,
    pub(super) chorus_secs: Option<f64>,

    pub(super) volume: f32,
    /// Volume saved by mute
    pub(super) muted_volume: Option<f32>,
    pub(super) rate: f32,
}

/// Wait for the next tick, or forever when no ticker is running
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl EngineCore {
    pub(super) fn new(
        ctx: EngineContext,
        shared: Arc<SharedState>,
        messages: mpsc::UnboundedSender<EngineMessage>,
        rng: StdRng,
    ) -> Self {
        let settings = ctx.settings.clone();
        let telemetry = TelemetryBridge::new(Arc::clone(&shared), settings.high_quality_cover);
        let persist = PersistenceWriter::spawn(Arc::clone(&ctx.store));

        Self {
            policy: ResolvePolicy::from(&settings),
            shared,
            telemetry,
            persist,
            messages,
            rng,
            playlist: Playlist::new(),
            playlist_id: None,
            mode: ModeState::default(),
            retry: RetryState::new(settings.max_retries),
            session: None,
            ticker: None,
            phase: SessionPhase::Idle,
            generation: 0,
            fade_token: 0,
            pending_pause: None,
            playing: false,
            loading: false,
            autoplay: false,
            pending_seek: None,
            restored_time: None,
            recommendation_token: 0,
            awaiting_recommendations: false,
            current_song: None,
            current_time: 0.0,
            duration: 0.0,
            progress: 0.0,
            lyric: SongLyric::default(),
            lyric_cursor: LyricCursor::new(),
            lyric_index: -1,
            lyric_offset: 0.0,
            karaoke_lyrics: settings.karaoke_lyrics,
            chorus_secs: None,
            volume: settings.volume.clamp(0.0, 1.0),
            muted_volume: None,
            rate: settings.rate,
            ctx,
        }
    }

    /// Engine task body
    pub(super) async fn run(
        mut self,
        mut requests: mpsc::Receiver<EngineRequest>,
        mut messages: mpsc::UnboundedReceiver<EngineMessage>,
    ) {
        info!("Playback engine started (generation {})", self.generation);
        self.publish().await;

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(EngineRequest::Command { command, reply }) => {
                        let name = command.name();
                        let result = self.handle_command(command);
                        if let Err(e) = &result {
                            debug!("Command {} rejected: {}", name, e);
                        }
                        let _ = reply.send(result);
                    }
                    Some(EngineRequest::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                        continue;
                    }
                    Some(EngineRequest::Shutdown { reply }) => {
                        self.shutdown();
                        self.persist.close().await;
                        self.publish().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.shutdown();
                        self.persist.close().await;
                        break;
                    }
                },
                Some(message) = messages.recv() => self.dispatch(message),
                _ = next_tick(&mut self.ticker) => self.on_tick(),
            }
            self.publish().await;
        }

        info!("Playback engine stopped");
    }

    fn handle_command(&mut self, command: EngineCommand) -> Result<()> {
        match command {
            EngineCommand::LoadPlaylist {
                songs,
                start,
                playlist_id,
                play,
            } => self.load_playlist(songs, start, playlist_id, play),
            EngineCommand::Play => self.play(),
            EngineCommand::Pause => {
                self.pause();
                Ok(())
            }
            EngineCommand::TogglePlay => {
                if self.playing {
                    self.pause();
                    Ok(())
                } else {
                    self.play()
                }
            }
            EngineCommand::Seek(secs) => self.seek(secs),
            EngineCommand::SetRate(rate) => self.set_rate(rate),
            EngineCommand::SetVolume(volume) => self.set_volume(volume),
            EngineCommand::AdjustVolume(step) => {
                self.adjust_volume(step);
                Ok(())
            }
            EngineCommand::ToggleMute => {
                self.toggle_mute();
                Ok(())
            }
            EngineCommand::Next => self.advance(Direction::Next),
            EngineCommand::Prev => self.advance(Direction::Prev),
            EngineCommand::SetMode(mode) => self.set_mode(mode),
            EngineCommand::InsertNext { song, play } => {
                self.insert_next(song, play);
                Ok(())
            }
            EngineCommand::RemoveAt(index) => {
                self.remove_at(index);
                Ok(())
            }
            EngineCommand::ClearPlaylist => {
                self.clear_playlist();
                Ok(())
            }
            EngineCommand::PlayIndex { index, play } => {
                self.play_index(index, play);
                Ok(())
            }
            EngineCommand::SetHeartbeat(active) => self.set_heartbeat(active),
            EngineCommand::SetPersonalRadio(active) => {
                self.set_personal_radio(active);
                Ok(())
            }
            EngineCommand::TrashRadioSong(id) => self.trash_radio_song(id),
            EngineCommand::SetLyricOffset(offset) => {
                if !offset.is_finite() {
                    return Err(Error::BadRequest(format!("invalid lyric offset {}", offset)));
                }
                self.lyric_offset = offset;
                self.lyric_cursor.reset();
                Ok(())
            }
            EngineCommand::SetKaraokeLyrics(enabled) => {
                self.karaoke_lyrics = enabled;
                Ok(())
            }
            EngineCommand::Restore(session) => {
                self.restore(session);
                Ok(())
            }
        }
    }

    /// Route an async result, dropping it when its generation is stale
    fn dispatch(&mut self, message: EngineMessage) {
        if let Some(generation) = message.generation() {
            if generation != self.generation {
                debug!(
                    "Dropping stale message (generation {} != {})",
                    generation, self.generation
                );
                return;
            }
        }

        match message {
            EngineMessage::Session { event, .. } => self.on_session_event(event),
            EngineMessage::Resolved { resolution, .. } => self.on_resolved(resolution),
            EngineMessage::LyricFetched { lyric, .. } => {
                debug!("Lyric ready ({} lines, {} karaoke)", lyric.lrc.len(), lyric.yrc.len());
                self.lyric = lyric;
                self.lyric_cursor.reset();
                self.lyric_index = -1;
            }
            EngineMessage::ChorusFetched { start_ms, .. } => {
                self.chorus_secs = Some(start_ms as f64 / 1000.0);
            }
            EngineMessage::Recommendations {
                token,
                kind,
                autoplay,
                result,
            } => self.on_recommendations(token, kind, autoplay, result),
            EngineMessage::RadioSongTrashed { result, .. } => self.on_radio_song_trashed(result),
        }
    }

    /// Run `work` off the engine task and post its message back
    pub(super) fn spawn_message<F>(&self, work: F)
    where
        F: Future<Output = Option<EngineMessage>> + Send + 'static,
    {
        let tx = self.messages.clone();
        tokio::spawn(async move {
            if let Some(message) = work.await {
                let _ = tx.send(message);
            }
        });
    }

    pub(super) fn start_ticker(&mut self) {
        let period = self.ctx.settings.tick_interval();
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(interval);
    }

    /// Drop the live session and its ticker
    pub(super) fn teardown_session(&mut self) {
        self.ticker = None;
        self.pending_pause = None;
        if self.session.take().is_some() {
            debug!("Session torn down (generation {})", self.generation);
        }
    }

    /// Clear per-song progress and lyric state
    pub(super) fn reset_status(&mut self) {
        self.current_time = 0.0;
        self.duration = 0.0;
        self.progress = 0.0;
        self.lyric = SongLyric::default();
        self.lyric_cursor.reset();
        self.lyric_index = -1;
        self.chorus_secs = None;
        self.pending_seek = None;
    }

    pub(super) fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.telemetry.play_state(playing);
        }
    }

    pub(super) fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.telemetry.loading(loading);
        }
    }

    /// Stop playback and return to idle, keeping the playlist
    pub(super) fn stop(&mut self) {
        self.generation += 1;
        self.teardown_session();
        self.reset_status();
        self.autoplay = false;
        self.restored_time = None;
        self.awaiting_recommendations = false;
        self.set_loading(false);
        self.set_playing(false);
        self.retry.reset();
        self.phase = SessionPhase::Idle;
    }

    /// Stop and forget the playlist and sub-modes
    pub(super) fn full_reset(&mut self) {
        self.stop();
        self.playlist.clear();
        self.playlist_id = None;
        self.current_song = None;
        self.mode.clear_sub_modes();
        self.telemetry.current_song(None, None);
        self.emit_mode();
        self.emit_playlist();
        self.persist_playlist();
    }

    /// Surface a user-visible failure and return to idle
    pub(super) fn fail(&mut self, reason: FailureReason) -> Error {
        error!("Playback failed: {}", reason);
        let err = match reason {
            FailureReason::EmptyPlaylist => Error::EmptyPlaylist,
            FailureReason::RetryBudgetExceeded => Error::RetryBudgetExceeded {
                attempts: self.ctx.settings.max_retries + 1,
            },
        };
        self.stop();
        self.telemetry.failed(reason);
        self.telemetry.notice(NoticeLevel::Error, err.to_string());
        err
    }

    pub(super) fn emit_mode(&self) {
        self.telemetry
            .mode(self.mode.base(), self.mode.heartbeat(), self.mode.personal_radio());
    }

    pub(super) fn emit_playlist(&self) {
        self.telemetry
            .playlist(self.playlist.len(), self.playlist.index(), self.playlist.is_shuffled());
    }

    pub(super) fn persist_playlist(&self) {
        self.persist
            .playlist(self.playlist.songs(), self.playlist.original());
    }

    pub(super) fn persist_position(&self) {
        self.persist
            .position(self.playlist.index(), self.mode.base(), self.current_time);
    }

    fn shutdown(&mut self) {
        if let Some(session) = self.session.as_ref() {
            self.current_time = session.position();
        }
        if self.loading {
            warn!("Engine shutting down with a load in flight");
        }
        self.persist_position();
        self.teardown_session();
        self.set_playing(false);
    }

    pub(super) fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            phase: self.phase,
            playing: self.playing,
            loading: self.loading,
            index: self.playlist.index(),
            playlist: self.playlist.songs().to_vec(),
            current_song: self.current_song.clone(),
            mode: self.mode.base(),
            heartbeat: self.mode.heartbeat(),
            personal_radio: self.mode.personal_radio(),
            shuffled: self.playlist.is_shuffled(),
            playlist_id: self.playlist_id.clone(),
            generation: self.generation,
            retry_count: self.retry.count(),
            current_time: self.current_time,
            duration: self.duration,
            progress: self.progress,
            lyric_index: self.lyric_index,
            lyric: self.lyric.clone(),
            karaoke: self.lyric.uses_karaoke(self.karaoke_lyrics),
            lyric_offset: self.lyric_offset,
            volume: self.volume,
            muted: self.muted_volume.is_some(),
            rate: self.rate,
            chorus_secs: self.chorus_secs,
        }
    }

    /// Snapshot now, store it when awaited
    fn publish(&self) -> impl Future<Output = ()> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let snapshot = self.snapshot();
        async move { shared.publish_snapshot(snapshot).await }
    }
}
