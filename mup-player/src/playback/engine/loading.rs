//! Song loading and session lifecycle

use super::core::EngineCore;
use super::recovery::FailureKind;
use crate::audio::backend::{PlayableSource, SessionErrorKind, SessionEvent, SessionEvents, SessionRequest};
use crate::db::PersistedSession;
use crate::gateway::{resolve_playable, Resolution};
use crate::lyrics::local::read_sidecar_lyric;
use crate::playback::events::EngineMessage;
use crate::playback::mode::{Direction, ModeState};
use crate::state::SessionPhase;
use mup_common::events::NoticeLevel;
use mup_common::models::{Song, SongLyric};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl EngineCore {
    /// Load the current playlist entry as a new generation
    ///
    /// Tears down the previous session first. `seek` is applied once the
    /// backend reports metadata, subject to the restore guard.
    pub(super) fn load_current(&mut self, autoplay: bool, seek: Option<f64>) {
        let Some(song) = self.playlist.current().cloned() else {
            warn!("load_current with no current entry");
            return;
        };

        self.generation += 1;
        self.teardown_session();
        self.reset_status();
        self.restored_time = None;
        self.awaiting_recommendations = false;
        self.autoplay = autoplay;
        self.pending_seek = seek;
        self.phase = SessionPhase::Loading;
        self.set_loading(true);
        if !autoplay {
            self.set_playing(false);
        }

        info!(
            "Loading '{}' (index {:?}, generation {})",
            song.name,
            self.playlist.index(),
            self.generation
        );
        self.current_song = Some(song.clone());
        self.telemetry.current_song(Some(&song), self.playlist.index());
        self.persist_position();

        if song.is_local() {
            self.load_local(song);
        } else {
            let streams = Arc::clone(&self.ctx.streams);
            let policy = self.policy.clone();
            let generation = self.generation;
            self.spawn_message(async move {
                let resolution = resolve_playable(streams.as_ref(), &song, &policy).await;
                Some(EngineMessage::Resolved {
                    generation,
                    resolution,
                })
            });
        }
    }

    fn load_local(&mut self, song: Song) {
        let Some(path) = song.path.clone() else {
            warn!("Local song '{}' has no path", song.name);
            self.handle_failure(FailureKind::Unavailable);
            return;
        };

        let generation = self.generation;
        let sidecar = path.clone();
        self.spawn_message(async move {
            let lyric = read_sidecar_lyric(&sidecar).await?;
            Some(EngineMessage::LyricFetched { generation, lyric })
        });

        self.open_session(PlayableSource::LocalFile(path));
    }

    pub(super) fn on_resolved(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Playable {
                url,
                trial_only,
                unlocked_by,
            } => {
                if trial_only {
                    self.telemetry
                        .notice(NoticeLevel::Info, "Only a preview of this song is available");
                }
                if let Some(provider) = unlocked_by {
                    self.telemetry
                        .notice(NoticeLevel::Success, format!("Unlocked via {}", provider));
                }
                self.fetch_song_extras();
                self.open_session(PlayableSource::Remote(url));
            }
            Resolution::Unavailable => self.handle_failure(FailureKind::Unavailable),
            Resolution::Failed(reason) => {
                warn!("Resolution failed: {}", reason);
                self.handle_failure(FailureKind::Backend);
            }
        }
    }

    /// Lyric and chorus lookups for streamed catalogue songs
    fn fetch_song_extras(&self) {
        let Some(song) = self.current_song.as_ref() else {
            return;
        };
        if song.is_radio() || song.is_local() {
            return;
        }

        let generation = self.generation;
        let lyrics = Arc::clone(&self.ctx.lyrics);
        let id = song.id.clone();
        self.spawn_message(async move {
            let lyric = match lyrics.fetch_lyrics(&id).await {
                Ok(lyric) => lyric.unwrap_or_default(),
                Err(e) => {
                    debug!("Lyric fetch for {} failed: {}", id, e);
                    SongLyric::default()
                }
            };
            Some(EngineMessage::LyricFetched { generation, lyric })
        });

        let lyrics = Arc::clone(&self.ctx.lyrics);
        let id = song.id.clone();
        self.spawn_message(async move {
            match lyrics.fetch_chorus_offset(&id).await {
                Ok(Some(start_ms)) => Some(EngineMessage::ChorusFetched { generation, start_ms }),
                Ok(None) => None,
                Err(e) => {
                    debug!("Chorus lookup for {} failed: {}", id, e);
                    None
                }
            }
        });
    }

    /// Create the single live session for the current generation
    fn open_session(&mut self, source: PlayableSource) {
        let request = SessionRequest {
            source,
            volume: self.volume,
            rate: self.rate,
        };
        let events = SessionEvents::new(self.generation, self.messages.clone());

        match self.ctx.backend.open(request, events) {
            Ok(session) => {
                self.session = Some(session);
                self.start_ticker();
                if let Some(song) = self.current_song.as_ref().filter(|s| !s.is_radio()) {
                    self.persist.history(song);
                }
            }
            Err(e) => {
                warn!("Opening session failed: {}", e);
                self.handle_failure(FailureKind::Backend);
            }
        }
    }

    pub(super) fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Loaded { duration } => self.on_loaded(duration),
            SessionEvent::Started => {
                self.retry.reset();
                if self.playing {
                    self.phase = SessionPhase::Playing;
                }
            }
            SessionEvent::Ended => {
                info!("Track ended (generation {})", self.generation);
                self.phase = SessionPhase::Ended;
                if let Err(e) = self.advance(Direction::Next) {
                    warn!("Advance after end of track failed: {}", e);
                }
            }
            SessionEvent::Error { kind, message } => {
                warn!("Session error ({:?}): {}", kind, message);
                let failure = match kind {
                    SessionErrorKind::Stale => FailureKind::Stale,
                    SessionErrorKind::Unavailable => FailureKind::Unavailable,
                    SessionErrorKind::Network | SessionErrorKind::Decode | SessionErrorKind::Output => {
                        FailureKind::Backend
                    }
                };
                self.handle_failure(failure);
            }
            SessionEvent::FadeComplete { token } => self.on_fade_complete(token),
        }
    }

    /// Metadata known: restore a saved position, then honour autoplay
    fn on_loaded(&mut self, duration: f64) {
        self.duration = duration;
        self.phase = SessionPhase::Ready;
        self.set_loading(false);

        if let Some(seek) = self.pending_seek.take() {
            let guard = self.ctx.settings.restore_guard_secs;
            if duration - seek > guard {
                if let Some(session) = self.session.as_mut() {
                    session.seek(seek);
                }
                self.current_time = seek;
                debug!("Restored position {:.1}s of {:.1}s", seek, duration);
            } else {
                debug!("Skipping restore of {:.1}s (too close to the end)", seek);
            }
        }

        if self.autoplay {
            self.start_playback();
        }
    }

    /// Load a persisted session without starting playback
    pub(super) fn restore(&mut self, session: PersistedSession) {
        self.stop();
        self.playlist
            .restore(session.playlist, session.original, session.index);
        self.mode = ModeState::new(session.mode);
        self.current_song = self.playlist.current().cloned();
        if self.current_song.is_some() && session.time > 0.0 {
            self.restored_time = Some(session.time);
            self.current_time = session.time;
        }

        info!(
            "Restored {} songs (index {:?}, mode {})",
            self.playlist.len(),
            self.playlist.index(),
            self.mode.base()
        );
        self.telemetry
            .current_song(self.current_song.as_ref(), self.playlist.index());
        self.emit_mode();
        self.emit_playlist();
    }
}
