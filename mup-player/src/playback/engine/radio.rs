//! Recommendation sub-modes (heartbeat and personal radio)

use super::core::EngineCore;
use crate::error::{Error, Result};
use crate::playback::events::{EngineMessage, RecommendationKind};
use crate::playback::mode::Direction;
use crate::state::SessionPhase;
use mup_common::events::NoticeLevel;
use mup_common::models::{Song, SongId};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl EngineCore {
    /// Heartbeat on: fetch a list seeded by the current song and playlist
    ///
    /// Turning it off keeps the current playlist.
    pub(super) fn set_heartbeat(&mut self, active: bool) -> Result<()> {
        if !active {
            if self.mode.heartbeat() {
                self.mode.set_heartbeat(false);
                self.cancel_recommendations();
                self.emit_mode();
            }
            return Ok(());
        }

        let seed = self
            .current_song
            .clone()
            .or_else(|| self.playlist.current().cloned())
            .ok_or_else(|| Error::InvalidState("heartbeat mode needs a current song".to_string()))?;
        if seed.is_local() || seed.is_radio() {
            return Err(Error::InvalidState(
                "heartbeat mode needs a catalogue song".to_string(),
            ));
        }

        self.mode.set_heartbeat(true);
        self.emit_mode();
        info!("Heartbeat mode seeded by '{}'", seed.name);
        let token = self.begin_recommendation_load();

        let recommendations = Arc::clone(&self.ctx.recommendations);
        let playlist_id = self.playlist_id.clone();
        self.spawn_message(async move {
            let result = recommendations
                .heartbeat_list(&seed.id, playlist_id.as_deref())
                .await
                .map_err(|e| e.to_string());
            Some(EngineMessage::Recommendations {
                token,
                kind: RecommendationKind::Heartbeat,
                autoplay: true,
                result,
            })
        });
        Ok(())
    }

    pub(super) fn set_personal_radio(&mut self, active: bool) {
        if active == self.mode.personal_radio() {
            return;
        }
        self.mode.set_personal_radio(active);
        self.emit_mode();
        if active {
            info!("Personal radio started");
            self.request_personal_radio(true);
        } else {
            self.cancel_recommendations();
        }
    }

    /// Start waiting on a recommendation list
    ///
    /// A live session keeps playing until the list arrives. With nothing
    /// loaded, or a track that just ended, the engine shows as loading
    /// meanwhile.
    fn begin_recommendation_load(&mut self) -> u64 {
        self.recommendation_token += 1;
        let idle = self.session.is_none() || self.phase == SessionPhase::Ended;
        if idle && !self.loading {
            self.awaiting_recommendations = true;
            self.phase = SessionPhase::Loading;
            self.set_loading(true);
        }
        self.recommendation_token
    }

    /// Forget any recommendation request still in flight
    fn cancel_recommendations(&mut self) {
        self.recommendation_token += 1;
        if self.awaiting_recommendations {
            self.stop();
        }
    }

    fn request_personal_radio(&mut self, autoplay: bool) {
        let token = self.begin_recommendation_load();
        let recommendations = Arc::clone(&self.ctx.recommendations);
        self.spawn_message(async move {
            let result = recommendations.personal_radio().await.map_err(|e| e.to_string());
            Some(EngineMessage::Recommendations {
                token,
                kind: RecommendationKind::PersonalRadio,
                autoplay,
                result,
            })
        });
    }

    /// Personal radio advance: walk the batch, refill when it runs out
    pub(super) fn advance_radio(&mut self, direction: Direction, autoplay: bool) {
        let len = self.playlist.len();
        let target = match (direction, self.playlist.index()) {
            (Direction::Next, Some(i)) if i + 1 < len => Some(i + 1),
            (Direction::Next, _) => None,
            (Direction::Prev, Some(i)) if i > 0 => Some(i - 1),
            (Direction::Prev, Some(i)) => Some(i),
            (Direction::Prev, None) => None,
        };

        match target {
            Some(index) => {
                self.playlist.set_index(index);
                self.load_current(autoplay, None);
            }
            None => self.request_personal_radio(autoplay),
        }
    }

    pub(super) fn on_recommendations(
        &mut self,
        token: u64,
        kind: RecommendationKind,
        autoplay: bool,
        result: std::result::Result<Vec<Song>, String>,
    ) {
        if token != self.recommendation_token {
            debug!("Dropping superseded {:?} recommendations", kind);
            return;
        }
        let still_active = match kind {
            RecommendationKind::Heartbeat => self.mode.heartbeat(),
            RecommendationKind::PersonalRadio => self.mode.personal_radio(),
        };
        if !still_active {
            self.cancel_recommendations();
            return;
        }

        let songs = match result {
            Ok(songs) if !songs.is_empty() => songs,
            Ok(_) => {
                self.leave_recommendation_mode(kind, "No recommendations available".to_string());
                return;
            }
            Err(e) => {
                warn!("{:?} recommendations failed: {}", kind, e);
                self.leave_recommendation_mode(kind, format!("Recommendations failed: {}", e));
                return;
            }
        };

        info!("{:?} delivered {} songs", kind, songs.len());
        match kind {
            RecommendationKind::Heartbeat => self.replace_playlist(songs),
            RecommendationKind::PersonalRadio => self.playlist.set_playlist(songs),
        }
        self.playlist.set_index(0);
        self.emit_playlist();
        self.persist_playlist();
        self.load_current(autoplay, None);
    }

    /// The fetch came back empty or failed; whatever was playing carries on
    fn leave_recommendation_mode(&mut self, kind: RecommendationKind, message: String) {
        match kind {
            RecommendationKind::Heartbeat => self.mode.set_heartbeat(false),
            RecommendationKind::PersonalRadio => self.mode.set_personal_radio(false),
        }
        self.emit_mode();
        self.telemetry.notice(NoticeLevel::Error, message);
        self.cancel_recommendations();
    }

    /// Dislike a personal radio song; success moves on
    pub(super) fn trash_radio_song(&mut self, id: SongId) -> Result<()> {
        if !self.mode.personal_radio() {
            return Err(Error::InvalidState("personal radio is not active".to_string()));
        }

        let recommendations = Arc::clone(&self.ctx.recommendations);
        let generation = self.generation;
        self.spawn_message(async move {
            let result = recommendations.trash_radio_song(&id).await.map_err(|e| e.to_string());
            Some(EngineMessage::RadioSongTrashed { generation, result })
        });
        Ok(())
    }

    pub(super) fn on_radio_song_trashed(&mut self, result: std::result::Result<(), String>) {
        match result {
            Ok(()) => {
                self.telemetry
                    .notice(NoticeLevel::Success, "Song removed from personal radio");
                if self.mode.personal_radio() {
                    self.advance_radio(Direction::Next, true);
                }
            }
            Err(e) => {
                warn!("Trashing radio song failed: {}", e);
                self.telemetry
                    .notice(NoticeLevel::Error, format!("Could not remove song: {}", e));
            }
        }
    }
}
