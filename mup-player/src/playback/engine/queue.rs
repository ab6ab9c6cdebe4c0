//! Playlist commands, advance and mode changes

use super::core::EngineCore;
use crate::error::{Error, Result};
use crate::playback::mode::{Advance, Direction, ShuffleTransition};
use crate::playback::playlist::RemoveOutcome;
use mup_common::events::{FailureReason, NoticeLevel};
use mup_common::models::{PlayMode, Song, SongId};
use tracing::{debug, info, warn};

impl EngineCore {
    /// Replace the playlist and start from `start` (or the first entry)
    pub(super) fn load_playlist(
        &mut self,
        songs: Vec<Song>,
        start: Option<SongId>,
        playlist_id: Option<String>,
        play: bool,
    ) -> Result<()> {
        if songs.is_empty() {
            return Err(self.fail(FailureReason::EmptyPlaylist));
        }

        if self.mode.heartbeat() || self.mode.personal_radio() {
            self.mode.clear_sub_modes();
            self.emit_mode();
        }
        self.playlist_id = playlist_id;
        self.replace_playlist(songs);

        let index = start
            .as_ref()
            .and_then(|id| self.playlist.position_of(id))
            .unwrap_or(0);
        self.playlist.set_index(index);
        info!("Loaded playlist of {} songs, starting at {}", self.playlist.len(), index);
        self.emit_playlist();
        self.persist_playlist();

        let same_song = self.session.is_some()
            && self.current_song.as_ref().map(|s| &s.id) == self.playlist.current().map(|s| &s.id);
        if same_song {
            self.persist_position();
            if play {
                return self.play();
            }
            return Ok(());
        }

        self.load_current(play, None);
        Ok(())
    }

    /// Swap in a new list, honouring shuffle mode
    pub(super) fn replace_playlist(&mut self, songs: Vec<Song>) {
        if self.mode.base() == PlayMode::Shuffle {
            self.playlist.set_playlist_shuffled(songs, &mut self.rng);
        } else {
            self.playlist.set_playlist(songs);
        }
    }

    /// Move through the playlist according to the current mode
    pub(super) fn advance(&mut self, direction: Direction) -> Result<()> {
        let current_is_radio = self.playlist.current().map(Song::is_radio).unwrap_or(false);
        let plan = self.mode.plan_advance(
            direction,
            self.playlist.len(),
            self.playlist.index(),
            current_is_radio,
        );
        debug!("Advance {:?}: {:?}", direction, plan);

        match plan {
            Advance::Radio => {
                self.advance_radio(direction, true);
                Ok(())
            }
            Advance::Empty => Err(self.fail(FailureReason::EmptyPlaylist)),
            Advance::Replay => {
                self.replay();
                Ok(())
            }
            Advance::MoveTo(index) => {
                self.playlist.set_index(index);
                self.load_current(true, None);
                Ok(())
            }
        }
    }

    /// Next entry with wrap-around, ignoring repeat-once
    pub(super) fn skip_forward(&mut self, autoplay: bool) {
        if self.mode.personal_radio() {
            self.advance_radio(Direction::Next, autoplay);
            return;
        }
        let len = self.playlist.len();
        if len == 0 {
            self.stop();
            return;
        }
        let next = self.playlist.index().map(|i| (i + 1) % len).unwrap_or(0);
        self.playlist.set_index(next);
        self.load_current(autoplay, None);
    }

    /// Repeat-once: back to the start of the same song
    fn replay(&mut self) {
        match self.session.as_mut() {
            Some(session) if session.is_loaded() => {
                session.seek(0.0);
                self.current_time = 0.0;
                self.progress = 0.0;
                self.lyric_cursor.reset();
                self.lyric_index = -1;
                self.start_playback();
            }
            _ => self.load_current(true, None),
        }
    }

    /// Change (or with `None`, cycle) the base mode
    pub(super) fn set_mode(&mut self, mode: Option<PlayMode>) -> Result<()> {
        if self.mode.personal_radio() {
            return Err(Error::InvalidState(
                "play mode is fixed while personal radio is active".to_string(),
            ));
        }

        let target = mode.unwrap_or_else(|| self.mode.base().cycle());
        match self.mode.set_base(target) {
            ShuffleTransition::Enter => {
                self.playlist.enter_shuffle(&mut self.rng);
                self.emit_playlist();
                self.persist_playlist();
            }
            ShuffleTransition::Exit => {
                self.playlist.exit_shuffle();
                self.emit_playlist();
                self.persist_playlist();
            }
            ShuffleTransition::Unchanged => {}
        }

        info!("Play mode set to {}", target);
        self.emit_mode();
        self.persist_position();
        Ok(())
    }

    /// Queue `song` right after the current entry
    pub(super) fn insert_next(&mut self, song: Song, play: bool) {
        if self.mode.personal_radio() {
            self.mode.set_personal_radio(false);
            self.telemetry
                .notice(NoticeLevel::Info, "Personal radio stopped");
            self.emit_mode();
        }

        let name = song.name.clone();
        let index = self.playlist.insert_next(song, self.playlist.index());
        debug!("Inserted '{}' at {}", name, index);
        self.emit_playlist();
        self.persist_playlist();

        if play {
            self.playlist.set_index(index);
            self.load_current(true, None);
        } else {
            self.telemetry
                .notice(NoticeLevel::Success, format!("'{}' will play next", name));
        }
    }

    pub(super) fn remove_at(&mut self, index: usize) {
        match self.playlist.remove_at(index) {
            RemoveOutcome::OutOfRange => {
                warn!("remove_at({}) out of range (len {})", index, self.playlist.len());
            }
            RemoveOutcome::Emptied => {
                info!("Playlist emptied by removal");
                self.full_reset();
            }
            RemoveOutcome::Removed => {
                self.emit_playlist();
                self.persist_playlist();
                self.persist_position();
            }
            RemoveOutcome::RemovedCurrent => {
                self.emit_playlist();
                self.persist_playlist();
                let resume = self.playing || self.autoplay;
                self.load_current(resume, None);
            }
        }
    }

    pub(super) fn clear_playlist(&mut self) {
        self.full_reset();
        self.telemetry.notice(NoticeLevel::Success, "Playlist cleared");
    }

    /// Jump to `index`; the current entry only resumes
    pub(super) fn play_index(&mut self, index: usize, play: bool) {
        if index >= self.playlist.len() {
            warn!("play_index({}) out of range (len {})", index, self.playlist.len());
            return;
        }

        if self.playlist.index() == Some(index) && self.session.is_some() {
            if play {
                if let Err(e) = self.play() {
                    warn!("Resume failed: {}", e);
                }
            }
            return;
        }

        self.playlist.set_index(index);
        self.load_current(play, None);
    }
}
