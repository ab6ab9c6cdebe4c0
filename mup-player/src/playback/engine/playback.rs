//! Transport controls: play, pause, seek, rate, volume

use super::core::EngineCore;
use super::VolumeStep;
use crate::config::{EngineSettings, MAX_RATE, MIN_RATE};
use crate::error::{Error, Result};
use crate::state::SessionPhase;
use mup_common::events::FailureReason;
use mup_common::time;
use tracing::{debug, info};

impl EngineCore {
    /// Start or resume playback
    ///
    /// With no session the current entry is loaded (the first one when
    /// nothing is current) and started once it reports metadata.
    pub(super) fn play(&mut self) -> Result<()> {
        if self.playlist.is_empty() {
            return Err(self.fail(FailureReason::EmptyPlaylist));
        }

        match self.session.as_ref() {
            None => {
                if self.loading {
                    self.autoplay = true;
                    self.set_playing(true);
                    return Ok(());
                }
                if self.playlist.index().is_none() {
                    self.playlist.set_index(0);
                }
                let seek = self.restored_time.take();
                self.load_current(true, seek);
            }
            Some(session) if !session.is_loaded() => {
                self.autoplay = true;
                self.set_playing(true);
            }
            Some(_) => self.start_playback(),
        }
        Ok(())
    }

    /// Backend play followed by a linear fade up to the target volume
    ///
    /// The playing flag flips at fade start.
    pub(super) fn start_playback(&mut self) {
        let fade = self.ctx.settings.fade_duration();
        let target = self.volume;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let resuming = session.is_playing();
        let from = if resuming { session.volume() } else { 0.0 };
        self.pending_pause = None;
        self.autoplay = false;

        if fade.is_zero() {
            session.set_volume(target);
            if !resuming {
                session.play();
            }
        } else {
            self.fade_token += 1;
            session.set_volume(from);
            if !resuming {
                session.play();
            }
            session.fade(from, target, fade, self.fade_token);
        }

        self.phase = SessionPhase::Playing;
        self.set_playing(true);
        debug!("Playback started (fade {:?})", fade);
    }

    /// Fade out, then pause the backend when the fade completes
    ///
    /// Without a loaded, playing session only the intended state changes.
    pub(super) fn pause(&mut self) {
        self.autoplay = false;
        self.set_playing(false);

        let fade = self.ctx.settings.fade_duration();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.is_loaded() || !session.is_playing() {
            return;
        }

        self.current_time = session.position();
        if fade.is_zero() {
            session.pause();
            self.phase = SessionPhase::Paused;
        } else {
            self.fade_token += 1;
            self.pending_pause = Some(self.fade_token);
            session.fade(session.volume(), 0.0, fade, self.fade_token);
        }
        self.persist_position();
    }

    /// A fade finished; complete a pending pause
    pub(super) fn on_fade_complete(&mut self, token: u64) {
        if self.pending_pause != Some(token) || self.playing {
            return;
        }
        self.pending_pause = None;
        if let Some(session) = self.session.as_mut() {
            session.pause();
            self.phase = SessionPhase::Paused;
            debug!("Paused after fade-out");
        }
    }

    pub(super) fn seek(&mut self, secs: f64) -> Result<()> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(Error::BadRequest(format!("invalid seek position {}", secs)));
        }

        match self.session.as_mut() {
            Some(session) if session.is_loaded() => {
                let duration = session.duration();
                let target = if duration > 0.0 { secs.min(duration) } else { secs };
                session.seek(target);
                self.current_time = target;
                self.progress = time::progress(target, self.duration);
            }
            Some(_) => {
                self.pending_seek = Some(secs);
            }
            None => {
                self.restored_time = Some(secs);
                self.current_time = secs;
            }
        }

        self.lyric_cursor.reset();
        let index = self.update_lyric_index(self.current_time);
        self.telemetry.progress(self.current_time, self.duration, index);
        Ok(())
    }

    pub(super) fn set_rate(&mut self, rate: f32) -> Result<()> {
        if !rate.is_finite() {
            return Err(Error::BadRequest(format!("invalid rate {}", rate)));
        }
        self.rate = rate.clamp(MIN_RATE, MAX_RATE);
        if let Some(session) = self.session.as_mut() {
            session.set_rate(self.rate);
        }
        info!("Playback rate set to {}", self.rate);
        self.telemetry.rate(self.rate);
        self.persist.levels(self.volume, self.rate);
        Ok(())
    }

    pub(super) fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !volume.is_finite() {
            return Err(Error::BadRequest(format!("invalid volume {}", volume)));
        }
        self.muted_volume = None;
        self.apply_volume(volume);
        Ok(())
    }

    pub(super) fn adjust_volume(&mut self, step: VolumeStep) {
        let delta = self.ctx.settings.volume_step;
        let target = match step {
            VolumeStep::Up => self.volume + delta,
            VolumeStep::Down => self.volume - delta,
        };
        self.muted_volume = None;
        self.apply_volume((target * 100.0).round() / 100.0);
    }

    /// Mute keeps the previous volume for the next toggle
    pub(super) fn toggle_mute(&mut self) {
        if self.volume > 0.0 {
            self.muted_volume = Some(self.volume);
            self.apply_volume(0.0);
        } else {
            let restored = self
                .muted_volume
                .take()
                .filter(|v| *v > 0.0)
                .unwrap_or_else(|| EngineSettings::default().volume);
            self.apply_volume(restored);
        }
    }

    fn apply_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if self.pending_pause.is_none() {
            if let Some(session) = self.session.as_mut() {
                session.set_volume(self.volume);
            }
        }
        self.telemetry.volume(self.volume, self.muted_volume.is_some());
        self.persist.levels(self.volume, self.rate);
    }
}
