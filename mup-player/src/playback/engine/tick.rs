//! Synchronization tick

use super::core::EngineCore;
use mup_common::time;

impl EngineCore {
    /// Sample the session, resolve the lyric line and push telemetry
    pub(super) fn on_tick(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if !session.is_playing() {
            return;
        }

        let position = session.position();
        let duration = match session.duration() {
            d if d > 0.0 => d,
            _ => self.duration,
        };
        self.current_time = position;
        self.duration = duration;
        self.progress = time::progress(position, duration);

        let index = self.update_lyric_index(position);
        self.telemetry.progress(position, duration, index);
        if self.ctx.settings.taskbar_progress {
            self.telemetry.taskbar(self.progress);
        }
    }

    /// Resolve the lyric line at `position`, announcing it when it changes
    pub(super) fn update_lyric_index(&mut self, position: f64) -> i64 {
        let karaoke = self.lyric.uses_karaoke(self.karaoke_lyrics);
        let lines = self.lyric.track(self.karaoke_lyrics);
        let index = self
            .lyric_cursor
            .advance(lines, position + self.lyric_offset, karaoke);
        if index != self.lyric_index {
            let text = usize::try_from(index)
                .ok()
                .and_then(|i| lines.get(i))
                .map(|line| line.text.clone());
            self.lyric_index = index;
            self.telemetry.lyric_line(index, karaoke, text);
        }
        index
    }
}
