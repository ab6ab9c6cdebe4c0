//! Lyric index resolution
//!
//! Playback time only moves forward between ticks, so the resolver keeps the
//! previous answer and scans forward from it. A cold cursor, or a time that
//! moved behind the cursor's line (a seek), falls back to binary search.

use mup_common::models::LyricLine;

/// Index of the active lyric line at `time`, or -1 before the first line
///
/// `last_index` is the previous answer for the same track (-1 when unknown).
pub fn resolve_lyric_index(lines: &[LyricLine], time: f64, last_index: i64) -> i64 {
    if lines.is_empty() {
        return -1;
    }

    let warm = usize::try_from(last_index)
        .ok()
        .filter(|&i| i < lines.len() && lines[i].time <= time);

    match warm {
        Some(last) => {
            for (i, line) in lines.iter().enumerate().skip(last + 1) {
                if line.time >= time {
                    return i as i64 - 1;
                }
            }
            lines.len() as i64 - 1
        }
        None => {
            // First line at or after `time`; partition_point is the binary search.
            let first = lines.partition_point(|line| line.time < time);
            first as i64 - 1
        }
    }
}

/// Resolver state carried across ticks
///
/// Reset on seek or track change; a switch between the line-timed and the
/// karaoke track resets it automatically.
#[derive(Debug, Clone, Default)]
pub struct LyricCursor {
    index: Option<usize>,
    karaoke: Option<bool>,
}

impl LyricCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last resolved index (-1 when none)
    pub fn index(&self) -> i64 {
        self.index.map(|i| i as i64).unwrap_or(-1)
    }

    pub fn reset(&mut self) {
        self.index = None;
    }

    /// Resolve against `lines`, returning the new index
    pub fn advance(&mut self, lines: &[LyricLine], time: f64, karaoke: bool) -> i64 {
        if self.karaoke != Some(karaoke) {
            self.index = None;
            self.karaoke = Some(karaoke);
        }
        let resolved = resolve_lyric_index(lines, time, self.index());
        self.index = usize::try_from(resolved).ok();
        resolved
    }
}
