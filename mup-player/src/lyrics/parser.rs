//! LRC and YRC lyric parsing
//!
//! LRC lines carry one or more `[mm:ss.xx]` tags before the text. YRC
//! (word-timed karaoke) lines look like
//! `[start_ms,duration_ms](word_start_ms,word_duration_ms,0)word...`.
//! Metadata tags (`[ar:...]`) and JSON credit lines are skipped.

use mup_common::models::{LyricLine, LyricWord, SongLyric};

/// Tolerance when pairing translation lines with original lines (seconds)
const PAIRING_TOLERANCE: f64 = 0.6;

/// Parse an LRC document into lines sorted by time
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for raw in text.lines() {
        let mut rest = raw.trim();
        let mut times = Vec::new();

        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(close) = stripped.find(']') else {
                break;
            };
            match parse_timestamp(&stripped[..close]) {
                Some(t) => times.push(t),
                None => break,
            }
            rest = &stripped[close + 1..];
        }

        let content = rest.trim();
        if times.is_empty() || content.is_empty() {
            continue;
        }
        for time in times {
            lines.push(LyricLine::new(time, content));
        }
    }

    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    for i in 0..lines.len().saturating_sub(1) {
        lines[i].end_time = Some(lines[i + 1].time);
    }
    lines
}

/// `mm:ss`, `mm:ss.xx` or `mm:ss:xx` to seconds
fn parse_timestamp(tag: &str) -> Option<f64> {
    let (minutes, rest) = tag.split_once(':')?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    let rest = rest.replacen(':', ".", 1);
    let seconds: f64 = rest.trim().parse().ok()?;
    if seconds < 0.0 {
        return None;
    }
    Some(minutes as f64 * 60.0 + seconds)
}

/// Parse a YRC document into karaoke lines sorted by time
pub fn parse_yrc(text: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = text.lines().filter_map(parse_yrc_line).collect();
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

fn parse_yrc_line(raw: &str) -> Option<LyricLine> {
    let raw = raw.trim();
    let header = raw.strip_prefix('[')?;
    let close = header.find(']')?;
    let (start, duration) = parse_ms_pair(&header[..close])?;
    let mut rest = &header[close + 1..];

    let mut words = Vec::new();
    while let Some(stripped) = rest.strip_prefix('(') {
        let close = stripped.find(')')?;
        let (word_start, word_duration) = parse_ms_pair(&stripped[..close])?;
        let after = &stripped[close + 1..];
        let end = after.find('(').unwrap_or(after.len());
        words.push(LyricWord {
            start: word_start,
            duration: word_duration,
            text: after[..end].to_string(),
        });
        rest = &after[end..];
    }

    let text: String = if words.is_empty() {
        rest.trim().to_string()
    } else {
        words.iter().map(|w| w.text.as_str()).collect::<String>().trim().to_string()
    };
    if text.is_empty() {
        return None;
    }

    Some(LyricLine {
        time: start,
        end_time: Some(start + duration),
        text,
        translation: None,
        romanization: None,
        words,
    })
}

/// `start,duration[,...]` in milliseconds to seconds
fn parse_ms_pair(body: &str) -> Option<(f64, f64)> {
    let mut parts = body.split(',');
    let start: u64 = parts.next()?.trim().parse().ok()?;
    let duration: u64 = parts.next()?.trim().parse().ok()?;
    Some((start as f64 / 1000.0, duration as f64 / 1000.0))
}

/// Attach text from `extra` to the nearest line of `lines` in time
fn pair_lines(lines: &mut [LyricLine], extra: &[LyricLine], set: fn(&mut LyricLine, String)) {
    if extra.is_empty() {
        return;
    }
    for line in lines.iter_mut() {
        let nearest = extra
            .iter()
            .min_by(|a, b| (a.time - line.time).abs().total_cmp(&(b.time - line.time).abs()));
        if let Some(candidate) = nearest {
            if (candidate.time - line.time).abs() <= PAIRING_TOLERANCE {
                set(line, candidate.text.clone());
            }
        }
    }
}

/// Assemble a song's lyrics from the raw documents returned by the API
pub fn build_song_lyric(
    lrc: Option<&str>,
    translation: Option<&str>,
    romanization: Option<&str>,
    yrc: Option<&str>,
) -> SongLyric {
    let mut lyric = SongLyric {
        lrc: lrc.map(parse_lrc).unwrap_or_default(),
        yrc: yrc.map(parse_yrc).unwrap_or_default(),
    };

    let translation = translation.map(parse_lrc).unwrap_or_default();
    let romanization = romanization.map(parse_lrc).unwrap_or_default();

    for track in [&mut lyric.lrc, &mut lyric.yrc] {
        pair_lines(track.as_mut_slice(), &translation, |line, text| {
            line.translation = Some(text)
        });
        pair_lines(track.as_mut_slice(), &romanization, |line, text| {
            line.romanization = Some(text)
        });
    }
    lyric
}
