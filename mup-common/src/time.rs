//! Timestamp and progress utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Playback progress as a fraction of the track, clamped to [0, 1].
///
/// Unknown or zero durations report 0.
pub fn progress(current_secs: f64, duration_secs: f64) -> f64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || !current_secs.is_finite() {
        return 0.0;
    }
    (current_secs / duration_secs).clamp(0.0, 1.0)
}

/// Format seconds as `mm:ss` for display (negative input clamps to zero)
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 { secs.floor() as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(0), Duration::ZERO);
        assert_eq!(millis_to_duration(1000), Duration::from_secs(1));
    }

    #[test]
    fn test_progress_clamps() {
        assert_eq!(progress(30.0, 120.0), 0.25);
        assert_eq!(progress(130.0, 120.0), 1.0);
        assert_eq!(progress(-1.0, 120.0), 0.0);
    }

    #[test]
    fn test_progress_unknown_duration() {
        assert_eq!(progress(10.0, 0.0), 0.0);
        assert_eq!(progress(10.0, f64::NAN), 0.0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(65.9), "01:05");
        assert_eq!(format_clock(-3.0), "00:00");
        assert_eq!(format_clock(3600.0), "60:00");
    }
}
