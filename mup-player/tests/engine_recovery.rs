//! Failure recovery: retry budget, stale sources, generation filtering

mod helpers;

use helpers::{drain, notices, remote, settle, Harness};
use mup_common::events::{FailureReason, MupEvent};
use mup_common::models::{LyricLine, SongId, SongLyric};
use mup_player::audio::SessionErrorKind;
use mup_player::playback::EngineCommand;
use mup_player::state::SessionPhase;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_sixth_backend_error_exhausts_retry_budget() {
    let h = Harness::new();
    let mut rx = h.engine.subscribe();
    h.load(&["a", "b", "c"], None, true).await;

    for attempt in 1..=6 {
        assert_eq!(h.backend.open_count(), attempt, "open before failure {}", attempt);
        h.backend.error(SessionErrorKind::Network);
        settle().await;
    }

    // no 7th load after the budget is gone
    assert_eq!(h.backend.open_count(), 6);
    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert!(!snapshot.playing);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.retry_count, 0);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        MupEvent::PlaybackFailed {
            reason: FailureReason::RetryBudgetExceeded,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_failures_walk_the_playlist() {
    let h = Harness::new();
    h.load(&["a", "b", "c"], None, true).await;

    h.backend.error(SessionErrorKind::Decode);
    settle().await;
    h.backend.error(SessionErrorKind::Decode);
    settle().await;
    h.backend.error(SessionErrorKind::Decode);
    settle().await;

    assert_eq!(
        h.backend.sources(),
        vec![remote("a"), remote("b"), remote("c"), remote("a")]
    );
    assert_eq!(h.snapshot().await.retry_count, 3);
}

#[tokio::test(start_paused = true)]
async fn test_stale_source_reloads_same_song() {
    let h = Harness::new();
    h.load(&["a", "b", "c"], None, true).await;
    h.backend.loaded(200.0);
    settle().await;
    h.backend.set_position(42.0);
    // tick samples the position
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    h.backend.error(SessionErrorKind::Stale);
    settle().await;

    assert_eq!(h.backend.sources(), vec![remote("a"), remote("a")]);
    assert_eq!(h.streams.lookups().len(), 2);

    h.backend.loaded(200.0);
    settle().await;
    assert_eq!(h.backend.last_state().seeks, vec![42.0]);
    assert_eq!(h.snapshot().await.index, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_stale_errors_share_the_budget() {
    let h = Harness::new();
    h.load(&["a", "b", "c"], None, true).await;

    for _ in 0..6 {
        h.backend.error(SessionErrorKind::Stale);
        settle().await;
    }

    assert_eq!(h.backend.open_count(), 6);
    assert!(h.backend.sources().iter().all(|s| *s == remote("a")));
    assert_eq!(h.snapshot().await.phase, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_successful_start_resets_retry_count() {
    let h = Harness::new();
    h.load(&["a", "b"], None, true).await;
    h.backend.error(SessionErrorKind::Network);
    settle().await;
    assert_eq!(h.snapshot().await.retry_count, 1);

    h.backend.loaded(100.0);
    settle().await;
    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.retry_count, 0);
    assert_eq!(snapshot.phase, SessionPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_single_unavailable_song_stops() {
    let h = Harness::new();
    h.streams.mark_unavailable("a");
    let mut rx = h.engine.subscribe();
    h.load(&["a"], None, true).await;

    assert_eq!(h.backend.open_count(), 0);
    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert!(!snapshot.playing);
    // playlist is kept
    assert_eq!(snapshot.playlist.len(), 1);
    assert!(notices(&drain(&mut rx)).iter().any(|n| n == "No playable track"));
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_song_is_skipped() {
    let h = Harness::new();
    h.streams.mark_unavailable("b");
    let mut rx = h.engine.subscribe();
    h.load(&["a", "b", "c"], Some("b"), true).await;

    assert_eq!(h.backend.sources(), vec![remote("c")]);
    assert_eq!(h.snapshot().await.index, Some(2));
    assert!(notices(&drain(&mut rx))
        .iter()
        .any(|n| n.contains("Song b") && n.contains("skipping")));
}

#[tokio::test(start_paused = true)]
async fn test_trial_only_url_counts_as_unavailable() {
    let h = Harness::new();
    h.streams.mark_trial_only("a");
    h.load(&["a", "b"], None, true).await;
    assert_eq!(h.backend.sources(), vec![remote("b")]);
}

#[tokio::test(start_paused = true)]
async fn test_trial_only_url_plays_when_allowed() {
    let mut settings = helpers::test_settings();
    settings.allow_trial_playback = true;
    let h = Harness::with_settings(settings);
    h.streams.mark_trial_only("a");
    let mut rx = h.engine.subscribe();
    h.load(&["a", "b"], None, true).await;

    assert_eq!(h.backend.sources(), vec![remote("a")]);
    assert!(notices(&drain(&mut rx)).iter().any(|n| n.contains("preview")));
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_counts_as_backend_error() {
    let h = Harness::new();
    h.backend.set_fail_open(true);
    h.load(&["a", "b"], None, true).await;

    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert_eq!(h.backend.open_count(), 0);
    assert_eq!(h.streams.lookups().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_stale_generation_messages_are_dropped() {
    let h = Harness::new();
    h.load(&["a", "b"], None, true).await;
    h.backend.loaded(100.0);
    settle().await;
    let old = h.backend.events(0);

    h.run(EngineCommand::Next).await.unwrap();
    settle().await;
    assert_eq!(h.backend.open_count(), 2);
    assert!(h.backend.session_state(0).dropped);

    old.ended();
    old.error(SessionErrorKind::Network, "late");
    old.loaded(5.0);
    settle().await;

    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.index, Some(1));
    assert_eq!(snapshot.retry_count, 0);
    assert_eq!(snapshot.duration, 0.0);
    assert_eq!(h.backend.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_url_resolution_is_dropped() {
    let h = Harness::new();
    h.streams.delay("a", Duration::from_millis(50));
    h.load(&["a", "b"], None, true).await;
    assert_eq!(h.backend.open_count(), 0);

    h.run(EngineCommand::Next).await.unwrap();
    settle().await;
    assert_eq!(h.backend.sources(), vec![remote("b")]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    settle().await;

    let snapshot = h.snapshot().await;
    assert_eq!(h.backend.sources(), vec![remote("b")]);
    assert_eq!(snapshot.index, Some(1));
    assert_eq!(snapshot.current_song.map(|s| s.id), Some(SongId::from("b")));
    assert!(!h.backend.session_state(0).dropped);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_lyric_fetch_is_dropped() {
    let h = Harness::new();
    let lyric_a = SongLyric {
        lrc: vec![LyricLine::new(0.0, "from a")],
        yrc: Vec::new(),
    };
    let lyric_b = SongLyric {
        lrc: vec![LyricLine::new(0.0, "from b")],
        yrc: Vec::new(),
    };
    h.lyrics.set_for("a", lyric_a);
    h.lyrics.set_for("b", lyric_b.clone());
    h.lyrics.delay("a", Duration::from_millis(50));

    h.load(&["a", "b"], None, true).await;
    h.run(EngineCommand::Next).await.unwrap();
    settle().await;
    assert_eq!(h.snapshot().await.lyric, lyric_b);

    tokio::time::sleep(Duration::from_millis(100)).await;
    settle().await;

    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.lyric, lyric_b);
    assert_eq!(snapshot.current_song.map(|s| s.id), Some(SongId::from("b")));
    assert_eq!(h.backend.open_count(), 2);
}
