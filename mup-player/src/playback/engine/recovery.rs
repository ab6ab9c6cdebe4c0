//! Failure handling
//!
//! Every load or playback failure counts against the retry budget. A stale
//! source reloads the same song; anything else moves on to the next entry
//! unless there is nowhere to move to.

use super::core::EngineCore;
use crate::playback::retry::RetryVerdict;
use crate::state::SessionPhase;
use mup_common::events::{FailureReason, NoticeLevel};
use tracing::{info, warn};

/// Failure classes as seen by the recovery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FailureKind {
    /// No playable URL (or a preview while previews are off)
    Unavailable,
    /// Source URL expired mid-session
    Stale,
    /// Decode, transport or output failure
    Backend,
}

impl EngineCore {
    pub(super) fn handle_failure(&mut self, kind: FailureKind) {
        self.phase = SessionPhase::Errored;
        self.set_loading(false);

        if let RetryVerdict::Exceeded { attempts } = self.retry.record_failure() {
            warn!("Giving up after {} consecutive failures", attempts);
            let _ = self.fail(FailureReason::RetryBudgetExceeded);
            return;
        }

        let song_name = self
            .current_song
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let resume = self.playing || self.autoplay;
        info!(
            "Recovering from {:?} on '{}' (attempt {})",
            kind,
            song_name,
            self.retry.count()
        );

        match kind {
            FailureKind::Stale => {
                let position = self.current_time;
                self.load_current(resume, Some(position));
            }
            FailureKind::Unavailable | FailureKind::Backend => {
                if self.playlist.len() > 1 || self.mode.personal_radio() {
                    if kind == FailureKind::Unavailable {
                        self.telemetry.notice(
                            NoticeLevel::Warning,
                            format!("'{}' is unavailable, skipping", song_name),
                        );
                    }
                    self.skip_forward(resume);
                } else {
                    self.telemetry
                        .notice(NoticeLevel::Warning, "No playable track");
                    self.stop();
                }
            }
        }
    }
}
