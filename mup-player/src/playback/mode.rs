//! Play mode state machine
//!
//! Base mode (repeat, repeat-once, shuffle) combined with the two mutually
//! exclusive recommendation sub-modes. `plan_advance` decides what "next" and
//! "previous" mean; the engine carries the plan out.

use mup_common::models::PlayMode;
use serde::{Deserialize, Serialize};

/// Advance direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

/// What an advance should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Personal radio owns advancing (next queued item or a refill)
    Radio,
    /// Keep the index, seek to 0 and play again
    Replay,
    /// Load the song at this index
    MoveTo(usize),
    /// Nothing to advance through
    Empty,
}

/// Shuffle snapshot work implied by a base-mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleTransition {
    Enter,
    Exit,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeState {
    base: PlayMode,
    heartbeat: bool,
    personal_radio: bool,
}

impl ModeState {
    pub fn new(base: PlayMode) -> Self {
        Self {
            base,
            heartbeat: false,
            personal_radio: false,
        }
    }

    pub fn base(&self) -> PlayMode {
        self.base
    }

    pub fn heartbeat(&self) -> bool {
        self.heartbeat
    }

    pub fn personal_radio(&self) -> bool {
        self.personal_radio
    }

    /// Change the base mode; heartbeat is always left
    pub fn set_base(&mut self, mode: PlayMode) -> ShuffleTransition {
        let previous = self.base;
        self.base = mode;
        self.heartbeat = false;
        match (previous == PlayMode::Shuffle, mode == PlayMode::Shuffle) {
            (false, true) => ShuffleTransition::Enter,
            (true, false) => ShuffleTransition::Exit,
            _ => ShuffleTransition::Unchanged,
        }
    }

    pub fn set_heartbeat(&mut self, active: bool) {
        self.heartbeat = active;
        if active {
            self.personal_radio = false;
        }
    }

    pub fn set_personal_radio(&mut self, active: bool) {
        self.personal_radio = active;
        if active {
            self.heartbeat = false;
        }
    }

    pub fn clear_sub_modes(&mut self) {
        self.heartbeat = false;
        self.personal_radio = false;
    }

    /// Plan an advance through a playlist of `len` entries
    pub fn plan_advance(
        &self,
        direction: Direction,
        len: usize,
        index: Option<usize>,
        current_is_radio: bool,
    ) -> Advance {
        if self.personal_radio {
            return Advance::Radio;
        }
        if len == 0 {
            return Advance::Empty;
        }
        if self.base == PlayMode::RepeatOnce && !self.heartbeat && !current_is_radio {
            return Advance::Replay;
        }

        let target = match (direction, index) {
            (Direction::Next, Some(current)) if current + 1 < len => current + 1,
            (Direction::Next, _) => 0,
            (Direction::Prev, Some(current)) if current > 0 && current <= len => current - 1,
            (Direction::Prev, _) => len - 1,
        };
        Advance::MoveTo(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_wraps_forward() {
        let mode = ModeState::new(PlayMode::Repeat);
        assert_eq!(mode.plan_advance(Direction::Next, 3, Some(2), false), Advance::MoveTo(0));
        assert_eq!(mode.plan_advance(Direction::Next, 3, Some(0), false), Advance::MoveTo(1));
    }

    #[test]
    fn test_repeat_wraps_backward() {
        let mode = ModeState::new(PlayMode::Repeat);
        assert_eq!(mode.plan_advance(Direction::Prev, 3, Some(0), false), Advance::MoveTo(2));
        assert_eq!(mode.plan_advance(Direction::Prev, 3, Some(2), false), Advance::MoveTo(1));
    }

    #[test]
    fn test_no_current_index() {
        let mode = ModeState::new(PlayMode::Shuffle);
        assert_eq!(mode.plan_advance(Direction::Next, 4, None, false), Advance::MoveTo(0));
        assert_eq!(mode.plan_advance(Direction::Prev, 4, None, false), Advance::MoveTo(3));
    }

    #[test]
    fn test_repeat_once_replays() {
        let mode = ModeState::new(PlayMode::RepeatOnce);
        assert_eq!(mode.plan_advance(Direction::Next, 3, Some(0), false), Advance::Replay);
    }

    #[test]
    fn test_repeat_once_moves_for_radio_items_and_heartbeat() {
        let mut mode = ModeState::new(PlayMode::RepeatOnce);
        assert_eq!(mode.plan_advance(Direction::Next, 3, Some(0), true), Advance::MoveTo(1));
        mode.base = PlayMode::RepeatOnce;
        mode.set_heartbeat(true);
        assert_eq!(mode.plan_advance(Direction::Next, 3, Some(0), false), Advance::MoveTo(1));
    }

    #[test]
    fn test_personal_radio_ignores_base_mode() {
        let mut mode = ModeState::new(PlayMode::RepeatOnce);
        mode.set_personal_radio(true);
        assert_eq!(mode.plan_advance(Direction::Next, 0, None, false), Advance::Radio);
    }

    #[test]
    fn test_empty_playlist() {
        let mode = ModeState::new(PlayMode::Repeat);
        assert_eq!(mode.plan_advance(Direction::Next, 0, None, false), Advance::Empty);
    }

    #[test]
    fn test_sub_modes_are_exclusive() {
        let mut mode = ModeState::default();
        mode.set_heartbeat(true);
        mode.set_personal_radio(true);
        assert!(mode.personal_radio());
        assert!(!mode.heartbeat());
        mode.set_heartbeat(true);
        assert!(!mode.personal_radio());
        mode.clear_sub_modes();
        assert!(!mode.heartbeat() && !mode.personal_radio());
    }

    #[test]
    fn test_base_change_reports_shuffle_transition() {
        let mut mode = ModeState::new(PlayMode::Repeat);
        mode.set_heartbeat(true);
        assert_eq!(mode.set_base(PlayMode::Shuffle), ShuffleTransition::Enter);
        assert!(!mode.heartbeat());
        assert_eq!(mode.set_base(PlayMode::Shuffle), ShuffleTransition::Unchanged);
        assert_eq!(mode.set_base(PlayMode::RepeatOnce), ShuffleTransition::Exit);
        assert_eq!(mode.set_base(PlayMode::Repeat), ShuffleTransition::Unchanged);
    }
}
