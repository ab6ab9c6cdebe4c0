//! Consecutive failure budget

/// Outcome of recording a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Still within budget
    Continue,
    /// Budget exhausted; the counter has been reset
    Exceeded { attempts: u32 },
}

/// Counts consecutive load/playback failures
///
/// Reset on every successful play start.
#[derive(Debug, Clone)]
pub struct RetryState {
    count: u32,
    max: u32,
}

impl RetryState {
    pub fn new(max: u32) -> Self {
        Self { count: 0, max }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn record_failure(&mut self) -> RetryVerdict {
        self.count += 1;
        if self.count > self.max {
            let attempts = self.count;
            self.count = 0;
            RetryVerdict::Exceeded { attempts }
        } else {
            RetryVerdict::Continue
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}
