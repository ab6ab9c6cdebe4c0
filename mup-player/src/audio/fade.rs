//! Linear volume ramps
//!
//! Frame-counted so the ramp runs on the render clock rather than wall time.

/// A linear ramp from one volume to another over a fixed number of frames
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRamp {
    from: f32,
    to: f32,
    total_frames: u64,
    elapsed_frames: u64,
    token: u64,
}

impl VolumeRamp {
    pub fn new(from: f32, to: f32, total_frames: u64, token: u64) -> Self {
        Self {
            from,
            to,
            total_frames,
            elapsed_frames: 0,
            token,
        }
    }

    /// Identifies the fade to whoever requested it
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    /// Volume at the current frame
    pub fn current(&self) -> f32 {
        if self.total_frames == 0 {
            return self.to;
        }
        let t = (self.elapsed_frames as f32 / self.total_frames as f32).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    /// Step one frame; returns the volume to apply to it
    pub fn step(&mut self) -> f32 {
        let volume = self.current();
        if self.elapsed_frames < self.total_frames {
            self.elapsed_frames += 1;
        }
        volume
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_frames >= self.total_frames
    }
}
