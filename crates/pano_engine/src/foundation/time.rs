//! Time management utilities

use std::time::{Duration, Instant};

/// Frame timer for the display thread
///
/// Tracks presented-frame cadence so the display loop can report its rate
/// independently of how fast the render thread produces panoramas.
pub struct FrameTimer {
    started: Instant,
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_frame: now,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Mark a presented frame (call once per display iteration)
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Time between the last two ticks
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Time since the timer was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average frames per second since creation
    pub fn average_fps(&self) -> f32 {
        let secs = self.elapsed().as_secs_f32();
        if secs > 0.0 {
            self.frame_count as f32 / secs
        } else {
            0.0
        }
    }
}
