//! Time management utilities

use std::time::Instant;

/// Longest frame time handed to the update phase, in seconds.
///
/// A stall (debugger break, window drag, swapchain rebuild) would otherwise
/// make orbiting lights and the camera jump.
pub const MAX_FRAME_TIME: f32 = 0.25;

/// Frame timer measuring the wall time between loop iterations
pub struct FrameTimer {
    last_frame: Instant,
    frame_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            frame_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance the timer (call once per loop iteration) and return the clamped frame time
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record(elapsed)
    }

    fn record(&mut self, elapsed: f32) -> f32 {
        self.frame_time = elapsed.clamp(0.0, MAX_FRAME_TIME);
        self.total_time += self.frame_time;
        self.frame_count += 1;
        self.frame_time
    }

    /// Time of the last frame in seconds
    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    /// Accumulated (clamped) time since creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}
