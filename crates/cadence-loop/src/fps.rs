//! Frames-per-second sampling over one-second windows.

/// Length of one fps sampling window in milliseconds.
pub const FPS_WINDOW_MS: f64 = 1000.0;

/// Counts accepted frames and publishes the raw count once per second.
///
/// The reported value is the exact number of frames seen in the last full
/// window, not a smoothed average.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FpsMeter {
    fps: u32,
    last_update: f64,
    frames_this_second: u32,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last published frame count.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Frames counted in the window currently open.
    pub fn frames_this_second(&self) -> u32 {
        self.frames_this_second
    }

    /// Opens a fresh window at `timestamp`. The published value is kept.
    pub fn reset(&mut self, timestamp: f64) {
        self.last_update = timestamp;
        self.frames_this_second = 0;
    }

    /// Counts one frame. Returns `true` if this frame closed a window and
    /// published a new value.
    pub fn record(&mut self, timestamp: f64) -> bool {
        let rolled = timestamp > self.last_update + FPS_WINDOW_MS;
        if rolled {
            self.fps = self.frames_this_second;
            self.last_update = timestamp;
            self.frames_this_second = 0;
        }
        self.frames_this_second += 1;
        rolled
    }
}
