//! Timing options recognized when a loop is built.

use tracing::warn;

/// Default fixed simulation step: 60 Hz (16.666… ms per step).
pub const DEFAULT_TIMESTEP_MS: f64 = 1000.0 / 60.0;

/// Default ceiling on processed frames per second.
pub const DEFAULT_FPS_LIMIT: f64 = 66.0;

/// Timing configuration for a [`Loop`](crate::Loop).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopOptions {
    /// Size of one simulation step in milliseconds.
    pub timestep_ms: f64,
    /// Maximum number of frames processed per second.
    pub fps_limit: f64,
    /// Whether to sample frames per second.
    pub fps_meter: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            timestep_ms: DEFAULT_TIMESTEP_MS,
            fps_limit: DEFAULT_FPS_LIMIT,
            fps_meter: true,
        }
    }
}

impl LoopOptions {
    /// Replaces unusable values (zero, negative, NaN, infinite) with defaults.
    pub fn sanitized(self) -> Self {
        Self {
            timestep_ms: positive_or(self.timestep_ms, DEFAULT_TIMESTEP_MS, "timestep_ms"),
            fps_limit: positive_or(self.fps_limit, DEFAULT_FPS_LIMIT, "fps_limit"),
            fps_meter: self.fps_meter,
        }
    }

    /// Minimum milliseconds between two accepted frames.
    pub fn min_frame_time_ms(&self) -> f64 {
        1000.0 / self.fps_limit
    }
}

fn positive_or(value: f64, default: f64, name: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("Invalid {name} {value}, using default {default}");
        default
    }
}
