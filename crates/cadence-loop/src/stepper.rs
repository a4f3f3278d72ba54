//! Fixed-timestep accumulator implementing the "Fix Your Timestep" pattern.
//!
//! Decouples simulation (fixed step) from rendering (whatever rate the host
//! delivers frames at) using an accumulator, and hands the render callback an
//! interpolation fraction for smooth drawing between simulation states.
//! [`FixedStepper`] is pure: it never schedules anything, so it can be driven
//! directly with synthetic timestamps.

use tracing::{debug, warn};

use crate::fps::FpsMeter;
use crate::options::LoopOptions;

/// Maximum simulation steps run in a single frame before the stepper panics
/// and drops the backlog instead of trying to catch up.
pub const MAX_UPDATES_PER_FRAME: u32 = 240;

/// Called once per fixed step with the step size in milliseconds.
pub type UpdateFn = Box<dyn FnMut(f64)>;
/// Called once per accepted frame with the interpolation fraction and fps.
pub type RenderFn = Box<dyn FnMut(f64, Option<u32>)>;
/// Called when a frame exceeds [`MAX_UPDATES_PER_FRAME`].
pub type PanicFn = Box<dyn FnMut()>;
/// Called with every host timestamp when raw-frame mode is enabled.
pub type RawFrameFn = Box<dyn FnMut(f64)>;

/// The externally supplied callbacks a loop drives.
pub struct Handlers {
    pub update: UpdateFn,
    pub render: RenderFn,
    pub panic: PanicFn,
    /// When set, bypasses stepping and rendering entirely.
    pub raw_frame: Option<RawFrameFn>,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            update: Box::new(|_| {}),
            render: Box::new(|_, _| {}),
            panic: Box::new(|| {}),
            raw_frame: None,
        }
    }
}

/// What [`FixedStepper::advance`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame arrived before the fps ceiling allowed another one and was
    /// dropped without touching any state.
    Throttled,
    /// The frame ran `updates` fixed steps and rendered once.
    Rendered { updates: u32, panicked: bool },
}

/// Accumulator, throttle and fps state of a fixed-timestep loop.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    timestep: f64,
    min_frame_time: f64,
    last_frame_time: f64,
    delta: f64,
    fps_meter: Option<FpsMeter>,
}

impl FixedStepper {
    /// Creates a stepper from `options`, replacing invalid values with defaults.
    pub fn new(options: LoopOptions) -> Self {
        let options = options.sanitized();
        Self {
            timestep: options.timestep_ms,
            min_frame_time: options.min_frame_time_ms(),
            last_frame_time: 0.0,
            delta: 0.0,
            fps_meter: options.fps_meter.then(FpsMeter::new),
        }
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn min_frame_time(&self) -> f64 {
        self.min_frame_time
    }

    /// Unconsumed simulation time in milliseconds.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn last_frame_time(&self) -> f64 {
        self.last_frame_time
    }

    /// How far into the next, not yet simulated step the current moment is.
    pub fn interpolation(&self) -> f64 {
        self.delta / self.timestep
    }

    /// Last published fps sample, or `None` when metering is disabled.
    pub fn fps(&self) -> Option<u32> {
        self.fps_meter.as_ref().map(FpsMeter::fps)
    }

    /// Re-anchors frame timing and the fps window at `timestamp`.
    ///
    /// Accumulated `delta` survives, so a loop restarted after a stop resumes
    /// with whatever partial step it had left.
    pub fn reset(&mut self, timestamp: f64) {
        self.last_frame_time = timestamp;
        if let Some(meter) = &mut self.fps_meter {
            meter.reset(timestamp);
        }
    }

    /// Whether a frame at `timestamp` would be dropped by the fps ceiling.
    pub fn is_throttled(&self, timestamp: f64) -> bool {
        timestamp < self.last_frame_time + self.min_frame_time
    }

    /// Processes one host frame: throttle, accumulate, sample fps, drain
    /// fixed steps, render.
    ///
    /// - `handlers.update(timestep)` runs zero or more times.
    /// - `handlers.render(interpolation, fps)` runs exactly once unless the
    ///   frame is throttled.
    ///
    /// `handlers.raw_frame` is not consulted here; the caller owns that mode.
    pub fn advance(&mut self, timestamp: f64, handlers: &mut Handlers) -> FrameOutcome {
        if self.is_throttled(timestamp) {
            return FrameOutcome::Throttled;
        }

        self.delta += timestamp - self.last_frame_time;
        self.last_frame_time = timestamp;

        if let Some(meter) = &mut self.fps_meter
            && meter.record(timestamp)
        {
            debug!(fps = meter.fps(), "fps sample");
        }

        let mut updates = 0;
        let mut panicked = false;
        while self.delta >= self.timestep {
            (handlers.update)(self.timestep);
            self.delta -= self.timestep;
            updates += 1;

            if updates >= MAX_UPDATES_PER_FRAME {
                self.panic(handlers);
                panicked = true;
                break;
            }
        }

        (handlers.render)(self.interpolation(), self.fps());
        FrameOutcome::Rendered { updates, panicked }
    }

    /// Discards the unconsumed backlog and notifies the panic handler.
    ///
    /// Recoverable: the next frame proceeds normally.
    pub fn panic(&mut self, handlers: &mut Handlers) {
        warn!(
            "Update starvation: discarding {:.1}ms of unsimulated time after {} steps",
            self.delta, MAX_UPDATES_PER_FRAME
        );
        self.delta = 0.0;
        (handlers.panic)();
    }
}

impl Default for FixedStepper {
    fn default() -> Self {
        Self::new(LoopOptions::default())
    }
}
