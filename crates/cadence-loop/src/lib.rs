//! Fixed-timestep update/render loop for Cadence.
//!
//! Turns the irregular timestamps delivered by a frame-scheduling host into
//! fixed-size simulation steps, one interpolated render per frame, an fps
//! sample and a frame-rate ceiling. The host is abstracted behind
//! [`FrameScheduler`] so the same loop runs under a window's redraw cycle, a
//! paced headless clock, or a fully manual test harness.

pub mod fps;
pub mod game_loop;
pub mod options;
pub mod paced;
pub mod scheduler;
pub mod stepper;

pub use fps::{FPS_WINDOW_MS, FpsMeter};
pub use game_loop::{Loop, LoopBuilder, LoopState, LoopStats, WeakLoop};
pub use options::{DEFAULT_FPS_LIMIT, DEFAULT_TIMESTEP_MS, LoopOptions};
pub use paced::{PacedScheduler, refresh_interval_for};
pub use scheduler::{
    FrameCallback, FrameHandle, FrameQueue, FrameScheduler, ManualScheduler, fire_pending,
};
pub use stepper::{
    FixedStepper, FrameOutcome, Handlers, MAX_UPDATES_PER_FRAME, PanicFn, RawFrameFn, RenderFn,
    UpdateFn,
};
