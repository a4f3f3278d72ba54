//! The self re-arming frame loop.
//!
//! A [`Loop`] owns a [`FixedStepper`] and a [`FrameScheduler`]. `start`
//! requests one frame that performs the initial render; every frame after
//! that runs the stepper and requests the next, until `stop` cancels the
//! outstanding request.
//!
//! Lifecycle flags, the frame handle and the published stats live in `Cell`s
//! so that `start`, `stop` and the read accessors stay usable from inside the
//! loop's own callbacks.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::options::LoopOptions;
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::stepper::{FixedStepper, FrameOutcome, Handlers, RawFrameFn};

/// Lifecycle of a [`Loop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Not started, or stopped.
    #[default]
    Idle,
    /// Started; the first frame has been requested but has not fired yet.
    AwaitingFirstFrame,
    /// The first frame fired; regular frames are being processed.
    Running,
}

/// Counters accumulated over the lifetime of a [`Loop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames that ran the stepper and rendered, including the initial render.
    pub frames: u64,
    /// Fixed simulation steps executed.
    pub updates: u64,
    /// Frames that hit the per-frame update limit.
    pub panics: u64,
    /// Frames dropped by the fps ceiling.
    pub dropped_frames: u64,
    /// Frames delivered to the raw-frame handler.
    pub raw_frames: u64,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    First,
    Regular,
}

struct Shared<S: FrameScheduler> {
    scheduler: S,
    state: Cell<LoopState>,
    /// Bumped on every start; callbacks armed under an older epoch are inert.
    epoch: Cell<u64>,
    frame_handle: Cell<Option<FrameHandle>>,
    fps: Cell<Option<u32>>,
    stats: Cell<LoopStats>,
    /// Copies of the stepper's settings, readable while it is borrowed mid-frame.
    timestep: f64,
    min_frame_time: f64,
    stepper: RefCell<FixedStepper>,
    handlers: RefCell<Handlers>,
    /// Raw-frame handler swap applied at the start of the next frame.
    raw_frame_swap: RefCell<Option<Option<RawFrameFn>>>,
}

/// A fixed-timestep update/render loop driven by a [`FrameScheduler`].
///
/// Cloning yields another handle to the same loop.
pub struct Loop<S: FrameScheduler + 'static> {
    shared: Rc<Shared<S>>,
}

impl<S: FrameScheduler + 'static> Clone for Loop<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

/// Non-owning handle to a [`Loop`], for capture inside its own callbacks
/// without creating a reference cycle.
pub struct WeakLoop<S: FrameScheduler + 'static> {
    shared: Weak<Shared<S>>,
}

impl<S: FrameScheduler + 'static> Clone for WeakLoop<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<S: FrameScheduler + 'static> WeakLoop<S> {
    pub fn upgrade(&self) -> Option<Loop<S>> {
        self.shared.upgrade().map(|shared| Loop { shared })
    }
}

impl<S: FrameScheduler + 'static> Loop<S> {
    /// Creates an idle loop with the given options and handlers.
    pub fn new(options: LoopOptions, handlers: Handlers, scheduler: S) -> Self {
        let stepper = FixedStepper::new(options);
        Self {
            shared: Rc::new(Shared {
                scheduler,
                state: Cell::new(LoopState::Idle),
                epoch: Cell::new(0),
                frame_handle: Cell::new(None),
                fps: Cell::new(stepper.fps()),
                stats: Cell::new(LoopStats::default()),
                timestep: stepper.timestep(),
                min_frame_time: stepper.min_frame_time(),
                stepper: RefCell::new(stepper),
                handlers: RefCell::new(handlers),
                raw_frame_swap: RefCell::new(None),
            }),
        }
    }

    /// Begins the loop. Does nothing if it is already started.
    pub fn start(&self) {
        let shared = &self.shared;
        if shared.state.get() != LoopState::Idle {
            return;
        }
        let epoch = shared.epoch.get().wrapping_add(1);
        shared.epoch.set(epoch);
        shared.state.set(LoopState::AwaitingFirstFrame);
        debug!(epoch, "loop started");
        Shared::schedule(shared, epoch, Phase::First);
    }

    /// Halts the loop and cancels the pending frame. Safe to call in any
    /// state, including from inside the loop's callbacks.
    pub fn stop(&self) {
        let shared = &self.shared;
        let previous = shared.state.replace(LoopState::Idle);
        shared.cancel_pending();
        if previous != LoopState::Idle {
            debug!(epoch = shared.epoch.get(), "loop stopped");
        }
    }

    pub fn state(&self) -> LoopState {
        self.shared.state.get()
    }

    /// True once the first frame has fired and until the loop is stopped.
    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// True from `start` until `stop`.
    pub fn is_started(&self) -> bool {
        self.state() != LoopState::Idle
    }

    /// Last full second's frame count; `None` if fps metering is disabled.
    pub fn fps(&self) -> Option<u32> {
        self.shared.fps.get()
    }

    pub fn stats(&self) -> LoopStats {
        self.shared.stats.get()
    }

    /// Handle of the outstanding frame request, if any.
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.shared.frame_handle.get()
    }

    /// Fixed step size in milliseconds.
    pub fn timestep(&self) -> f64 {
        self.shared.timestep
    }

    /// Minimum milliseconds between accepted frames.
    pub fn min_frame_time(&self) -> f64 {
        self.shared.min_frame_time
    }

    pub fn scheduler(&self) -> &S {
        &self.shared.scheduler
    }

    /// Enables (`Some`) or disables (`None`) raw-frame mode. Takes effect on
    /// the next frame, so it may be called from inside a callback.
    pub fn set_raw_frame_handler(&self, handler: Option<RawFrameFn>) {
        *self.shared.raw_frame_swap.borrow_mut() = Some(handler);
    }

    pub fn downgrade(&self) -> WeakLoop<S> {
        WeakLoop {
            shared: Rc::downgrade(&self.shared),
        }
    }
}

impl<S: FrameScheduler + 'static> Shared<S> {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.get() == epoch && self.state.get() != LoopState::Idle
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.frame_handle.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    fn schedule(shared: &Rc<Self>, epoch: u64, phase: Phase) {
        let weak = Rc::downgrade(shared);
        let handle = shared.scheduler.request_frame(Box::new(move |timestamp| {
            if let Some(shared) = weak.upgrade() {
                Shared::on_frame(&shared, epoch, phase, timestamp);
            }
        }));
        shared.frame_handle.set(Some(handle));
    }

    fn on_frame(shared: &Rc<Self>, epoch: u64, phase: Phase, timestamp: f64) {
        if !shared.is_current(epoch) {
            return;
        }
        shared.frame_handle.set(None);

        match phase {
            Phase::First => shared.first_frame(timestamp),
            Phase::Regular => shared.regular_frame(timestamp),
        }

        // A callback may have stopped (or stopped and restarted) the loop.
        if !shared.is_current(epoch) {
            return;
        }
        if let Phase::First = phase {
            shared.state.set(LoopState::Running);
            debug!(timestamp, "first frame");
        }
        Shared::schedule(shared, epoch, Phase::Regular);
    }

    /// Initial render with the fraction fixed at 1, then anchors timing.
    /// In raw-frame mode nothing is rendered.
    fn first_frame(&self, timestamp: f64) {
        let mut handlers = self.handlers.borrow_mut();
        self.apply_raw_frame_swap(&mut handlers);
        if handlers.raw_frame.is_none() {
            let fps = self.stepper.borrow().fps();
            (handlers.render)(1.0, fps);
            drop(handlers);
            self.bump_stats(|stats| stats.frames += 1);
        }
        self.stepper.borrow_mut().reset(timestamp);
    }

    fn regular_frame(&self, timestamp: f64) {
        let mut handlers = self.handlers.borrow_mut();
        self.apply_raw_frame_swap(&mut handlers);

        if let Some(raw_frame) = handlers.raw_frame.as_mut() {
            raw_frame(timestamp);
            drop(handlers);
            self.bump_stats(|stats| stats.raw_frames += 1);
            return;
        }

        let mut stepper = self.stepper.borrow_mut();
        let outcome = stepper.advance(timestamp, &mut handlers);
        let fps = stepper.fps();
        drop(stepper);
        drop(handlers);

        self.fps.set(fps);
        match outcome {
            FrameOutcome::Throttled => {
                trace!(timestamp, "frame throttled");
                self.bump_stats(|stats| stats.dropped_frames += 1);
            }
            FrameOutcome::Rendered { updates, panicked } => self.bump_stats(|stats| {
                stats.frames += 1;
                stats.updates += u64::from(updates);
                stats.panics += u64::from(panicked);
            }),
        }
    }

    fn apply_raw_frame_swap(&self, handlers: &mut Handlers) {
        let swap = self.raw_frame_swap.borrow_mut().take();
        if let Some(raw_frame) = swap {
            handlers.raw_frame = raw_frame;
        }
    }

    fn bump_stats(&self, f: impl FnOnce(&mut LoopStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl<S: FrameScheduler> Drop for Shared<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.frame_handle.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}

/// Assembles a [`Loop`] from options and optional handlers.
///
/// Every handler defaults to a no-op; raw-frame mode defaults to off.
#[derive(Default)]
pub struct LoopBuilder {
    options: LoopOptions,
    handlers: Handlers,
}

impl LoopBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: LoopOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timestep_ms(mut self, timestep_ms: f64) -> Self {
        self.options.timestep_ms = timestep_ms;
        self
    }

    pub fn fps_limit(mut self, fps_limit: f64) -> Self {
        self.options.fps_limit = fps_limit;
        self
    }

    pub fn fps_meter(mut self, enabled: bool) -> Self {
        self.options.fps_meter = enabled;
        self
    }

    /// Simulation step callback, receiving the step size in milliseconds.
    pub fn on_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.handlers.update = Box::new(f);
        self
    }

    /// Render callback, receiving the interpolation fraction and fps.
    pub fn on_render(mut self, f: impl FnMut(f64, Option<u32>) + 'static) -> Self {
        self.handlers.render = Box::new(f);
        self
    }

    pub fn on_panic(mut self, f: impl FnMut() + 'static) -> Self {
        self.handlers.panic = Box::new(f);
        self
    }

    /// Bypass callback: when set, every frame goes here and no stepping or
    /// rendering happens.
    pub fn on_raw_frame(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.handlers.raw_frame = Some(Box::new(f));
        self
    }

    pub fn build<S: FrameScheduler + 'static>(self, scheduler: S) -> Loop<S> {
        Loop::new(self.options, self.handlers, scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    fn manual_loop(builder: LoopBuilder) -> (Loop<ManualScheduler>, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let game_loop = builder.build(scheduler.clone());
        (game_loop, scheduler)
    }

    #[test]
    fn test_new_loop_is_idle() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        assert_eq!(game_loop.state(), LoopState::Idle);
        assert!(!game_loop.is_started());
        assert_eq!(game_loop.fps(), Some(0));
        assert_eq!(game_loop.pending_frame(), None);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_start_requests_one_frame() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.start();
        assert_eq!(game_loop.state(), LoopState::AwaitingFirstFrame);
        assert_eq!(scheduler.pending(), 1);
        let handle = game_loop.pending_frame().expect("frame requested");
        assert!(scheduler.is_pending(handle));
        assert!(game_loop.scheduler().is_pending(handle));
    }

    #[test]
    fn test_start_twice_is_idempotent() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.start();
        let handle = game_loop.pending_frame();
        game_loop.start();
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(game_loop.pending_frame(), handle);
    }

    #[test]
    fn test_first_frame_transitions_to_running() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.start();
        scheduler.fire(100.0);
        assert_eq!(game_loop.state(), LoopState::Running);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(game_loop.stats().frames, 1);
    }

    #[test]
    fn test_stop_cancels_pending_frame() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.start();
        scheduler.fire(0.0);
        game_loop.stop();
        assert_eq!(game_loop.state(), LoopState::Idle);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.fire(16.0), 0);
    }

    #[test]
    fn test_stop_twice_is_idempotent() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.stop();
        game_loop.start();
        game_loop.stop();
        game_loop.stop();
        assert_eq!(game_loop.state(), LoopState::Idle);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_stop_before_first_frame() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.start();
        game_loop.stop();
        assert_eq!(scheduler.fire(0.0), 0);
        assert_eq!(game_loop.stats(), LoopStats::default());
    }

    #[test]
    fn test_restart_after_stop() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.start();
        scheduler.fire(0.0);
        game_loop.stop();
        game_loop.start();
        assert_eq!(game_loop.state(), LoopState::AwaitingFirstFrame);
        assert_eq!(scheduler.pending(), 1);
        scheduler.fire(5000.0);
        assert!(game_loop.is_running());
        assert_eq!(game_loop.stats().frames, 2);
    }

    #[test]
    fn test_drop_cancels_pending_frame() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new());
        game_loop.start();
        drop(game_loop);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_weak_loop_upgrade() {
        let (game_loop, _scheduler) = manual_loop(LoopBuilder::new());
        let weak = game_loop.downgrade();
        assert!(weak.upgrade().is_some());
        drop(game_loop);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_builder_options_are_sanitized() {
        let (game_loop, _scheduler) =
            manual_loop(LoopBuilder::new().timestep_ms(-1.0).fps_limit(0.0));
        assert!((game_loop.timestep() - 1000.0 / 60.0).abs() < 1e-12);
        assert!((game_loop.min_frame_time() - 1000.0 / 66.0).abs() < 1e-12);
    }

    #[test]
    fn test_fps_meter_disabled() {
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new().fps_meter(false));
        game_loop.start();
        scheduler.fire_all([0.0, 500.0, 1600.0]);
        assert_eq!(game_loop.fps(), None);
    }

    #[test]
    fn test_accessors_usable_inside_callbacks() {
        let slot: Rc<RefCell<Option<WeakLoop<ManualScheduler>>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(Cell::new(0.0));
        let (inner_slot, inner_seen) = (slot.clone(), seen.clone());
        let (game_loop, scheduler) = manual_loop(LoopBuilder::new().timestep_ms(5.0).on_update(
            move |_| {
                if let Some(game_loop) = inner_slot.borrow().as_ref().and_then(WeakLoop::upgrade) {
                    inner_seen.set(game_loop.timestep());
                    let _ = game_loop.fps();
                    let _ = game_loop.stats();
                    assert!(game_loop.is_running());
                }
            },
        ));
        *slot.borrow_mut() = Some(game_loop.downgrade());

        game_loop.start();
        scheduler.fire_all([0.0, 20.0]);
        assert!((seen.get() - 5.0).abs() < f64::EPSILON);
    }
}
