//! A tiny deterministic simulation hosted by the demo binary.
//!
//! A unit-mass spring oscillates once per second. Each fixed update advances
//! it by one step; each render blends the previous and current positions by
//! the interpolation fraction, which is exactly what a renderer would draw.

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cadence_loop::LoopBuilder;
use tracing::{info, warn};

/// Angular frequency of the oscillator (one cycle per second).
pub const OMEGA: f64 = TAU;

/// Spring state stepped with semi-implicit Euler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillator {
    pub position: f64,
    pub velocity: f64,
    previous: f64,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            position: 1.0,
            velocity: 0.0,
            previous: 1.0,
        }
    }
}

impl Oscillator {
    /// Advances by `dt_ms` milliseconds.
    pub fn step(&mut self, dt_ms: f64) {
        let dt = dt_ms / 1000.0;
        self.previous = self.position;
        self.velocity -= OMEGA * OMEGA * self.position * dt;
        self.position += self.velocity * dt;
    }

    /// Position blended between the last two steps.
    pub fn interpolated(&self, alpha: f64) -> f64 {
        self.previous + (self.position - self.previous) * alpha
    }
}

/// What the demo observed while it ran.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DemoSummary {
    pub updates: u64,
    pub renders: u64,
    pub panics: u64,
    pub last_fps: Option<u32>,
    pub last_alpha: f64,
    pub rendered_position: f64,
}

#[derive(Debug, Default)]
struct DemoState {
    oscillator: Oscillator,
    summary: DemoSummary,
}

/// Shared demo state plus the callbacks that drive it.
#[derive(Debug, Clone)]
pub struct Demo {
    state: Rc<RefCell<DemoState>>,
    update_cost: Duration,
}

impl Demo {
    /// `update_cost_ms` of busy work is added to every update; invalid or
    /// negative values mean none.
    pub fn new(update_cost_ms: f64) -> Self {
        Self {
            state: Rc::default(),
            update_cost: Duration::try_from_secs_f64(update_cost_ms / 1000.0)
                .unwrap_or(Duration::ZERO),
        }
    }

    /// Installs the update, render and panic callbacks on `builder`.
    pub fn install(&self, builder: LoopBuilder) -> LoopBuilder {
        let (update_state, render_state, panic_state) =
            (self.state.clone(), self.state.clone(), self.state.clone());
        let cost = self.update_cost;

        builder
            .on_update(move |dt| {
                burn(cost);
                let mut state = update_state.borrow_mut();
                state.oscillator.step(dt);
                state.summary.updates += 1;
            })
            .on_render(move |alpha, fps| {
                let mut state = render_state.borrow_mut();
                let position = state.oscillator.interpolated(alpha);
                if fps != state.summary.last_fps
                    && let Some(fps) = fps
                {
                    info!(fps, position, "fps sample");
                }
                let summary = &mut state.summary;
                summary.renders += 1;
                summary.last_fps = fps;
                summary.last_alpha = alpha;
                summary.rendered_position = position;
            })
            .on_panic(move || {
                let mut state = panic_state.borrow_mut();
                state.summary.panics += 1;
                warn!(
                    panics = state.summary.panics,
                    "simulation fell behind, snapping to real time"
                );
            })
    }

    pub fn summary(&self) -> DemoSummary {
        self.state.borrow().summary
    }

    pub fn oscillator(&self) -> Oscillator {
        self.state.borrow().oscillator
    }
}

/// Spins for `cost` to stand in for expensive simulation work.
fn burn(cost: Duration) {
    if cost.is_zero() {
        return;
    }
    let start = Instant::now();
    while start.elapsed() < cost {
        std::hint::spin_loop();
    }
}
