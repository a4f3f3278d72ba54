//! Window hosting via winit.
//!
//! The window's redraw cycle is the frame source. [`RedrawScheduler`] queues
//! loop callbacks and paces redraws to the monitor's refresh rate: between
//! frames the event loop sleeps with `ControlFlow::WaitUntil` on the next
//! vsync, then requests a redraw, and every `RedrawRequested` event fires the
//! queued batch with a millisecond timestamp.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_config::Config;
use cadence_loop::{
    FrameCallback, FrameHandle, FrameQueue, FrameScheduler, Loop, LoopBuilder, LoopStats,
    fire_pending, refresh_interval_for,
};
use tracing::{error, info, instrument};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::demo::Demo;
use crate::error::AppError;
use crate::loop_options;

/// A [`FrameScheduler`] backed by a window's redraw cycle.
///
/// Requests only queue; the host asks [`next_redraw_at`](Self::next_redraw_at)
/// when to redraw and calls [`on_redraw`](Self::on_redraw) when it does.
#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    queue: Rc<RefCell<FrameQueue>>,
    origin: Instant,
    refresh_interval: Rc<Cell<Duration>>,
    last_redraw: Rc<Cell<Option<Instant>>>,
}

impl RedrawScheduler {
    pub fn new(refresh_rate_hz: f64) -> Self {
        Self {
            queue: Rc::new(RefCell::new(FrameQueue::new())),
            origin: Instant::now(),
            refresh_interval: Rc::new(Cell::new(refresh_interval_for(refresh_rate_hz))),
            last_redraw: Rc::new(Cell::new(None)),
        }
    }

    /// Re-paces redraws, e.g. once the window's monitor is known.
    pub fn set_refresh_rate(&self, refresh_rate_hz: f64) {
        self.refresh_interval.set(refresh_interval_for(refresh_rate_hz));
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval.get()
    }

    /// Milliseconds since the scheduler was created.
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// When the next redraw should happen, or `None` if nothing is pending.
    /// The first redraw is due immediately.
    pub fn next_redraw_at(&self) -> Option<Instant> {
        if self.queue.borrow().is_empty() {
            return None;
        }
        Some(match self.last_redraw.get() {
            Some(last) => last + self.refresh_interval.get(),
            None => self.origin,
        })
    }

    /// Fires the pending batch. Call on `RedrawRequested`.
    pub fn on_redraw(&self) -> usize {
        self.last_redraw.set(Some(Instant::now()));
        fire_pending(&self.queue, self.now_ms())
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.queue.borrow_mut().push(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.borrow_mut().cancel(handle);
    }
}

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.host.title.clone())
        .with_inner_size(LogicalSize::new(
            f64::from(config.host.window_width),
            f64::from(config.host.window_height),
        ))
}

struct WindowedApp {
    config: Config,
    game_loop: Loop<RedrawScheduler>,
    window: Option<Arc<Window>>,
    deadline: Option<Instant>,
    error: Option<AppError>,
}

impl WindowedApp {
    fn new(config: Config, demo: &Demo) -> Self {
        let game_loop = demo
            .install(LoopBuilder::new().options(loop_options(&config)))
            .build(RedrawScheduler::new(config.host.refresh_rate_hz));
        let deadline = Duration::try_from_secs_f64(config.host.run_seconds)
            .ok()
            .filter(|limit| !limit.is_zero())
            .map(|limit| Instant::now() + limit);

        Self {
            config,
            game_loop,
            window: None,
            deadline,
            error: None,
        }
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        self.game_loop.stop();
        event_loop.exit();
    }
}

impl ApplicationHandler for WindowedApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let attrs = window_attributes_from_config(&self.config);
            let window = match event_loop.create_window(attrs) {
                Ok(window) => Arc::new(window),
                Err(e) => {
                    error!("Window creation failed: {e}");
                    self.error = Some(e.into());
                    event_loop.exit();
                    return;
                }
            };

            // Monitors that report no rate keep the configured one.
            if let Some(millihertz) = window
                .current_monitor()
                .and_then(|monitor| monitor.refresh_rate_millihertz())
            {
                self.game_loop
                    .scheduler()
                    .set_refresh_rate(f64::from(millihertz) / 1000.0);
            }

            let size = window.inner_size();
            info!(
                width = size.width,
                height = size.height,
                scale = window.scale_factor(),
                refresh_interval_ms =
                    self.game_loop.scheduler().refresh_interval().as_secs_f64() * 1000.0,
                "window created"
            );
            self.window = Some(window);
        }
        self.game_loop.start();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        info!("suspended, pausing loop");
        self.game_loop.stop();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.shut_down(event_loop);
            }
            WindowEvent::RedrawRequested => {
                self.game_loop.scheduler().on_redraw();
                if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    info!("run time elapsed, shutting down");
                    self.shut_down(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = &self.window else {
            return;
        };
        match self.game_loop.scheduler().next_redraw_at() {
            Some(due) if due <= Instant::now() => {
                window.request_redraw();
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            Some(due) => event_loop.set_control_flow(ControlFlow::WaitUntil(due)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

/// Opens a window and drives `demo` from its redraw cycle until the window
/// closes or `run_seconds` elapse. Returns the loop's counters.
#[instrument(skip_all)]
pub fn run_windowed(config: &Config, demo: &Demo) -> Result<LoopStats, AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = WindowedApp::new(config.clone(), demo);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.error.take() {
        return Err(e);
    }
    let stats = app.game_loop.stats();
    info!(frames = stats.frames, updates = stats.updates, "window closed");
    Ok(stats)
}
