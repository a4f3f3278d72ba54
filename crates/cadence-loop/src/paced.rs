//! Headless host that emulates a display refreshing at a fixed rate.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::scheduler::{FrameCallback, FrameHandle, FrameQueue, FrameScheduler, fire_pending};

/// Refresh rate used when an invalid one is supplied.
const FALLBACK_REFRESH_HZ: f64 = 60.0;

/// Time between vsyncs of a display refreshing at `refresh_rate_hz`.
///
/// Rates that are not finite, not positive, or too high to give a non-zero
/// interval fall back to 60 Hz.
pub fn refresh_interval_for(refresh_rate_hz: f64) -> Duration {
    Some(refresh_rate_hz)
        .filter(|hz| hz.is_finite() && *hz > 0.0)
        .and_then(|hz| Duration::try_from_secs_f64(1.0 / hz).ok())
        .filter(|interval| !interval.is_zero())
        .unwrap_or_else(|| {
            warn!(refresh_rate_hz, "Invalid refresh rate, using {FALLBACK_REFRESH_HZ} Hz");
            Duration::from_secs_f64(1.0 / FALLBACK_REFRESH_HZ)
        })
}

/// A [`FrameScheduler`] that fires pending callbacks on a fixed vsync grid,
/// sleeping the calling thread in between.
///
/// Timestamps are milliseconds since the scheduler was created. Like a real
/// display, vsyncs missed while a frame overran are skipped rather than
/// replayed.
#[derive(Debug, Clone)]
pub struct PacedScheduler {
    queue: Rc<RefCell<FrameQueue>>,
    origin: Instant,
    refresh_interval: Duration,
}

impl PacedScheduler {
    pub fn new(refresh_rate_hz: f64) -> Self {
        Self {
            queue: Rc::new(RefCell::new(FrameQueue::new())),
            origin: Instant::now(),
            refresh_interval: refresh_interval_for(refresh_rate_hz),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Milliseconds elapsed since the scheduler was created.
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs the refresh cycle until nothing is pending or, if `limit` is
    /// given, until that much time has passed since the scheduler was
    /// created. Returns the number of vsyncs that fired callbacks.
    pub fn run_for(&self, limit: Option<Duration>) -> u64 {
        let mut next_vsync = Instant::now() + self.refresh_interval;
        let mut vsyncs = 0;

        while !self.queue.borrow().is_empty() {
            if let Some(limit) = limit
                && next_vsync.duration_since(self.origin) > limit
            {
                debug!(vsyncs, "paced host reached its run limit");
                break;
            }

            let now = Instant::now();
            if next_vsync > now {
                std::thread::sleep(next_vsync - now);
            } else {
                while next_vsync + self.refresh_interval <= now {
                    next_vsync += self.refresh_interval;
                    trace!("skipped a vsync");
                }
            }

            fire_pending(&self.queue, self.now_ms());
            vsyncs += 1;
            next_vsync += self.refresh_interval;
        }

        vsyncs
    }
}

impl FrameScheduler for PacedScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.queue.borrow_mut().push(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.borrow_mut().cancel(handle);
    }
}
