//! The frame-scheduling seam between a [`Loop`](crate::Loop) and its host.
//!
//! A host exposes "run this callback before the next repaint, passing a
//! monotonic millisecond timestamp" and "forget a callback requested earlier".
//! [`FrameQueue`] holds the bookkeeping every host needs; [`ManualScheduler`]
//! is the clock-controlled host used by tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// One-shot callback receiving the host timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Opaque handle to a pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Raw id, unique per scheduler.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// A display-synchronized, one-shot frame request primitive.
///
/// Schedulers are shared between the loop and the callbacks it re-arms, so
/// both methods take `&self` and implementations use interior mutability.
/// Neither method may invoke a callback synchronously.
pub trait FrameScheduler {
    /// Schedules `callback` to run on the next frame and returns its handle.
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Cancels a pending request. Unknown or already-fired handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

impl<S: FrameScheduler + ?Sized> FrameScheduler for Rc<S> {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        (**self).request_frame(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        (**self).cancel_frame(handle)
    }
}

/// Pending frame callbacks in request order.
///
/// Handles increase monotonically, so the handle a queue would assign next
/// works as a watermark separating the current batch from requests made
/// while that batch is firing.
#[derive(Default)]
pub struct FrameQueue {
    next_id: u64,
    pending: VecDeque<(FrameHandle, FrameCallback)>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a callback and returns its handle.
    pub fn push(&mut self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending.push_back((handle, callback));
        handle
    }

    /// Removes a pending callback. Returns `false` if it was not pending.
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        match self.pending.iter().position(|(h, _)| *h == handle) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: FrameHandle) -> bool {
        self.pending.iter().any(|(h, _)| *h == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The handle the next [`push`](Self::push) will return.
    pub fn watermark(&self) -> FrameHandle {
        FrameHandle(self.next_id)
    }

    /// Pops the oldest callback requested before `watermark`.
    pub fn pop_before(&mut self, watermark: FrameHandle) -> Option<FrameCallback> {
        match self.pending.front() {
            Some((handle, _)) if *handle < watermark => {
                self.pending.pop_front().map(|(_, callback)| callback)
            }
            _ => None,
        }
    }
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("next_id", &self.next_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Fires every callback pending in `queue` at the time of the call.
///
/// Callbacks run one at a time with no borrow of the queue held, so they may
/// request or cancel frames freely. Requests made during the batch wait for
/// the next one; cancellations of not-yet-run batch members take effect.
/// Returns the number of callbacks run.
pub fn fire_pending(queue: &RefCell<FrameQueue>, timestamp: f64) -> usize {
    let watermark = queue.borrow().watermark();
    let mut fired = 0;
    loop {
        let next = queue.borrow_mut().pop_before(watermark);
        let Some(callback) = next else { break };
        callback(timestamp);
        fired += 1;
    }
    fired
}

/// Host whose frames fire only when the caller says so.
///
/// Clones share one queue: keep a clone, hand another to the loop, then
/// [`fire`](Self::fire) synthetic timestamps.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<FrameQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs all currently pending callbacks with `timestamp`.
    pub fn fire(&self, timestamp: f64) -> usize {
        fire_pending(&self.queue, timestamp)
    }

    /// Fires one frame per timestamp, in order. Returns the callbacks run.
    pub fn fire_all(&self, timestamps: impl IntoIterator<Item = f64>) -> usize {
        timestamps.into_iter().map(|ts| self.fire(ts)).sum()
    }

    /// Number of outstanding requests.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.queue.borrow().contains(handle)
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.queue.borrow_mut().push(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.borrow_mut().cancel(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_handles_are_unique() {
        let scheduler = ManualScheduler::new();
        let a = scheduler.request_frame(Box::new(|_| {}));
        let b = scheduler.request_frame(Box::new(|_| {}));
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(b.id(), a.id() + 1);
        assert_eq!(scheduler.pending(), 2);
    }

    #[test]
    fn test_fire_passes_timestamp() {
        let scheduler = ManualScheduler::new();
        let seen = Rc::new(Cell::new(0.0));
        let seen2 = seen.clone();
        scheduler.request_frame(Box::new(move |ts| seen2.set(ts)));
        assert_eq!(scheduler.fire(42.5), 1);
        assert!((seen.get() - 42.5).abs() < f64::EPSILON);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancel_removes_request() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        let handle = scheduler.request_frame(Box::new(move |_| ran2.set(true)));
        assert!(scheduler.is_pending(handle));
        scheduler.cancel_frame(handle);
        assert!(!scheduler.is_pending(handle));
        assert_eq!(scheduler.fire(1.0), 0);
        assert!(!ran.get());
    }

    #[test]
    fn test_cancel_unknown_handle_is_noop() {
        let scheduler = ManualScheduler::new();
        let handle = scheduler.request_frame(Box::new(|_| {}));
        scheduler.fire(0.0);
        scheduler.cancel_frame(handle);
        scheduler.cancel_frame(handle);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_requests_during_fire_wait_for_next_frame() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0u32));

        let inner_scheduler = scheduler.clone();
        let inner_count = count.clone();
        scheduler.request_frame(Box::new(move |_| {
            inner_count.set(inner_count.get() + 1);
            let again = inner_count.clone();
            inner_scheduler.request_frame(Box::new(move |_| again.set(again.get() + 1)));
        }));

        assert_eq!(scheduler.fire(0.0), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.fire(16.0), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_cancel_during_batch_skips_later_member() {
        let scheduler = ManualScheduler::new();
        let second_ran = Rc::new(Cell::new(false));
        let victim = Rc::new(Cell::new(None));

        let canceller = scheduler.clone();
        let victim_slot = victim.clone();
        scheduler.request_frame(Box::new(move |_| {
            if let Some(handle) = victim_slot.get() {
                canceller.cancel_frame(handle);
            }
        }));
        let flag = second_ran.clone();
        let handle = scheduler.request_frame(Box::new(move |_| flag.set(true)));
        victim.set(Some(handle));

        assert_eq!(scheduler.fire(0.0), 1);
        assert!(!second_ran.get());
    }

    #[test]
    fn test_rc_scheduler_forwards() {
        let scheduler = Rc::new(ManualScheduler::new());
        let handle = scheduler.request_frame(Box::new(|_| {}));
        assert!(scheduler.is_pending(handle));
        FrameScheduler::cancel_frame(&scheduler, handle);
        assert_eq!(scheduler.pending(), 0);
    }
}
