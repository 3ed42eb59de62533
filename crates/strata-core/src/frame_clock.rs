use crate::platform::{FrameCallbackId, FrameScheduler};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

struct FrameCallbackEntry {
    id: FrameCallbackId,
    callback: Option<Box<dyn FnOnce(u64) + 'static>>,
}

struct ClockInner {
    callbacks: RefCell<VecDeque<FrameCallbackEntry>>,
    next_callback_id: Cell<u64>,
    frame_time_nanos: Cell<u64>,
    frames: Cell<u64>,
}

/// Frame scheduler driven explicitly by the host.
///
/// Callbacks registered while a frame is being drained run on the following
/// frame, matching `requestAnimationFrame`.
#[derive(Clone)]
pub struct ManualFrameClock {
    inner: Rc<ClockInner>,
}

impl Default for ManualFrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualFrameClock {
    /// Nominal 60Hz frame interval.
    pub const FRAME_INTERVAL_NANOS: u64 = 16_666_667;

    pub fn new() -> Self {
        Self {
            inner: Rc::new(ClockInner {
                callbacks: RefCell::new(VecDeque::new()),
                next_callback_id: Cell::new(1),
                frame_time_nanos: Cell::new(0),
                frames: Cell::new(0),
            }),
        }
    }

    pub fn has_pending_frames(&self) -> bool {
        !self.inner.callbacks.borrow().is_empty()
    }

    pub fn pending_callbacks(&self) -> usize {
        self.inner.callbacks.borrow().len()
    }

    pub fn frame_time_nanos(&self) -> u64 {
        self.inner.frame_time_nanos.get()
    }

    /// Number of frames produced so far.
    pub fn frames(&self) -> u64 {
        self.inner.frames.get()
    }

    /// Advance by one nominal frame interval and drain callbacks.
    pub fn advance_frame(&self) -> usize {
        let time = self.inner.frame_time_nanos.get() + Self::FRAME_INTERVAL_NANOS;
        self.drain_frame_callbacks(time)
    }

    /// Run every callback that was registered before this call.
    ///
    /// Returns the number of callbacks that ran.
    pub fn drain_frame_callbacks(&self, frame_time_nanos: u64) -> usize {
        self.inner.frame_time_nanos.set(frame_time_nanos);
        self.inner.frames.set(self.inner.frames.get() + 1);
        let mut callbacks = self.inner.callbacks.borrow_mut();
        let mut pending: Vec<Box<dyn FnOnce(u64) + 'static>> = Vec::with_capacity(callbacks.len());
        while let Some(mut entry) = callbacks.pop_front() {
            if let Some(callback) = entry.callback.take() {
                pending.push(callback);
            }
        }
        drop(callbacks);
        let count = pending.len();
        if count > 0 {
            log::trace!(
                "Frame {} at {}ns: {} callbacks",
                self.inner.frames.get(),
                frame_time_nanos,
                count
            );
        }
        for callback in pending {
            callback(frame_time_nanos);
        }
        count
    }
}

impl FrameScheduler for ManualFrameClock {
    fn request_frame(&self, callback: Box<dyn FnOnce(u64) + 'static>) -> FrameCallbackId {
        let id = self.inner.next_callback_id.get();
        self.inner.next_callback_id.set(id + 1);
        self.inner
            .callbacks
            .borrow_mut()
            .push_back(FrameCallbackEntry {
                id,
                callback: Some(callback),
            });
        id
    }

    fn cancel_frame(&self, id: FrameCallbackId) {
        let mut callbacks = self.inner.callbacks.borrow_mut();
        if let Some(index) = callbacks.iter().position(|entry| entry.id == id) {
            callbacks.remove(index);
        }
    }
}
