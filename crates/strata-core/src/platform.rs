//! Platform abstraction traits for frame scheduling.
//!
//! The list engine never talks to a windowing system directly. Hosts hand it a
//! [`FrameScheduler`] that runs callbacks on the next animation frame, which
//! lets the same engine run inside a browser-like host, a native event loop or
//! a deterministic test clock.

pub type FrameCallbackId = u64;

/// Runs callbacks once, on the next frame.
pub trait FrameScheduler {
    /// Register `callback` for the next frame. The callback receives the frame
    /// time in nanoseconds.
    fn request_frame(&self, callback: Box<dyn FnOnce(u64) + 'static>) -> FrameCallbackId;

    /// Cancel a callback that has not run yet. Unknown ids are ignored.
    fn cancel_frame(&self, id: FrameCallbackId);
}
