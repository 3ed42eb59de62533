//! Runtime primitives shared by the Strata crates.
//!
//! Everything here is single-threaded: handles are `Rc`-based and callbacks
//! are plain closures. The only `Send` piece is the waker inside
//! [`WakeFlag`], which futures may carry across threads.

pub mod collections;
mod frame_clock;
mod memo;
mod platform;
mod store;
mod wake;

pub use frame_clock::ManualFrameClock;
pub use memo::{equals_epsilon, within_epsilon, Memo, PIXELS_EPS};
pub use platform::{FrameCallbackId, FrameScheduler};
pub use store::{Store, SubscriptionId, WeakStore};
pub use wake::WakeFlag;
