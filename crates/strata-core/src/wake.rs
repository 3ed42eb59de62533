//! Wake signalling for locally polled futures.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

struct FlagWaker {
    woken: AtomicBool,
}

impl futures_task::ArcWake for FlagWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.woken.store(true, Ordering::Release);
    }
}

/// A waker that raises a flag instead of scheduling a task.
///
/// Hosts poll pending futures from their own loop and check [`WakeFlag::is_raised`]
/// to decide whether another poll is worth it.
#[derive(Clone)]
pub struct WakeFlag {
    inner: Arc<FlagWaker>,
    waker: Waker,
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeFlag {
    pub fn new() -> Self {
        let inner = Arc::new(FlagWaker {
            woken: AtomicBool::new(false),
        });
        let waker = futures_task::waker(Arc::clone(&inner));
        Self { inner, waker }
    }

    pub fn waker(&self) -> &Waker {
        &self.waker
    }

    pub fn raise(&self) {
        self.inner.woken.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.inner.woken.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.inner.woken.swap(false, Ordering::AcqRel)
    }

    /// Poll `future` once with this flag's waker.
    pub fn poll<F>(&self, future: Pin<&mut F>) -> Poll<F::Output>
    where
        F: Future + ?Sized,
    {
        let mut cx = Context::from_waker(&self.waker);
        future.poll(&mut cx)
    }
}
