//! Fake data sources. Every source serves item indices as items.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use strata_foundation::virtual_list::{Fetch, FetchError, FetchResult, RangeDataSource, RangeRequest};

fn indices(range: RangeRequest, total: usize) -> Vec<usize> {
    (range.from.min(total)..range.end().min(total)).collect()
}

/// Answers every request immediately.
#[derive(Debug, Default)]
pub struct IndexSource {
    total: Cell<usize>,
    requests: RefCell<Vec<RangeRequest>>,
}

impl IndexSource {
    pub fn new(total: usize) -> Self {
        Self {
            total: Cell::new(total),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Change what later fetches see. The list learns about it through
    /// `VirtualList::set_total` or `refresh_total`.
    pub fn set_total(&self, total: usize) {
        self.total.set(total);
    }

    pub fn requests(&self) -> Vec<RangeRequest> {
        self.requests.borrow().clone()
    }
}

impl RangeDataSource<usize> for IndexSource {
    fn fetch(&self, range: RangeRequest) -> Fetch<Vec<usize>> {
        self.requests.borrow_mut().push(range);
        Fetch::ready(indices(range, self.total.get()))
    }

    fn fetch_total(&self) -> Fetch<usize> {
        Fetch::ready(self.total.get())
    }
}

struct Gate<V> {
    value: RefCell<Option<FetchResult<V>>>,
    waker: RefCell<Option<Waker>>,
}

impl<V> Gate<V> {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(None),
            waker: RefCell::new(None),
        })
    }

    fn open(&self, value: FetchResult<V>) {
        *self.value.borrow_mut() = Some(value);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

struct GateFuture<V>(Rc<Gate<V>>);

impl<V> Future for GateFuture<V> {
    type Output = FetchResult<V>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.0.value.borrow_mut().take() {
            Some(value) => Poll::Ready(value),
            None => {
                *self.0.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// Holds every fetch open until the test resolves it.
pub struct DeferredSource {
    total: Cell<usize>,
    pending: RefCell<Vec<(RangeRequest, Rc<Gate<Vec<usize>>>)>>,
    pending_total: RefCell<Option<Rc<Gate<usize>>>>,
    defer_total: bool,
}

impl DeferredSource {
    pub fn new(total: usize) -> Self {
        Self {
            total: Cell::new(total),
            pending: RefCell::new(Vec::new()),
            pending_total: RefCell::new(None),
            defer_total: false,
        }
    }

    /// Hold the total count open as well, until [`resolve_total`](Self::resolve_total).
    pub fn with_deferred_total(mut self) -> Self {
        self.defer_total = true;
        self
    }

    pub fn pending(&self) -> Vec<RangeRequest> {
        self.pending.borrow().iter().map(|(range, _)| *range).collect()
    }

    /// Complete the oldest open fetch. Returns its range.
    pub fn resolve_next(&self) -> Option<RangeRequest> {
        let (range, gate) = {
            let mut pending = self.pending.borrow_mut();
            if pending.is_empty() {
                return None;
            }
            pending.remove(0)
        };
        gate.open(Ok(indices(range, self.total.get())));
        Some(range)
    }

    /// Complete every open fetch. Returns how many were resolved.
    pub fn resolve_all(&self) -> usize {
        let drained: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for (range, gate) in &drained {
            gate.open(Ok(indices(*range, self.total.get())));
        }
        drained.len()
    }

    /// Fail every open fetch with `message`.
    pub fn fail_all(&self, message: &str) -> usize {
        let drained: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for (_, gate) in &drained {
            gate.open(Err(FetchError::new(message)));
        }
        drained.len()
    }

    pub fn resolve_total(&self) -> bool {
        match self.pending_total.borrow_mut().take() {
            Some(gate) => {
                gate.open(Ok(self.total.get()));
                true
            }
            None => false,
        }
    }
}

impl RangeDataSource<usize> for DeferredSource {
    fn fetch(&self, range: RangeRequest) -> Fetch<Vec<usize>> {
        let gate = Gate::new();
        self.pending.borrow_mut().push((range, Rc::clone(&gate)));
        Fetch::pending(GateFuture(gate))
    }

    fn fetch_total(&self) -> Fetch<usize> {
        if !self.defer_total {
            return Fetch::ready(self.total.get());
        }
        let gate = Gate::new();
        *self.pending_total.borrow_mut() = Some(Rc::clone(&gate));
        Fetch::pending(GateFuture(gate))
    }
}

/// Fails every fetch until [`recover`](Self::recover) is called.
#[derive(Debug)]
pub struct FailingSource {
    total: usize,
    failing: Cell<bool>,
    attempts: Cell<usize>,
}

impl FailingSource {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            failing: Cell::new(true),
            attempts: Cell::new(0),
        }
    }

    pub fn recover(&self) {
        self.failing.set(false);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

impl RangeDataSource<usize> for FailingSource {
    fn fetch(&self, range: RangeRequest) -> Fetch<Vec<usize>> {
        self.attempts.set(self.attempts.get() + 1);
        if self.failing.get() {
            return Fetch::failed(FetchError::new(format!(
                "range [{}..{}) unavailable",
                range.from,
                range.end()
            )));
        }
        Fetch::ready(indices(range, self.total))
    }

    fn fetch_total(&self) -> Fetch<usize> {
        Fetch::ready(self.total)
    }
}
