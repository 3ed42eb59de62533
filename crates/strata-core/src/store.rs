//! Single-threaded reactive store.
//!
//! A [`Store`] owns one value and notifies subscribers after it changes.
//! Mutations made inside [`Store::batch`] are coalesced: subscribers run once,
//! after the outermost batch closes, and always observe the final value.

use smallvec::SmallVec;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier returned by [`Store::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Observer = Rc<dyn Fn()>;

struct StoreInner<T> {
    value: RefCell<T>,
    revision: Cell<u64>,
    batch_depth: Cell<usize>,
    dirty: Cell<bool>,
    observers: RefCell<SmallVec<[(SubscriptionId, Observer); 2]>>,
    next_subscription: Cell<u64>,
}

/// Shared handle to a reactive value.
///
/// Cloning the handle is cheap; all clones refer to the same value.
pub struct Store<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("value", &self.inner.value)
            .field("revision", &self.inner.revision.get())
            .finish()
    }
}

impl<T> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                value: RefCell::new(value),
                revision: Cell::new(0),
                batch_depth: Cell::new(0),
                dirty: Cell::new(false),
                observers: RefCell::new(SmallVec::new()),
                next_subscription: Cell::new(1),
            }),
        }
    }

    /// Run `f` with an immutable reference to the stored value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let borrow = self.inner.value.borrow();
        f(&borrow)
    }

    /// Borrow the stored value immutably.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.value.borrow()
    }

    /// Run `f` with a mutable reference and mark the store as changed.
    ///
    /// Subscribers are notified immediately unless a batch is open.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut borrow = self.inner.value.borrow_mut();
            f(&mut borrow)
        };
        self.inner.revision.set(self.inner.revision.get() + 1);
        self.inner.dirty.set(true);
        if self.inner.batch_depth.get() == 0 {
            self.flush();
        }
        result
    }

    /// Replace the stored value entirely.
    pub fn replace(&self, value: T) -> T {
        self.update(|slot| std::mem::replace(slot, value))
    }

    /// Group several updates so subscribers are notified once at the end.
    ///
    /// Batches nest; only the outermost one flushes.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let guard = BatchGuard::open(&self.inner);
        let result = f();
        drop(guard);
        if self.inner.batch_depth.get() == 0 {
            self.flush();
        }
        result
    }

    pub fn is_batching(&self) -> bool {
        self.inner.batch_depth.get() > 0
    }

    /// Monotonic counter bumped by every [`update`](Self::update).
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    pub fn subscribe(&self, observer: impl Fn() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn downgrade(&self) -> WeakStore<T> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn flush(&self) {
        if !self.inner.dirty.replace(false) {
            return;
        }
        // Clone the observer list so subscribers may subscribe, unsubscribe or
        // update the store while being notified.
        let observers: SmallVec<[Observer; 2]> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer();
        }
    }
}

/// Non-owning handle used from callbacks that must not keep the store alive.
pub struct WeakStore<T> {
    inner: Weak<StoreInner<T>>,
}

impl<T> Clone for WeakStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakStore<T> {
    pub fn upgrade(&self) -> Option<Store<T>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

struct BatchGuard<'a, T> {
    inner: &'a StoreInner<T>,
}

impl<'a, T> BatchGuard<'a, T> {
    fn open(inner: &'a StoreInner<T>) -> Self {
        inner.batch_depth.set(inner.batch_depth.get() + 1);
        Self { inner }
    }
}

impl<T> Drop for BatchGuard<'_, T> {
    fn drop(&mut self) {
        self.inner
            .batch_depth
            .set(self.inner.batch_depth.get().saturating_sub(1));
    }
}
