//! Derived values cached per store revision.

use crate::store::Store;
use std::cell::{Cell, RefCell};

/// Tolerance used for pixel-valued memos. Differences below this are noise.
pub const PIXELS_EPS: f32 = 0.01;

/// Returns true when `a` and `b` differ by no more than `eps`.
#[inline]
pub fn within_epsilon(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

/// Equality policy comparing floats within `eps`.
pub fn equals_epsilon(eps: f32) -> impl Fn(&f32, &f32) -> bool {
    move |a, b| within_epsilon(*a, *b, eps)
}

/// Caches a value derived from a [`Store`].
///
/// The derivation reruns only when the store revision moves. When the new
/// value is equal to the cached one under the memo's equality policy, the
/// cached value is kept and [`Memo::changes`] does not advance.
pub struct Memo<T> {
    value: RefCell<Option<T>>,
    revision: Cell<Option<u64>>,
    changes: Cell<u64>,
    equals: Box<dyn Fn(&T, &T) -> bool>,
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
    pub fn new() -> Self {
        Self::with_equality(|a: &T, b: &T| a == b)
    }
}

impl<T: Clone + PartialEq + 'static> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Memo<T> {
    pub fn with_equality(equals: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            value: RefCell::new(None),
            revision: Cell::new(None),
            changes: Cell::new(0),
            equals: Box::new(equals),
        }
    }

    /// Returns the memoized value, recomputing it if `store` changed since the
    /// last call.
    pub fn get<S>(&self, store: &Store<S>, compute: impl FnOnce(&S) -> T) -> T {
        let revision = store.revision();
        if self.revision.get() == Some(revision) {
            if let Some(value) = self.value.borrow().as_ref() {
                return value.clone();
            }
        }
        let fresh = store.with(compute);
        self.revision.set(Some(revision));
        let mut slot = self.value.borrow_mut();
        match slot.as_ref() {
            Some(current) if (self.equals)(current, &fresh) => current.clone(),
            _ => {
                self.changes.set(self.changes.get() + 1);
                *slot = Some(fresh.clone());
                fresh
            }
        }
    }

    /// Number of times the memoized value actually changed.
    pub fn changes(&self) -> u64 {
        self.changes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_epsilon() {
        assert!(within_epsilon(10.0, 10.005, PIXELS_EPS));
        assert!(!within_epsilon(10.0, 10.02, PIXELS_EPS));
    }

    #[test]
    fn test_memo_recomputes_on_revision() {
        let store = Store::new(2);
        let memo = Memo::new();
        let computed = Cell::new(0);

        let double = |value: &i32| {
            computed.set(computed.get() + 1);
            value * 2
        };
        assert_eq!(memo.get(&store, double), 4);
        assert_eq!(memo.get(&store, double), 4);
        assert_eq!(computed.get(), 1);

        store.update(|value| *value = 3);
        assert_eq!(memo.get(&store, double), 6);
        assert_eq!(computed.get(), 2);
    }

    #[test]
    fn test_memo_keeps_value_within_epsilon() {
        let store = Store::new(100.0_f32);
        let memo = Memo::with_equality(equals_epsilon(PIXELS_EPS));

        assert_eq!(memo.get(&store, |value| *value), 100.0);
        store.update(|value| *value = 100.004);
        assert_eq!(memo.get(&store, |value| *value), 100.0);
        assert_eq!(memo.changes(), 1);

        store.update(|value| *value = 101.0);
        assert_eq!(memo.get(&store, |value| *value), 101.0);
        assert_eq!(memo.changes(), 2);
    }
}
