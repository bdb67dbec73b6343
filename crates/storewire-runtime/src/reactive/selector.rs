#![forbid(unsafe_code)]

//! Derived values that only propagate real changes.
//!
//! A [`SelectorBinding<T>`] evaluates `selector(&state)` once at bind time and
//! again after every store notification. The comparator decides whether the
//! new derived value is "the same" as the held one; if so, nothing happens.
//! Otherwise the held value is replaced and every `on_change` callback runs
//! with the new value.
//!
//! # Invariants
//!
//! 1. `value()` is always the last derived value the comparator accepted as
//!    a change (or the initial one).
//! 2. Callbacks run at most once per store notification.
//! 3. After `dispose()` (or dropping the last handle) the selector is never
//!    evaluated again.
//!
//! # Failure Modes
//!
//! - Selector panics: propagates to whoever dispatched; the held value is
//!   unchanged because it is only replaced after the selector returned.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::store::Store;
use super::subscription::Subscription;

type ChangeCallback<T> = Rc<dyn Fn(&T)>;

struct SelectorShared<T> {
    value: RefCell<Rc<T>>,
    callbacks: RefCell<Vec<ChangeCallback<T>>>,
    changes: Cell<u64>,
    subscription: RefCell<Option<Subscription>>,
}

/// A memoized projection of store state.
///
/// Clones share the same binding. The store subscription is released by
/// [`dispose`](Self::dispose) or when the last clone is dropped.
pub struct SelectorBinding<T> {
    shared: Rc<SelectorShared<T>>,
}

impl<T> Clone for SelectorBinding<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

/// Bind `selector` with `PartialEq` change detection.
///
/// A selector that returns a structurally equal value does not fire, even
/// when the value was rebuilt. For reference identity, return an `Rc` and
/// bind with [`bind_selector_with`] and [`same_rc`].
pub fn bind_selector<S, T>(
    store: &Store<S>,
    selector: impl Fn(&S) -> T + 'static,
) -> SelectorBinding<T>
where
    S: Clone + PartialEq + 'static,
    T: PartialEq + 'static,
{
    SelectorBinding::new(store, selector)
}

/// Bind `selector` with a custom comparator (`true` means unchanged).
pub fn bind_selector_with<S, T>(
    store: &Store<S>,
    selector: impl Fn(&S) -> T + 'static,
    compare: impl Fn(&T, &T) -> bool + 'static,
) -> SelectorBinding<T>
where
    S: Clone + PartialEq + 'static,
    T: 'static,
{
    SelectorBinding::with_compare(store, selector, compare)
}

impl<T: 'static> SelectorBinding<T> {
    /// Bind with `PartialEq` change detection.
    pub fn new<S>(store: &Store<S>, selector: impl Fn(&S) -> T + 'static) -> Self
    where
        S: Clone + PartialEq + 'static,
        T: PartialEq,
    {
        Self::with_compare(store, selector, |a: &T, b: &T| a == b)
    }

    /// Bind with a custom comparator. `compare(previous, next)` returning
    /// `true` suppresses the change.
    pub fn with_compare<S>(
        store: &Store<S>,
        selector: impl Fn(&S) -> T + 'static,
        compare: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self
    where
        S: Clone + PartialEq + 'static,
    {
        let initial = selector(&store.state());
        let shared = Rc::new(SelectorShared {
            value: RefCell::new(Rc::new(initial)),
            callbacks: RefCell::new(Vec::new()),
            changes: Cell::new(0),
            subscription: RefCell::new(None),
        });

        let weak: Weak<SelectorShared<T>> = Rc::downgrade(&shared);
        let subscription = store.subscribe(move |state, _origin| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let next = selector(state);
            let previous = Rc::clone(&shared.value.borrow());
            if compare(&previous, &next) {
                return;
            }
            let next = Rc::new(next);
            *shared.value.borrow_mut() = Rc::clone(&next);
            shared.changes.set(shared.changes.get() + 1);
            let callbacks: Vec<ChangeCallback<T>> = shared.callbacks.borrow().clone();
            for callback in callbacks {
                callback(&next);
            }
        });
        *shared.subscription.borrow_mut() = Some(subscription);

        Self { shared }
    }

    /// The current derived value.
    #[must_use]
    pub fn value(&self) -> Rc<T> {
        Rc::clone(&self.shared.value.borrow())
    }

    /// Register a callback run with each accepted change.
    pub fn on_change(&self, callback: impl Fn(&T) + 'static) {
        self.shared.callbacks.borrow_mut().push(Rc::new(callback));
    }

    /// Number of accepted changes since binding.
    #[must_use]
    pub fn change_count(&self) -> u64 {
        self.shared.changes.get()
    }

    /// Whether the binding still listens to its store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared
            .subscription
            .borrow()
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Stop listening. The last value stays readable.
    pub fn dispose(&self) {
        let subscription = self.shared.subscription.borrow_mut().take();
        drop(subscription);
    }
}

impl<T: Clone + 'static> SelectorBinding<T> {
    /// A clone of the current derived value.
    #[must_use]
    pub fn get(&self) -> T {
        T::clone(&self.shared.value.borrow())
    }
}

impl<T: fmt::Debug> fmt::Debug for SelectorBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorBinding")
            .field("value", &self.shared.value.borrow())
            .field("changes", &self.shared.changes.get())
            .finish()
    }
}

/// Identity comparator for `Rc`-valued selectors.
#[must_use]
pub fn same_rc<T>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}
