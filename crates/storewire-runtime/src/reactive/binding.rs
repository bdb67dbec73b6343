#![forbid(unsafe_code)]

//! Lifecycle utilities for bindings attached to mounted UI.
//!
//! [`BindingScope`] collects everything a mounted subtree registered with a
//! store (raw subscriptions, selector bindings, field bindings) and releases
//! it all when the subtree unmounts. [`RenderCell`] is a selector whose
//! derived value is rendered output, recomputed only when its comparator
//! reports a state change.
//!
//! # Usage
//!
//! ```
//! use storewire_core::Value;
//! use storewire_runtime::{BindingScope, Store};
//!
//! let store = Store::new(Value::from_pairs([("count", 0)]));
//! let mut scope = BindingScope::new();
//!
//! let count = scope.select(&store, |s: &Value| s.get("count").cloned());
//! scope.subscribe(&store, |state, _origin| println!("now {state}"));
//! assert_eq!(store.listener_count(), 2);
//!
//! drop(scope);
//! assert_eq!(store.listener_count(), 0);
//! assert_eq!(count.get(), Some(Value::from(0)));
//! ```
//!
//! # Invariants
//!
//! 1. Bindings are released in reverse registration order on drop.
//! 2. After drop, no callbacks from this scope will fire.
//! 3. `clear()` releases all bindings immediately (reusable scope).
//! 4. Binding count is always accurate.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::selector::{SelectorBinding, same_rc};
use super::store::{OriginTag, Store};
use super::subscription::Subscription;

/// Anything that holds a store registration and can release it.
pub trait Disposable {
    /// Release the registration. Calling twice is a no-op.
    fn dispose(&mut self);

    /// Whether the registration is still live.
    fn is_active(&self) -> bool;
}

impl Disposable for Subscription {
    fn dispose(&mut self) {
        self.release_now();
    }

    fn is_active(&self) -> bool {
        Subscription::is_active(self)
    }
}

impl<T: 'static> Disposable for SelectorBinding<T> {
    fn dispose(&mut self) {
        SelectorBinding::dispose(self);
    }

    fn is_active(&self) -> bool {
        SelectorBinding::is_active(self)
    }
}

/// Collects bindings for a logical scope (e.g. a mounted form).
///
/// When the scope is dropped, all held bindings are disposed, cleanly
/// disconnecting the scope from its stores.
pub struct BindingScope {
    bindings: Vec<Box<dyn Disposable>>,
}

impl BindingScope {
    /// Create an empty binding scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Hold a binding until the scope is dropped or cleared.
    pub fn hold(&mut self, binding: impl Disposable + 'static) -> &mut Self {
        self.bindings.push(Box::new(binding));
        self
    }

    /// Subscribe to a store within this scope.
    pub fn subscribe<S: Clone + PartialEq + 'static>(
        &mut self,
        store: &Store<S>,
        listener: impl Fn(&Rc<S>, Option<OriginTag>) + 'static,
    ) -> &mut Self {
        let sub = store.subscribe(listener);
        self.hold(sub)
    }

    /// Create a selector binding owned by this scope.
    ///
    /// The returned handle stays readable after the scope releases it.
    pub fn select<S, T>(
        &mut self,
        store: &Store<S>,
        selector: impl Fn(&S) -> T + 'static,
    ) -> SelectorBinding<T>
    where
        S: Clone + PartialEq + 'static,
        T: PartialEq + 'static,
    {
        let binding = SelectorBinding::new(store, selector);
        self.hold(binding.clone());
        binding
    }

    /// Number of bindings in this scope.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of bindings that are still live.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_active()).count()
    }

    /// Whether the scope has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Release all bindings immediately (scope becomes empty but reusable).
    pub fn clear(&mut self) {
        while let Some(mut binding) = self.bindings.pop() {
            binding.dispose();
        }
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.bindings.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RenderCell
// ---------------------------------------------------------------------------

struct RenderShared<R> {
    output: RefCell<Rc<R>>,
    renders: Cell<u64>,
}

/// Rendered output derived from the whole state.
///
/// The cell selects the entire snapshot and re-renders whenever the
/// comparator (snapshot identity by default) reports a change, so it only
/// does work after dispatches that actually produced a new snapshot.
pub struct RenderCell<S, R> {
    source: SelectorBinding<Rc<S>>,
    shared: Rc<RenderShared<R>>,
}

impl<S: Clone + PartialEq + 'static, R: 'static> RenderCell<S, R> {
    /// Render with snapshot-identity change detection.
    pub fn new(store: &Store<S>, render: impl Fn(&S) -> R + 'static) -> Self {
        Self::with_compare(store, render, |_: &S, _: &S| false)
    }

    /// Render with a custom state comparator (`true` means unchanged).
    ///
    /// Identical snapshots are always treated as unchanged.
    pub fn with_compare(
        store: &Store<S>,
        render: impl Fn(&S) -> R + 'static,
        compare: impl Fn(&S, &S) -> bool + 'static,
    ) -> Self {
        let snapshots = store.clone();
        let source = SelectorBinding::with_compare(
            store,
            move |_: &S| snapshots.state(),
            move |a: &Rc<S>, b: &Rc<S>| same_rc(a, b) || compare(a.as_ref(), b.as_ref()),
        );
        let initial = source.value();
        let shared = Rc::new(RenderShared {
            output: RefCell::new(Rc::new(render(&**initial))),
            renders: Cell::new(1),
        });
        let weak = Rc::downgrade(&shared);
        source.on_change(move |state: &Rc<S>| {
            if let Some(shared) = weak.upgrade() {
                let output = render(state.as_ref());
                *shared.output.borrow_mut() = Rc::new(output);
                shared.renders.set(shared.renders.get() + 1);
            }
        });
        Self { source, shared }
    }

    /// The latest rendered output.
    #[must_use]
    pub fn output(&self) -> Rc<R> {
        Rc::clone(&self.shared.output.borrow())
    }

    /// How many times the render function ran (including the initial render).
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.shared.renders.get()
    }
}

impl<S: 'static, R> Disposable for RenderCell<S, R> {
    fn dispose(&mut self) {
        self.source.dispose();
    }

    fn is_active(&self) -> bool {
        self.source.is_active()
    }
}

impl<S, R> fmt::Debug for RenderCell<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCell")
            .field("renders", &self.shared.renders.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storewire_core::Value;

    fn store() -> Store<Value> {
        Store::new(Value::from_pairs([("count", 0), ("label", 0)]))
    }

    fn bump(key: &'static str) -> impl FnOnce(&mut Value) {
        move |d: &mut Value| {
            let n = d.get(key).and_then(Value::as_f64).unwrap_or(0.0);
            d.insert(key, n + 1.0).unwrap();
        }
    }

    #[test]
    fn scope_holds_subscriptions() {
        let store = store();
        let seen = Rc::new(Cell::new(0));
        let mut scope = BindingScope::new();
        let s = Rc::clone(&seen);
        scope.subscribe(&store, move |_, _| s.set(s.get() + 1));
        assert_eq!(scope.binding_count(), 1);

        store.dispatch(bump("count"));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn scope_drop_releases_everything() {
        let store = store();
        let seen = Rc::new(Cell::new(0));
        let count;
        {
            let mut scope = BindingScope::new();
            let s = Rc::clone(&seen);
            scope.subscribe(&store, move |_, _| s.set(s.get() + 1));
            count = scope.select(&store, |st: &Value| st.get("count").cloned());
            store.dispatch(bump("count"));
            assert_eq!(seen.get(), 1);
        }
        store.dispatch(bump("count"));
        assert_eq!(
            seen.get(),
            1,
            "callback should not fire after scope dropped"
        );
        assert_eq!(
            count.get(),
            Some(Value::from(1)),
            "selector frozen at release"
        );
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn scope_releases_in_reverse_order() {
        let store = store();
        let order = Rc::new(RefCell::new(Vec::new()));
        struct Probe(u32, Rc<RefCell<Vec<u32>>>, bool);
        impl Disposable for Probe {
            fn dispose(&mut self) {
                if self.2 {
                    self.2 = false;
                    self.1.borrow_mut().push(self.0);
                }
            }
            fn is_active(&self) -> bool {
                self.2
            }
        }
        let mut scope = BindingScope::new();
        for i in 0..3 {
            scope.hold(Probe(i, Rc::clone(&order), true));
        }
        scope.subscribe(&store, |_, _| {});
        assert_eq!(scope.active_count(), 4);
        drop(scope);
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn scope_reusable_after_clear() {
        let store = store();
        let mut scope = BindingScope::new();

        let seen1 = Rc::new(Cell::new(false));
        let s1 = Rc::clone(&seen1);
        scope.subscribe(&store, move |_, _| s1.set(true));
        scope.clear();
        assert!(scope.is_empty());

        let seen2 = Rc::new(Cell::new(false));
        let s2 = Rc::clone(&seen2);
        scope.subscribe(&store, move |_, _| s2.set(true));

        store.dispatch(bump("count"));
        assert!(!seen1.get(), "first subscription should be gone");
        assert!(seen2.get(), "second subscription should be active");
    }

    #[test]
    fn scope_debug_format() {
        let store = store();
        let mut scope = BindingScope::new();
        scope.subscribe(&store, |_, _| {});
        scope.subscribe(&store, |_, _| {});
        let debug = format!("{scope:?}");
        assert!(debug.contains("binding_count: 2"));
    }

    #[test]
    fn render_cell_skips_no_op_dispatch() {
        let store = store();
        let cell =
            RenderCell::new(&store, |s: &Value| format!("count={}", s.get("count").unwrap()));
        assert_eq!(*cell.output(), "count=0");
        assert_eq!(cell.render_count(), 1);

        store.dispatch(|_| {});
        assert_eq!(cell.render_count(), 1);

        store.dispatch(bump("count"));
        assert_eq!(*cell.output(), "count=1");
        assert_eq!(cell.render_count(), 2);
    }

    #[test]
    fn render_cell_custom_compare() {
        let store = store();
        let cell = RenderCell::with_compare(
            &store,
            |s: &Value| s.get("count").cloned().unwrap_or_default().to_display_string(),
            |a: &Value, b: &Value| a.get("count") == b.get("count"),
        );
        store.dispatch(bump("label"));
        assert_eq!(cell.render_count(), 1);
        store.dispatch(bump("count"));
        assert_eq!(cell.render_count(), 2);
        assert_eq!(*cell.output(), "1");
    }

    #[test]
    fn render_cell_in_scope() {
        let store = store();
        let mut scope = BindingScope::new();
        scope.hold(RenderCell::new(&store, |s: &Value| s.len()));
        assert_eq!(store.listener_count(), 1);
        scope.clear();
        assert_eq!(store.listener_count(), 0);
    }
}
