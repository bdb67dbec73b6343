#![forbid(unsafe_code)]

//! Reactive state store for storewire.
//!
//! This module provides the change-tracking primitives UI bindings build on:
//!
//! - [`Store`]: holds the current immutable snapshot, applies recipes with
//!   [`Store::dispatch`], and notifies listeners with the dispatch's
//!   [`OriginTag`].
//! - [`produce`] / [`try_produce`]: the immutable updater. A recipe mutates a
//!   draft clone; the result is published as a new snapshot, or the current
//!   snapshot is returned by identity when nothing changed.
//! - [`Patch`]: the partial-assignment form of a recipe.
//! - [`Subscription`]: RAII guard that unregisters a listener on drop.
//! - [`SelectorBinding`]: a derived value that only signals its owner when
//!   the comparator reports a change.
//! - [`RenderCell`]: a selector whose derived value is rendered output.
//! - [`BindingScope`]: owns the bindings of a mounted subtree and releases
//!   them together.
//!
//! # Architecture
//!
//! `Store<S>` uses `Rc<..>` with `RefCell`/`Cell` interior mutability for
//! single-threaded shared ownership. Snapshots are `Rc<S>`; consumers never
//! get a mutable alias. Listeners are stored strongly with an activity flag
//! that the [`Subscription`] clears on release.
//!
//! # Invariants
//!
//! 1. A published snapshot is never mutated.
//! 2. Listeners are notified in registration order, all with the same
//!    snapshot and origin.
//! 3. The listener list is snapshotted per notification pass; a listener
//!    released mid-pass receives nothing further, a listener added mid-pass
//!    is not called for that pass.
//! 4. A failed or panicking recipe publishes nothing and notifies no one.
//! 5. `version()` increments exactly once per dispatch that changed state.

pub mod binding;
pub mod selector;
pub mod store;
pub mod subscription;
pub mod updater;

pub use binding::{BindingScope, Disposable, RenderCell};
pub use selector::{SelectorBinding, bind_selector, bind_selector_with, same_rc};
pub use store::{OriginTag, Store, create_store};
pub use subscription::Subscription;
pub use updater::{Patch, produce, try_produce};
