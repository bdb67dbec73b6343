#![forbid(unsafe_code)]

//! The state store.
//!
//! A [`Store<S>`] owns the current snapshot of an application state and is
//! its only writer. Writes go through recipes (see
//! [`updater`](super::updater)); every completed dispatch publishes a new
//! snapshot and then synchronously notifies all listeners in registration
//! order with `(snapshot, origin)`.
//!
//! # Usage
//!
//! ```
//! use storewire_core::Value;
//! use storewire_runtime::Store;
//!
//! let store = Store::new(Value::from_pairs([("count", 0)]));
//! let _sub = store.subscribe(|state, _origin| {
//!     assert_eq!(state.get("count"), Some(&Value::from(1)));
//! });
//! store.dispatch(|draft| {
//!     draft.insert("count", 1).unwrap();
//! });
//! assert_eq!(store.state().get("count"), Some(&Value::from(1)));
//! ```
//!
//! # Origin tags
//!
//! Bindings that both write to and listen on the store mint an
//! [`OriginTag`] with [`Store::origin_tag`] and pass it to the tagged
//! dispatch methods. Listeners receive the tag and skip notifications they
//! caused themselves.
//!
//! # Failure Modes
//!
//! - Recipe returns `Err`: the error is returned to the caller, nothing is
//!   published, no listener runs.
//! - Recipe panics: the panic unwinds through `dispatch`; no borrow is held
//!   while the recipe runs, so the store stays usable with its prior
//!   snapshot.
//! - Listener panics: propagates to the `dispatch` caller; the new snapshot is
//!   already published and listeners after the panicking one are skipped.
//! - Recipe dispatches: unsupported. The nested dispatch publishes and
//!   notifies, then the outer dispatch overwrites it with its own draft. This
//!   is logged at `warn` but not prevented.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::fmt;
use std::rc::{Rc, Weak};

use storewire_core::{PathError, Record};
use tracing::{debug, trace, warn};

use super::subscription::Subscription;
use super::updater::{self, Patch};

/// Identifies the binding that caused a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OriginTag(u64);

impl OriginTag {
    /// Raw tag value, unique within its store.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "origin#{}", self.0)
    }
}

type Listener<S> = dyn Fn(&Rc<S>, Option<OriginTag>);

struct ListenerEntry<S> {
    id: u64,
    active: Rc<Cell<bool>>,
    callback: Rc<Listener<S>>,
}

impl<S> Clone for ListenerEntry<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Rc::clone(&self.active),
            callback: Rc::clone(&self.callback),
        }
    }
}

struct StoreInner<S> {
    state: RefCell<Rc<S>>,
    listeners: RefCell<Vec<ListenerEntry<S>>>,
    next_listener: Cell<u64>,
    next_origin: Cell<u64>,
    version: Cell<u64>,
    in_recipe: Cell<bool>,
}

/// Shared handle to a state store. Clones refer to the same store.
pub struct Store<S> {
    inner: Rc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Create an independent store holding `initial`.
pub fn create_store<S: Clone + PartialEq + 'static>(initial: S) -> Store<S> {
    Store::new(initial)
}

impl<S: Clone + PartialEq + 'static> Store<S> {
    /// Create an independent store holding `initial`.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(initial)),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                next_origin: Cell::new(1),
                version: Cell::new(0),
                in_recipe: Cell::new(false),
            }),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn state(&self) -> Rc<S> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Number of dispatches that changed the state.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Mint a fresh origin tag for a binding of this store.
    pub fn origin_tag(&self) -> OriginTag {
        let id = self.inner.next_origin.get();
        self.inner.next_origin.set(id + 1);
        OriginTag(id)
    }

    /// Whether `self` and `other` are handles to the same store.
    #[must_use]
    pub fn same_store(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Apply `recipe` and notify listeners without an origin.
    pub fn dispatch(&self, recipe: impl FnOnce(&mut S)) {
        self.dispatch_with(recipe, None);
    }

    /// Apply `recipe` and notify listeners with `origin`.
    pub fn dispatch_tagged(&self, recipe: impl FnOnce(&mut S), origin: OriginTag) {
        self.dispatch_with(recipe, Some(origin));
    }

    /// Apply `recipe` and notify listeners with an optional origin.
    pub fn dispatch_with(&self, recipe: impl FnOnce(&mut S), origin: Option<OriginTag>) {
        let result: Result<(), Infallible> = self.try_dispatch(
            |draft| {
                recipe(draft);
                Ok(())
            },
            origin,
        );
        if let Err(never) = result {
            match never {}
        }
    }

    /// Apply a fallible recipe.
    ///
    /// On `Err`, the published snapshot is unchanged, no listener runs, and
    /// the error is returned as-is.
    pub fn try_dispatch<E>(
        &self,
        recipe: impl FnOnce(&mut S) -> Result<(), E>,
        origin: Option<OriginTag>,
    ) -> Result<(), E> {
        let current = self.state();
        let next = {
            let _guard = RecipeGuard::enter(&self.inner.in_recipe);
            updater::try_produce(&current, recipe)?
        };
        self.publish(&current, next, origin);
        Ok(())
    }

    /// Register `listener`; it runs after every dispatch until released.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Rc<S>, Option<OriginTag>) + 'static,
    ) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        let active = Rc::new(Cell::new(true));
        self.inner.listeners.borrow_mut().push(ListenerEntry {
            id,
            active: Rc::clone(&active),
            callback: Rc::new(listener),
        });
        trace!(listener = id, "listener registered");

        let weak: Weak<StoreInner<S>> = Rc::downgrade(&self.inner);
        Subscription::new(active, move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|entry| entry.id != id);
                trace!(listener = id, "listener released");
            }
        })
    }

    fn publish(&self, current: &Rc<S>, next: Rc<S>, origin: Option<OriginTag>) {
        if Rc::ptr_eq(current, &next) {
            trace!(?origin, "dispatch made no change");
        } else {
            let version = self.inner.version.get() + 1;
            self.inner.version.set(version);
            *self.inner.state.borrow_mut() = Rc::clone(&next);
            debug!(version, ?origin, "published snapshot");
        }
        self.notify(&next, origin);
    }

    fn notify(&self, state: &Rc<S>, origin: Option<OriginTag>) {
        let pass: Vec<ListenerEntry<S>> = self.inner.listeners.borrow().clone();
        trace!(listeners = pass.len(), ?origin, "notifying");
        for entry in pass {
            if entry.active.get() {
                (entry.callback)(state, origin);
            }
        }
    }
}

impl<S: Record + Clone + PartialEq + 'static> Store<S> {
    /// Apply the partial-assignment form of a recipe.
    pub fn assign(&self, patch: &Patch, origin: Option<OriginTag>) -> Result<(), PathError> {
        self.try_dispatch(|draft| patch.apply_to(draft), origin)
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("version", &self.inner.version.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Marks a recipe as running; resets on unwind too.
struct RecipeGuard<'a> {
    flag: &'a Cell<bool>,
    outer: bool,
}

impl<'a> RecipeGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let outer = flag.replace(true);
        if outer {
            warn!("dispatch called from inside a recipe; the outer dispatch will overwrite it");
        }
        Self { flag, outer }
    }
}

impl Drop for RecipeGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.outer);
    }
}
