#![forbid(unsafe_code)]

//! A store with form-binding helpers.
//!
//! [`FormStore`] bundles a [`Store`] with a [`SyncConfig`] and hands out
//! field bindings, selectors, render cells and controllers that all share
//! that configuration. Field names are dotted paths (`"profile.email"`,
//! `"tags.0"`).
//!
//! ```
//! use storewire_core::Value;
//! use storewire_input::{ControlKind, ElementHandle, FormStore, MemoryElement};
//!
//! let form = FormStore::new(Value::from_pairs([("email", ""), ("password", "")]));
//! let email = MemoryElement::input().shared();
//! let _binding = form.input(&email, "email", ControlKind::Email).unwrap();
//!
//! email.user_input("ada@example.com");
//! assert_eq!(form.state().get("email"), Some(&Value::from("ada@example.com")));
//! ```

use std::fmt;
use std::rc::Rc;

use storewire_core::{FieldPath, PathError, Record, SyncConfig, Value};
use storewire_runtime::{OriginTag, Patch, RenderCell, SelectorBinding, Store, Subscription};

use crate::coercion::ControlKind;
use crate::controller::StoreController;
use crate::element::ElementHandle;
use crate::field::{FieldOptions, FieldSync};

/// A store plus the configuration its bindings use.
pub struct FormStore<S> {
    store: Store<S>,
    config: SyncConfig,
}

impl<S> Clone for FormStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Clone + PartialEq + 'static> FormStore<S> {
    /// A new store holding `initial`, with default configuration.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self::from_store(Store::new(initial))
    }

    /// Wrap an existing store.
    #[must_use]
    pub fn from_store(store: Store<S>) -> Self {
        Self {
            store,
            config: SyncConfig::default(),
        }
    }

    /// Use `config` for bindings created from now on.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    #[must_use]
    pub fn state(&self) -> Rc<S> {
        self.store.state()
    }

    pub fn dispatch(&self, recipe: impl FnOnce(&mut S)) {
        self.store.dispatch(recipe);
    }

    pub fn dispatch_tagged(&self, recipe: impl FnOnce(&mut S), origin: OriginTag) {
        self.store.dispatch_tagged(recipe, origin);
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&Rc<S>, Option<OriginTag>) + 'static,
    ) -> Subscription {
        self.store.subscribe(listener)
    }

    /// Bind an element with explicit options. Options without their own
    /// config inherit this store's.
    pub fn bind<E: ElementHandle + 'static>(
        &self,
        element: &Rc<E>,
        options: FieldOptions<S>,
    ) -> FieldSync<S, E> {
        FieldSync::bind(&self.store, element, options.config_or(&self.config))
    }

    /// A selector with `PartialEq` change detection.
    pub fn selector<T: PartialEq + 'static>(
        &self,
        selector: impl Fn(&S) -> T + 'static,
    ) -> SelectorBinding<T> {
        SelectorBinding::new(&self.store, selector)
    }

    /// A selector with a custom comparator (`true` means unchanged).
    pub fn selector_with<T: 'static>(
        &self,
        selector: impl Fn(&S) -> T + 'static,
        compare: impl Fn(&T, &T) -> bool + 'static,
    ) -> SelectorBinding<T> {
        SelectorBinding::with_compare(&self.store, selector, compare)
    }

    /// Rendered output recomputed after each state change.
    pub fn render<R: 'static>(&self, render: impl Fn(&S) -> R + 'static) -> RenderCell<S, R> {
        RenderCell::new(&self.store, render)
    }

    /// A controller for an element that is not a plain form control.
    pub fn controller<E: 'static>(
        &self,
        on_subscribe: impl Fn(&S, &E) + 'static,
        on_dispatch: impl Fn(&mut S, &E) + 'static,
    ) -> StoreController<S, E> {
        StoreController::new(&self.store, on_subscribe, on_dispatch)
    }
}

impl<S: Record + Clone + PartialEq + 'static> FormStore<S> {
    /// Bind an input control to the field at `name`.
    pub fn input<E: ElementHandle + 'static>(
        &self,
        element: &Rc<E>,
        name: &str,
        control: ControlKind,
    ) -> Result<FieldSync<S, E>, PathError> {
        Ok(self.bind(element, FieldOptions::named(FieldPath::parse(name)?).control(control)))
    }

    /// Bind a radio button standing for `option`.
    pub fn radio<E: ElementHandle + 'static>(
        &self,
        element: &Rc<E>,
        name: &str,
        option: impl Into<Value>,
    ) -> Result<FieldSync<S, E>, PathError> {
        let options = FieldOptions::named(FieldPath::parse(name)?)
            .control(ControlKind::Radio)
            .option(option);
        Ok(self.bind(element, options))
    }

    pub fn select<E: ElementHandle + 'static>(
        &self,
        element: &Rc<E>,
        name: &str,
    ) -> Result<FieldSync<S, E>, PathError> {
        self.input(element, name, ControlKind::Select)
    }

    pub fn textarea<E: ElementHandle + 'static>(
        &self,
        element: &Rc<E>,
        name: &str,
    ) -> Result<FieldSync<S, E>, PathError> {
        self.input(element, name, ControlKind::Textarea)
    }

    /// Apply a partial assignment.
    pub fn assign(&self, patch: &Patch) -> Result<(), PathError> {
        self.store.assign(patch, None)
    }
}

impl<S> fmt::Debug for FormStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStore")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}
