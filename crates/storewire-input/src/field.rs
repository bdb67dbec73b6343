#![forbid(unsafe_code)]

//! Two-way synchronization between one element and one store field.
//!
//! A [`FieldSync`] is created bound: it writes the field's current value to
//! the element, subscribes to the store and registers a change handler on
//! the element. From then on:
//!
//! - **External update**: a notification tagged with this binding's own
//!   origin is ignored. Otherwise the element's display (or checked flag) is
//!   recomputed and written only if it differs from what the element shows,
//!   followed by a synthetic input event. A select whose field holds a
//!   value outside its options shows `""`, so it never matches and every
//!   notification from another origin rewrites it and emits again.
//! - **User edit**: the element's value (or checked flag) is coerced to the
//!   field's type and dispatched tagged with this binding's origin, then the
//!   `on_change` callback runs.
//!
//! Disposing (or dropping) the binding unsubscribes and removes the element
//! handler. The binding holds the element weakly; once the element is gone
//! both directions become no-ops.
//!
//! # Example
//!
//! ```
//! use storewire_core::Value;
//! use storewire_input::{ControlKind, ElementHandle, FieldOptions, MemoryElement, bind_field};
//! use storewire_runtime::Store;
//!
//! let store = Store::new(Value::from_pairs([("volume", 10)]));
//! let slider = MemoryElement::input().shared();
//! let _sync = bind_field(&store, &slider, FieldOptions::key("volume").control(ControlKind::Range));
//! assert_eq!(slider.value(), "10");
//!
//! slider.user_input("75");
//! assert_eq!(store.state().get("volume"), Some(&Value::from(75)));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use storewire_core::{FieldPath, InvalidInputPolicy, PathError, Record, SyncConfig, Value};
use storewire_runtime::{Disposable, OriginTag, Store, Subscription};
use tracing::{debug, trace, warn};

use crate::coercion::{Coercion, ControlKind};
use crate::element::{ElementHandle, HandlerId};

type Getter<S> = Rc<dyn Fn(&S) -> Option<Value>>;
type Setter<S> = Rc<dyn Fn(&mut S, Value) -> Result<(), PathError>>;
type ToInput = Rc<dyn Fn(Option<&Value>) -> String>;
type ToState = Rc<dyn Fn(&str) -> Value>;
type OnChange = Rc<dyn Fn(Option<&Value>)>;

/// How a binding reads and writes its field.
pub struct FieldAccessor<S> {
    getter: Getter<S>,
    setter: Setter<S>,
    label: Rc<str>,
}

impl<S> Clone for FieldAccessor<S> {
    fn clone(&self) -> Self {
        Self {
            getter: Rc::clone(&self.getter),
            setter: Rc::clone(&self.setter),
            label: Rc::clone(&self.label),
        }
    }
}

impl<S: Record + 'static> FieldAccessor<S> {
    /// Address the field by path through [`Record`].
    #[must_use]
    pub fn named(path: FieldPath) -> Self {
        let label: Rc<str> = Rc::from(path.to_string());
        let read = path.clone();
        Self {
            getter: Rc::new(move |state: &S| state.read(&read)),
            setter: Rc::new(move |state: &mut S, value| state.write(&path, value)),
            label,
        }
    }
}

impl<S: 'static> FieldAccessor<S> {
    /// Caller-supplied getter and setter.
    pub fn custom(
        label: impl Into<String>,
        getter: impl Fn(&S) -> Option<Value> + 'static,
        setter: impl Fn(&mut S, Value) -> Result<(), PathError> + 'static,
    ) -> Self {
        Self {
            getter: Rc::new(getter),
            setter: Rc::new(setter),
            label: Rc::from(label.into()),
        }
    }
}

impl<S> FieldAccessor<S> {
    #[must_use]
    pub fn get(&self, state: &S) -> Option<Value> {
        (self.getter)(state)
    }

    pub fn set(&self, state: &mut S, value: Value) -> Result<(), PathError> {
        (self.setter)(state, value)
    }

    /// Name used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<S> fmt::Debug for FieldAccessor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldAccessor").field(&self.label).finish()
    }
}

/// Everything a binding needs besides the store and the element.
pub struct FieldOptions<S> {
    accessor: FieldAccessor<S>,
    control: Option<ControlKind>,
    option: Option<Value>,
    to_input: Option<ToInput>,
    to_state: Option<ToState>,
    on_change: Option<OnChange>,
    default_value: Option<String>,
    default_checked: Option<bool>,
    config: Option<SyncConfig>,
}

impl<S: Record + 'static> FieldOptions<S> {
    /// Bind the top-level field `key` (taken verbatim, dots included).
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::named(FieldPath::key(key))
    }

    /// Bind the field at `path`.
    #[must_use]
    pub fn named(path: FieldPath) -> Self {
        Self::new(FieldAccessor::named(path))
    }
}

impl<S: 'static> FieldOptions<S> {
    #[must_use]
    pub fn new(accessor: FieldAccessor<S>) -> Self {
        Self {
            accessor,
            control: None,
            option: None,
            to_input: None,
            to_state: None,
            on_change: None,
            default_value: None,
            default_checked: None,
            config: None,
        }
    }

    /// Control type. Defaults to the element's own kind (text for inputs).
    #[must_use]
    pub fn control(mut self, kind: ControlKind) -> Self {
        self.control = Some(kind);
        self
    }

    /// The value a radio button stands for.
    #[must_use]
    pub fn option(mut self, value: impl Into<Value>) -> Self {
        self.option = Some(value.into());
        self
    }

    /// Replace the state-to-display coercion.
    #[must_use]
    pub fn to_input(mut self, convert: impl Fn(Option<&Value>) -> String + 'static) -> Self {
        self.to_input = Some(Rc::new(convert));
        self
    }

    /// Replace the display-to-state coercion.
    #[must_use]
    pub fn to_state(mut self, convert: impl Fn(&str) -> Value + 'static) -> Self {
        self.to_state = Some(Rc::new(convert));
        self
    }

    /// Run after each user edit with the value dispatched, if any.
    #[must_use]
    pub fn on_change(mut self, callback: impl Fn(Option<&Value>) + 'static) -> Self {
        self.on_change = Some(Rc::new(callback));
        self
    }

    /// Initial display overriding the store value at bind time.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Initial checked flag overriding the store value at bind time.
    #[must_use]
    pub fn default_checked(mut self, checked: bool) -> Self {
        self.default_checked = Some(checked);
        self
    }

    #[must_use]
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub(crate) fn config_or(mut self, config: &SyncConfig) -> Self {
        if self.config.is_none() {
            self.config = Some(config.clone());
        }
        self
    }
}

impl<S> fmt::Debug for FieldOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOptions")
            .field("accessor", &self.accessor)
            .field("control", &self.control)
            .field("option", &self.option)
            .field("default_value", &self.default_value)
            .field("default_checked", &self.default_checked)
            .finish_non_exhaustive()
    }
}

struct FieldInner<S, E: ElementHandle> {
    store: Store<S>,
    element: Weak<E>,
    accessor: FieldAccessor<S>,
    coercion: Coercion,
    to_input: Option<ToInput>,
    to_state: Option<ToState>,
    on_change: Option<OnChange>,
    config: SyncConfig,
    origin: OriginTag,
    subscription: RefCell<Option<Subscription>>,
    handler: Cell<Option<HandlerId>>,
    syncs: Cell<u64>,
    edits: Cell<u64>,
}

/// A live binding between an element and a store field.
pub struct FieldSync<S, E: ElementHandle> {
    inner: Rc<FieldInner<S, E>>,
}

/// Bind `element` to the field described by `options`.
pub fn bind_field<S, E>(
    store: &Store<S>,
    element: &Rc<E>,
    options: FieldOptions<S>,
) -> FieldSync<S, E>
where
    S: Clone + PartialEq + 'static,
    E: ElementHandle + 'static,
{
    FieldSync::bind(store, element, options)
}

impl<S, E> FieldSync<S, E>
where
    S: Clone + PartialEq + 'static,
    E: ElementHandle + 'static,
{
    /// Initialize the element from the store and start synchronizing.
    pub fn bind(store: &Store<S>, element: &Rc<E>, options: FieldOptions<S>) -> Self {
        let control = options
            .control
            .unwrap_or_else(|| ControlKind::for_element(element.kind()));
        let coercion = Coercion::for_control(control, options.option);
        let inner = Rc::new(FieldInner {
            store: store.clone(),
            element: Rc::downgrade(element),
            accessor: options.accessor,
            coercion,
            to_input: options.to_input,
            to_state: options.to_state,
            on_change: options.on_change,
            config: options.config.unwrap_or_default(),
            origin: store.origin_tag(),
            subscription: RefCell::new(None),
            handler: Cell::new(None),
            syncs: Cell::new(0),
            edits: Cell::new(0),
        });

        inner.initialize(element.as_ref(), options.default_value, options.default_checked);

        let weak = Rc::downgrade(&inner);
        let subscription = store.subscribe(move |state, origin| {
            if let Some(inner) = weak.upgrade() {
                inner.on_external(state, origin);
            }
        });
        *inner.subscription.borrow_mut() = Some(subscription);

        let weak = Rc::downgrade(&inner);
        let handler = element.add_change_handler(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_edit();
            }
        }));
        inner.handler.set(Some(handler));

        debug!(
            field = inner.accessor.label(),
            %control,
            origin = %inner.origin,
            "field bound"
        );
        Self { inner }
    }
}

impl<S, E: ElementHandle> FieldSync<S, E> {
    /// The tag this binding attaches to its dispatches.
    #[must_use]
    pub fn origin(&self) -> OriginTag {
        self.inner.origin
    }

    /// Whether the binding still synchronizes.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner
            .subscription
            .borrow()
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Store updates written to the element.
    #[must_use]
    pub fn sync_count(&self) -> u64 {
        self.inner.syncs.get()
    }

    /// User edits dispatched to the store.
    #[must_use]
    pub fn edit_count(&self) -> u64 {
        self.inner.edits.get()
    }

    /// The resolved coercion rules.
    #[must_use]
    pub fn coercion(&self) -> &Coercion {
        &self.inner.coercion
    }

    /// Stop synchronizing. Calling twice is a no-op.
    pub fn dispose(&self) {
        let subscription = self.inner.subscription.borrow_mut().take();
        if let Some(id) = self.inner.handler.take() {
            if let Some(element) = self.inner.element.upgrade() {
                element.remove_change_handler(id);
            }
        }
        if subscription.is_some() {
            trace!(field = self.inner.accessor.label(), "field unbound");
        }
    }
}

impl<S, E: ElementHandle> Drop for FieldSync<S, E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S, E: ElementHandle> Disposable for FieldSync<S, E> {
    fn dispose(&mut self) {
        FieldSync::dispose(self);
    }

    fn is_active(&self) -> bool {
        self.is_bound()
    }
}

impl<S, E: ElementHandle> fmt::Debug for FieldSync<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSync")
            .field("field", &self.inner.accessor.label())
            .field("origin", &self.inner.origin)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl<S, E> FieldInner<S, E>
where
    S: Clone + PartialEq + 'static,
    E: ElementHandle,
{
    fn display(&self, value: Option<&Value>) -> String {
        match &self.to_input {
            Some(convert) => convert(value),
            None => self.coercion.to_display(value, &self.config.time_zone),
        }
    }

    fn initialize(
        &self,
        element: &E,
        default_value: Option<String>,
        default_checked: Option<bool>,
    ) {
        let state = self.store.state();
        let value = self.accessor.get(&state);
        if self.coercion.is_checkable() {
            let checked =
                default_checked.unwrap_or_else(|| self.coercion.to_checked(value.as_ref()));
            if element.checked() != checked {
                element.set_checked(checked);
            }
        } else {
            let shown = default_value.unwrap_or_else(|| self.display(value.as_ref()));
            if element.value() != shown {
                element.set_value(&shown);
            }
        }
    }

    fn on_external(&self, state: &Rc<S>, origin: Option<OriginTag>) {
        if origin == Some(self.origin) {
            trace!(field = self.accessor.label(), origin = %self.origin, "skipping self-echo");
            return;
        }
        let Some(element) = self.element.upgrade() else {
            return;
        };
        let value = self.accessor.get(state);
        if self.coercion.is_checkable() {
            let checked = self.coercion.to_checked(value.as_ref());
            if element.checked() == checked {
                return;
            }
            element.set_checked(checked);
        } else {
            let shown = self.display(value.as_ref());
            if element.value() == shown {
                return;
            }
            element.set_value(&shown);
        }
        self.syncs.set(self.syncs.get() + 1);
        if self.config.emit_input_events {
            element.emit_input();
        }
    }

    fn on_edit(&self) {
        if self.subscription.borrow().is_none() {
            return;
        }
        let Some(element) = self.element.upgrade() else {
            return;
        };
        let next = if self.coercion.is_checkable() {
            self.coercion.checked_to_state(element.checked())
        } else {
            let raw = element.value();
            match &self.to_state {
                Some(convert) => Some(convert(&raw)),
                None => self.coerce(&raw),
            }
        };

        if let Some(value) = &next {
            let accessor = &self.accessor;
            let result = self
                .store
                .try_dispatch(|draft| accessor.set(draft, value.clone()), Some(self.origin));
            match result {
                Ok(()) => self.edits.set(self.edits.get() + 1),
                Err(err) => warn!(field = accessor.label(), %err, "field setter failed"),
            }
        }

        if let Some(callback) = &self.on_change {
            callback(next.as_ref());
        }
    }

    fn coerce(&self, raw: &str) -> Option<Value> {
        let state = self.store.state();
        let current = self.accessor.get(&state);
        match self
            .coercion
            .to_state(raw, current.as_ref(), &self.config.time_zone)
        {
            Ok(value) => Some(value),
            Err(err) => match self.config.invalid_input {
                InvalidInputPolicy::Retain => {
                    debug!(
                        field = self.accessor.label(),
                        %err,
                        "invalid input, keeping previous value"
                    );
                    None
                }
                InvalidInputPolicy::Clear => {
                    debug!(field = self.accessor.label(), %err, "invalid input, clearing field");
                    Some(Value::Null)
                }
            },
        }
    }
}
