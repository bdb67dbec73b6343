#![forbid(unsafe_code)]

//! Host element capabilities.
//!
//! Field bindings never own the elements they drive. They talk to them
//! through [`ElementHandle`], which exposes just what synchronization needs:
//! the displayed value, the checked flag, change-handler registration and a
//! way to announce programmatic writes to outside observers.
//!
//! All methods take `&self`; hosts are expected to use interior mutability,
//! the same way a live UI element is mutated through a shared reference.
//!
//! [`MemoryElement`] is a complete in-memory implementation for headless
//! hosts and tests.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifies a change handler registered on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Wrap a host-specific handler number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Which kind of form control an element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Input,
    Select,
    Textarea,
}

/// Callback run when the user edits an element.
pub type ChangeHandler = Rc<dyn Fn()>;

/// The surface a form control exposes to field bindings.
pub trait ElementHandle {
    fn kind(&self) -> ElementKind;

    /// The live displayed value.
    fn value(&self) -> String;

    /// Programmatically replace the displayed value. Must not run change
    /// handlers.
    fn set_value(&self, value: &str);

    fn checked(&self) -> bool;

    /// Programmatically set the checked flag. Must not run change handlers.
    fn set_checked(&self, checked: bool);

    /// Announce a programmatic write to observers of the raw element.
    fn emit_input(&self);

    /// Register `handler` to run after each user edit.
    fn add_change_handler(&self, handler: ChangeHandler) -> HandlerId;

    /// Remove a handler. Returns `false` if it was not registered.
    fn remove_change_handler(&self, id: HandlerId) -> bool;
}

type InputObserver = Rc<dyn Fn(&str)>;

/// An element that lives entirely in memory.
///
/// `user_input` and `user_toggle` simulate edits and run change handlers;
/// `set_value` and `set_checked` are programmatic writes and are counted.
pub struct MemoryElement {
    kind: ElementKind,
    options: Vec<String>,
    value: RefCell<String>,
    checked: Cell<bool>,
    handlers: RefCell<Vec<(HandlerId, ChangeHandler)>>,
    observers: RefCell<Vec<InputObserver>>,
    next_handler: Cell<u64>,
    value_writes: Cell<u64>,
    checked_writes: Cell<u64>,
    input_events: Cell<u64>,
}

impl MemoryElement {
    fn with_kind(kind: ElementKind, options: Vec<String>) -> Self {
        Self {
            kind,
            options,
            value: RefCell::new(String::new()),
            checked: Cell::new(false),
            handlers: RefCell::new(Vec::new()),
            observers: RefCell::new(Vec::new()),
            next_handler: Cell::new(0),
            value_writes: Cell::new(0),
            checked_writes: Cell::new(0),
            input_events: Cell::new(0),
        }
    }

    /// An `<input>`-like element.
    #[must_use]
    pub fn input() -> Self {
        Self::with_kind(ElementKind::Input, Vec::new())
    }

    /// A `<textarea>`-like element.
    #[must_use]
    pub fn textarea() -> Self {
        Self::with_kind(ElementKind::Textarea, Vec::new())
    }

    /// A `<select>`-like element. Its value is always one of `options`, or
    /// `""` when asked to show anything else.
    #[must_use]
    pub fn select<I, T>(options: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::with_kind(ElementKind::Select, options.into_iter().map(Into::into).collect())
    }

    /// Seed the displayed value without counting a write.
    #[must_use]
    pub fn with_value(self, value: &str) -> Self {
        let shown = self.accept(value);
        *self.value.borrow_mut() = shown;
        self
    }

    /// Seed the checked flag without counting a write.
    #[must_use]
    pub fn with_checked(self, checked: bool) -> Self {
        self.checked.set(checked);
        self
    }

    /// Wrap in an `Rc`, the form bindings take.
    #[must_use]
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// The options of a select element.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Simulate the user typing or picking `raw`, then run change handlers.
    pub fn user_input(&self, raw: &str) {
        let shown = self.accept(raw);
        *self.value.borrow_mut() = shown;
        self.fire_change();
    }

    /// Simulate the user toggling the control, then run change handlers.
    pub fn user_toggle(&self, checked: bool) {
        self.checked.set(checked);
        self.fire_change();
    }

    /// Observe synthetic input events; the observer sees the value at the
    /// time of the event.
    pub fn observe_input(&self, observer: impl Fn(&str) + 'static) {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Programmatic writes to the displayed value.
    #[must_use]
    pub fn value_writes(&self) -> u64 {
        self.value_writes.get()
    }

    /// Programmatic writes to the checked flag.
    #[must_use]
    pub fn checked_writes(&self) -> u64 {
        self.checked_writes.get()
    }

    /// Synthetic input events emitted so far.
    #[must_use]
    pub fn input_events(&self) -> u64 {
        self.input_events.get()
    }

    /// Registered change handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    fn accept(&self, raw: &str) -> String {
        if self.kind == ElementKind::Select && !self.options.iter().any(|o| o == raw) {
            String::new()
        } else {
            raw.to_owned()
        }
    }

    fn fire_change(&self) {
        let handlers: Vec<ChangeHandler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler();
        }
    }
}

impl ElementHandle for MemoryElement {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn value(&self) -> String {
        self.value.borrow().clone()
    }

    fn set_value(&self, value: &str) {
        let shown = self.accept(value);
        *self.value.borrow_mut() = shown;
        self.value_writes.set(self.value_writes.get() + 1);
    }

    fn checked(&self) -> bool {
        self.checked.get()
    }

    fn set_checked(&self, checked: bool) {
        self.checked.set(checked);
        self.checked_writes.set(self.checked_writes.get() + 1);
    }

    fn emit_input(&self) {
        self.input_events.set(self.input_events.get() + 1);
        let value = self.value();
        let observers: Vec<InputObserver> = self.observers.borrow().clone();
        for observer in observers {
            observer(&value);
        }
    }

    fn add_change_handler(&self, handler: ChangeHandler) -> HandlerId {
        let id = HandlerId(self.next_handler.get());
        self.next_handler.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    fn remove_change_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }
}

impl fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryElement")
            .field("kind", &self.kind)
            .field("value", &self.value.borrow())
            .field("checked", &self.checked.get())
            .field("handlers", &self.handlers.borrow().len())
            .finish()
    }
}
