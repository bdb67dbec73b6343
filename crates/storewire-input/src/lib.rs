#![forbid(unsafe_code)]

//! Input synchronization for storewire.
//!
//! This crate keeps live input elements in lock-step with store fields
//! without recreating them on every state change:
//!
//! - [`ElementHandle`]: the capability interface a host element exposes
//!   (value, checked flag, change handlers, synthetic input events), with
//!   [`MemoryElement`] as the in-memory implementation
//! - [`ControlKind`] and [`Coercion`]: per-control conversion between typed
//!   state values and what an element displays
//! - [`FieldSync`]: the binding between one element and one field
//! - [`StoreController`]: a binding for arbitrary element types with
//!   caller-supplied sync callbacks
//! - [`FormStore`]: a store plus convenience constructors for all of the above

pub mod coercion;
pub mod controller;
pub mod element;
pub mod field;
pub mod form;

pub use coercion::{Coercion, CoercionError, ControlKind, DATETIME_LOCAL_FORMAT};
pub use controller::StoreController;
pub use element::{ChangeHandler, ElementHandle, ElementKind, HandlerId, MemoryElement};
pub use field::{FieldAccessor, FieldOptions, FieldSync, bind_field};
pub use form::FormStore;
