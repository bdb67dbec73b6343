#![forbid(unsafe_code)]

//! storewire: an immutable state store with memoized selectors and
//! uncontrolled input synchronization.
//!
//! This crate re-exports the workspace:
//! - [`storewire_core`]: the dynamic [`Value`] model, field paths, the
//!   tagged JSON codec and [`SyncConfig`]
//! - [`storewire_runtime`]: [`Store`], recipes, [`SelectorBinding`],
//!   [`RenderCell`] and binding lifecycles
//! - `storewire_input` (feature `input`, on by default): element handles,
//!   coercion, field bindings, controllers and form stores
//!
//! ```
//! use storewire::prelude::*;
//!
//! let store = Store::new(Value::from_pairs([("count", 0)]));
//! let count = bind_selector(&store, |s: &Value| s.get("count").cloned());
//! store.dispatch(|draft| {
//!     draft.insert("count", 1).unwrap();
//! });
//! assert_eq!(count.get(), Some(Value::from(1)));
//! ```

pub use storewire_core;
pub use storewire_runtime;

#[cfg(feature = "input")]
pub use storewire_input;

pub use storewire_core::{
    Codec, CodecError, ConfigError, FieldPath, InvalidInputPolicy, PathError, Record, SyncConfig,
    TimeZoneSetting, Value,
};
pub use storewire_runtime::{
    BindingScope, Disposable, OriginTag, Patch, RenderCell, SelectorBinding, Store, Subscription,
    bind_selector, bind_selector_with, create_store, produce, same_rc, try_produce,
};

#[cfg(feature = "input")]
pub use storewire_input::{
    Coercion, CoercionError, ControlKind, ElementHandle, ElementKind, FieldAccessor, FieldOptions,
    FieldSync, FormStore, HandlerId, MemoryElement, StoreController, bind_field,
};

/// Everything most applications need, in one import.
pub mod prelude {
    pub use storewire_core::{FieldPath, Record, SyncConfig, Value};
    pub use storewire_runtime::{
        BindingScope, Disposable, OriginTag, Patch, RenderCell, SelectorBinding, Store,
        Subscription, bind_selector, bind_selector_with, create_store,
    };

    #[cfg(feature = "input")]
    pub use storewire_input::{
        ControlKind, ElementHandle, FieldOptions, FieldSync, FormStore, MemoryElement,
        StoreController, bind_field,
    };
}
