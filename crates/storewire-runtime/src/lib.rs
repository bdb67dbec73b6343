#![forbid(unsafe_code)]

//! Store runtime for storewire.
//!
//! All primitives live in [`reactive`] and are re-exported here.

pub mod reactive;

pub use reactive::{
    BindingScope, Disposable, OriginTag, Patch, RenderCell, SelectorBinding, Store, Subscription,
    bind_selector, bind_selector_with, create_store, produce, same_rc, try_produce,
};
