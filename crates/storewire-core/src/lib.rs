#![forbid(unsafe_code)]

//! Core data types for storewire.
//!
//! This crate provides:
//! - [`Value`], the dynamic state model with persistent (structurally shared)
//!   containers
//! - [`FieldPath`] for addressing nested fields and array elements
//! - [`Record`], the field access contract used by name-based bindings
//! - [`codec`], the tagged value codec used at process boundaries
//! - [`SyncConfig`], policy-as-data configuration for field synchronization

pub mod codec;
pub mod config;
pub mod path;
pub mod value;

pub use codec::{Codec, CodecError};
pub use config::{ConfigError, InvalidInputPolicy, SyncConfig, TimeZoneSetting};
pub use path::{FieldPath, PathError};
pub use value::{Record, Value, format_number};
