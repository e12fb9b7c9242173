//! Backend-agnostic key-value settings storage.
//!
//! This crate defines the contract shared by every settings backend: a
//! uniform set of single/batch read, write and remove operations over
//! named values, plus a binding-driven mode that maps a type's declared
//! properties onto individual entries.
//!
//! # Components
//!
//! - [`SettingsStore`] -- the operation contract backends implement
//! - [`Codec`] -- pluggable value serialization ([`BincodeCodec`] default,
//!   [`ZstdCodec`] compressing decorator, [`JsonCodec`] for text columns)
//! - [`Value`] -- one stored cell: encoded bytes or explicit null
//! - [`KeyConverter`] -- pluggable key canonicalization
//!   ([`DisplayConverter`] default)
//! - [`Bindable`] / [`Binding`] -- declared property-to-entry mapping
//!
//! # Design Rules
//!
//! 1. Values crossing the store boundary share no mutable state with the
//!    stored ones; reads decode a fresh copy every time.
//! 2. Batch writes are atomic: every pair is applied, or none is.
//! 3. Validation failures (key conversion, canonical collision, key
//!    length) are raised before the backend is touched.
//! 4. Absent keys are not errors: reads fall back to a default, deletes
//!    report `false`, and null is a stored value distinct from absence.

pub mod bind;
pub mod codec;
pub mod error;
pub mod key;
pub mod traits;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use bind::{Bindable, Binding, Getter, Setter};
pub use codec::{BincodeCodec, Codec, JsonCodec, ZstdCodec};
pub use error::{Result, SettingsError};
pub use key::{key_fn, DisplayConverter, KeyConverter, KeyFn};
pub use traits::SettingsStore;
pub use value::Value;
