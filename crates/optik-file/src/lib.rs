//! File-backed settings storage.
//!
//! [`FileSettings`] keeps every entry in an in-memory map and persists the
//! whole map as one codec-encoded blob on disk. Persistence is
//! "load whole blob" / "encode whole blob and overwrite the file", either
//! after every mutation (autosave, the default) or only on an explicit
//! [`FileSettings::save`].
//!
//! The file format is opaque to this crate: whatever the configured
//! [`Codec`](optik_core::Codec) produces for the canonical-key map. There
//! is no versioning field, so schema changes to stored values are not
//! migration-safe.

pub mod store;

pub use store::FileSettings;
