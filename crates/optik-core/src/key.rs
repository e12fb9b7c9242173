//! Key canonicalization.
//!
//! Callers address entries with their own key type; a [`KeyConverter`]
//! installed per store maps each key to the canonical string the backend
//! persists. The default conversion is the key's `Display` rendering.

use std::fmt::Display;

use crate::error::{Result, SettingsError};

/// Strategy mapping a caller key to its canonical string form.
///
/// Installed per store instance via `set_key_conversion`; invoked on every
/// key-bearing call, including each key of a batch. A conversion failure
/// aborts the whole operation before the backend is touched.
pub trait KeyConverter<K: ?Sized>: Send + Sync {
    /// Produce the canonical form of `key`.
    fn canonical(&self, key: &K) -> Result<String>;
}

/// Default conversion: the key's `Display` rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayConverter;

impl<K: Display + ?Sized> KeyConverter<K> for DisplayConverter {
    fn canonical(&self, key: &K) -> Result<String> {
        Ok(key.to_string())
    }
}

/// Adapter turning a closure into a [`KeyConverter`].
///
/// Built with [`key_fn`].
#[derive(Debug, Clone, Copy)]
pub struct KeyFn<F>(F);

/// Use a closure as the key conversion for a store.
pub fn key_fn<K, F>(f: F) -> KeyFn<F>
where
    K: ?Sized,
    F: Fn(&K) -> Result<String> + Send + Sync,
{
    KeyFn(f)
}

impl<K: ?Sized, F> KeyConverter<K> for KeyFn<F>
where
    F: Fn(&K) -> Result<String> + Send + Sync,
{
    fn canonical(&self, key: &K) -> Result<String> {
        (self.0)(key)
    }
}

/// Enforce a backend's maximum canonical key length.
///
/// Counted in characters, not bytes. The boundary is inclusive: a key of
/// exactly `max` characters passes.
pub fn check_length(canonical: &str, max: usize) -> Result<()> {
    let length = canonical.chars().count();
    if length > max {
        return Err(SettingsError::KeyTooLong {
            key: canonical.to_string(),
            length,
            max,
        });
    }
    Ok(())
}
