//! The [`SettingsStore`] trait defining the uniform store contract.
//!
//! Backends implement the canonical-entry layer (read/write/remove by
//! canonical string key); the caller-facing key API, default-fallback
//! reads, and the property binder are provided methods layered on top, so
//! batch canonicalization (collision detection included) behaves the same
//! against every backend.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bind::Bindable;
use crate::codec::Codec;
use crate::error::{Result, SettingsError};
use crate::key::KeyConverter;
use crate::value::Value;

/// Uniform settings store contract.
///
/// All implementations guarantee:
/// - Reads hand back values sharing no state with the stored ones.
/// - Batch writes are atomic: every pair is applied, or none is.
/// - Validation failures (key conversion, collision, length) surface
///   before the backend is touched.
/// - Absent keys are not errors: reads fall back, deletes report `false`.
pub trait SettingsStore {
    /// Caller key type.
    type Key: Eq + Hash + Clone;

    /// Value codec.
    type Codec: Codec;

    // ------------------------------------------------------------------
    // Backend-required: canonical-entry layer
    // ------------------------------------------------------------------

    /// The codec values are encoded with.
    fn codec(&self) -> &Self::Codec;

    /// Canonicalize one caller key, applying backend-specific limits.
    fn canonical_key(&self, key: &Self::Key) -> Result<String>;

    /// Read one entry by canonical key.
    fn read_entry(&self, canonical: &str) -> Result<Option<Value>>;

    /// Read the subset of the given entries that exist. Order of the
    /// returned pairs is backend-defined.
    fn read_entries(&self, canonical: &[String]) -> Result<Vec<(String, Value)>>;

    /// Every entry in the store, keyed by canonical key.
    fn read_all(&self) -> Result<HashMap<String, Value>>;

    /// Upsert one entry. Returns whether a slot was affected.
    fn write_entry(&mut self, canonical: String, value: Value) -> Result<bool>;

    /// Upsert a batch atomically: either every entry is applied or none
    /// is. Returns whether the affected count equals the input count.
    fn write_entries(&mut self, entries: Vec<(String, Value)>) -> Result<bool>;

    /// Remove one entry. Returns whether it existed.
    fn remove_entry(&mut self, canonical: &str) -> Result<bool>;

    /// Remove a batch, deleting as many as possible. Returns `true` only
    /// if every entry existed.
    fn remove_entries(&mut self, canonical: &[String]) -> Result<bool>;

    /// Remove every entry.
    fn remove_all(&mut self) -> Result<()>;

    /// Install a custom key conversion; `None` restores the default
    /// `Display` conversion. The installed conversion applies to every
    /// subsequent key-bearing call, each key of a batch included.
    fn set_key_conversion(&mut self, conversion: Option<Box<dyn KeyConverter<Self::Key>>>);

    // ------------------------------------------------------------------
    // Provided: caller-key API
    // ------------------------------------------------------------------

    /// Read the stored cell for a key. `None` means absent;
    /// `Some(Value::null())` means present but null.
    fn read_raw(&self, key: &Self::Key) -> Result<Option<Value>> {
        let canonical = self.canonical_key(key)?;
        self.read_entry(&canonical)
    }

    /// Typed read. Absent keys and null cells both yield `Ok(None)`; use
    /// [`read_raw`](Self::read_raw) to tell them apart.
    fn read_value<T: DeserializeOwned>(&self, key: &Self::Key) -> Result<Option<T>> {
        match self.read_raw(key)? {
            Some(cell) => cell.decode(self.codec()),
            None => Ok(None),
        }
    }

    /// Typed read falling back to a caller-supplied default.
    fn read_or<T: DeserializeOwned>(&self, key: &Self::Key, default: T) -> Result<T> {
        Ok(self.read_value(key)?.unwrap_or(default))
    }

    /// Typed read falling back to the type's default value.
    fn read_or_default<T: DeserializeOwned + Default>(&self, key: &Self::Key) -> Result<T> {
        Ok(self.read_value(key)?.unwrap_or_default())
    }

    /// Batch read, re-associated to caller keys. Absent keys are omitted,
    /// not defaulted.
    fn read_many(&self, keys: &[Self::Key]) -> Result<HashMap<Self::Key, Value>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let pairs = canonical_pairs(self, keys)?;
        let canonical: Vec<String> = pairs.iter().map(|(c, _)| c.clone()).collect();
        let mut lookup: HashMap<String, Self::Key> = pairs.into_iter().collect();

        let mut found = HashMap::new();
        for (canon, cell) in self.read_entries(&canonical)? {
            if let Some(key) = lookup.remove(&canon) {
                found.insert(key, cell);
            }
        }
        Ok(found)
    }

    /// Encode and upsert one value.
    fn write_value<T: Serialize + ?Sized>(&mut self, key: &Self::Key, value: &T) -> Result<bool> {
        let canonical = self.canonical_key(key)?;
        let cell = Value::encode(self.codec(), value)?;
        self.write_entry(canonical, cell)
    }

    /// Upsert one already-encoded cell (or [`Value::null`]).
    fn write_raw(&mut self, key: &Self::Key, value: Value) -> Result<bool> {
        let canonical = self.canonical_key(key)?;
        self.write_entry(canonical, value)
    }

    /// Atomic batch write. Keys are canonicalized up front, so a
    /// conversion failure partway through the input aborts the whole
    /// batch before the backend sees it; two keys collapsing to one
    /// canonical form abort with [`SettingsError::KeyCollision`].
    fn write_many(&mut self, entries: Vec<(Self::Key, Value)>) -> Result<bool> {
        if entries.is_empty() {
            return Ok(true);
        }
        let mut seen = HashSet::with_capacity(entries.len());
        let mut batch = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let canonical = self.canonical_key(&key)?;
            if !seen.insert(canonical.clone()) {
                return Err(SettingsError::KeyCollision(canonical));
            }
            batch.push((canonical, value));
        }
        self.write_entries(batch)
    }

    /// Remove one key. Returns whether it existed.
    fn remove(&mut self, key: &Self::Key) -> Result<bool> {
        let canonical = self.canonical_key(key)?;
        self.remove_entry(&canonical)
    }

    /// Remove a batch of keys, deleting as many as possible. Returns
    /// `true` only if every key existed.
    fn remove_many(&mut self, keys: &[Self::Key]) -> Result<bool> {
        if keys.is_empty() {
            return Ok(true);
        }
        let mut canonical = Vec::with_capacity(keys.len());
        for key in keys {
            canonical.push(self.canonical_key(key)?);
        }
        self.remove_entries(&canonical)
    }

    // ------------------------------------------------------------------
    // Provided: property binder
    // ------------------------------------------------------------------

    /// Save every readable bound property of `source`, batched through
    /// the atomic entry write.
    fn write_properties<B: Bindable<Self::Codec>>(&mut self, source: &B) -> Result<bool> {
        let mut entries = Vec::new();
        for binding in B::bindings() {
            if let Some(cell) = binding.get(source, self.codec()).transpose()? {
                entries.push((B::entry_key(binding.name()), cell));
            }
        }
        if entries.is_empty() {
            return Ok(true);
        }
        self.write_entries(entries)
    }

    /// Load every settable bound property onto `target`. Entries missing
    /// from the store leave the corresponding property untouched.
    fn read_properties<B: Bindable<Self::Codec>>(&self, target: &mut B) -> Result<()> {
        let bindings: Vec<_> = B::bindings()
            .into_iter()
            .filter(|b| b.is_settable())
            .collect();
        if bindings.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = bindings.iter().map(|b| B::entry_key(b.name())).collect();
        let found: HashMap<String, Value> = self.read_entries(&keys)?.into_iter().collect();
        for binding in &bindings {
            if let Some(cell) = found.get(&B::entry_key(binding.name())) {
                binding.set(target, self.codec(), cell)?;
            }
        }
        Ok(())
    }

    /// Remove every bound entry of `B`, whether or not each exists.
    fn remove_properties<B: Bindable<Self::Codec>>(&mut self) -> Result<bool> {
        let keys: Vec<String> = B::bindings()
            .iter()
            .map(|b| B::entry_key(b.name()))
            .collect();
        if keys.is_empty() {
            return Ok(true);
        }
        self.remove_entries(&keys)
    }

    /// Decode a cell with this store's codec.
    fn decode_value<T: DeserializeOwned>(&self, cell: &Value) -> Result<Option<T>> {
        cell.decode(self.codec())
    }
}

/// Canonicalize a batch of keys, rejecting collisions.
fn canonical_pairs<S>(store: &S, keys: &[S::Key]) -> Result<Vec<(String, S::Key)>>
where
    S: SettingsStore + ?Sized,
{
    let mut seen = HashSet::with_capacity(keys.len());
    let mut pairs = Vec::with_capacity(keys.len());
    for key in keys {
        let canonical = store.canonical_key(key)?;
        if !seen.insert(canonical.clone()) {
            return Err(SettingsError::KeyCollision(canonical));
        }
        pairs.push((canonical, key.clone()));
    }
    Ok(pairs)
}
