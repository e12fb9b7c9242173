//! The [`FileSettings`] store.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use tracing::debug;

use optik_core::codec::BincodeCodec;
use optik_core::error::{Result, SettingsError};
use optik_core::key::{DisplayConverter, KeyConverter};
use optik_core::traits::SettingsStore;
use optik_core::value::Value;
use optik_core::Codec;

/// File-backed settings store.
///
/// Entries live in an in-memory map from canonical key to cell; the whole
/// map is persisted as one codec-encoded blob. With autosave enabled (the
/// default) every mutating operation overwrites the file afterward;
/// disabled, changes stay memory-only until autosave is re-enabled and
/// another mutation occurs, or [`save`](Self::save) is called explicitly.
/// Toggling the flag itself never touches the disk.
///
/// The file is opened, fully read or written, and closed within each
/// [`load`](Self::load)/[`save`](Self::save); no handle is held between
/// calls.
pub struct FileSettings<K: 'static, C = BincodeCodec> {
    path: Option<PathBuf>,
    entries: HashMap<String, Value>,
    codec: C,
    conversion: Box<dyn KeyConverter<K>>,
    auto_save: bool,
}

impl<K> FileSettings<K, BincodeCodec>
where
    K: fmt::Display + 'static,
{
    /// An empty store with the default binary codec and no file path yet.
    pub fn new() -> Self {
        Self::with_codec(BincodeCodec)
    }

    /// Load (or start) a store at `path` with the default binary codec
    /// and autosave enabled.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, BincodeCodec, true)
    }
}

impl<K> Default for FileSettings<K, BincodeCodec>
where
    K: fmt::Display + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, C> FileSettings<K, C>
where
    K: fmt::Display + 'static,
    C: Codec,
{
    /// An empty store with a caller-supplied codec and no file path yet.
    pub fn with_codec(codec: C) -> Self {
        Self {
            path: None,
            entries: HashMap::new(),
            codec,
            conversion: Box::new(DisplayConverter),
            auto_save: true,
        }
    }

    /// Load (or start) a store at `path` with a caller-supplied codec.
    pub fn open_with(path: impl AsRef<Path>, codec: C, auto_save: bool) -> Result<Self> {
        let mut store = Self::with_codec(codec);
        store.auto_save = auto_save;
        store.load(path)?;
        Ok(store)
    }

    /// Replace the in-memory map with the contents of `path` and make it
    /// the target of subsequent saves.
    ///
    /// A missing file is not an error: the map is reset to empty and
    /// `Ok(false)` is returned.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        self.path = Some(path.to_path_buf());

        if !path.exists() {
            self.entries = HashMap::new();
            debug!(path = %path.display(), "settings file absent, starting empty");
            return Ok(false);
        }

        let bytes = std::fs::read(path)?;
        self.entries = self.codec.decode(&bytes)?;
        debug!(
            path = %path.display(),
            entries = self.entries.len(),
            "settings loaded"
        );
        Ok(true)
    }

    /// Encode the entire map and overwrite the file in one shot.
    pub fn save(&self) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| {
            SettingsError::Config("no file path set; load() establishes one".to_string())
        })?;
        let bytes = self.codec.encode(&self.entries)?;
        std::fs::write(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "settings saved");
        Ok(())
    }

    /// Whether mutations persist to disk immediately.
    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    /// Enable or disable autosave. Takes effect on the next mutation;
    /// nothing is persisted or discarded by the toggle itself.
    pub fn set_auto_save(&mut self, auto_save: bool) {
        self.auto_save = auto_save;
    }

    /// The file targeted by [`save`](Self::save), once established.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn try_auto_save(&self) -> Result<()> {
        if self.auto_save {
            self.save()?;
        }
        Ok(())
    }
}

impl<K, C> SettingsStore for FileSettings<K, C>
where
    K: fmt::Display + Eq + Hash + Clone + 'static,
    C: Codec,
{
    type Key = K;
    type Codec = C;

    fn codec(&self) -> &C {
        &self.codec
    }

    fn canonical_key(&self, key: &K) -> Result<String> {
        self.conversion.canonical(key)
    }

    fn read_entry(&self, canonical: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(canonical).cloned())
    }

    fn read_entries(&self, canonical: &[String]) -> Result<Vec<(String, Value)>> {
        Ok(canonical
            .iter()
            .filter_map(|key| self.entries.get(key).map(|cell| (key.clone(), cell.clone())))
            .collect())
    }

    fn read_all(&self) -> Result<HashMap<String, Value>> {
        Ok(self.entries.clone())
    }

    fn write_entry(&mut self, canonical: String, value: Value) -> Result<bool> {
        self.entries.insert(canonical, value);
        self.try_auto_save()?;
        Ok(true)
    }

    fn write_entries(&mut self, entries: Vec<(String, Value)>) -> Result<bool> {
        if entries.is_empty() {
            return Ok(true);
        }
        self.entries.extend(entries);
        self.try_auto_save()?;
        Ok(true)
    }

    fn remove_entry(&mut self, canonical: &str) -> Result<bool> {
        if self.entries.remove(canonical).is_none() {
            return Ok(false);
        }
        self.try_auto_save()?;
        Ok(true)
    }

    fn remove_entries(&mut self, canonical: &[String]) -> Result<bool> {
        let mut all_existed = true;
        for key in canonical {
            if self.entries.remove(key).is_none() {
                all_existed = false;
            }
        }
        self.try_auto_save()?;
        Ok(all_existed)
    }

    fn remove_all(&mut self) -> Result<()> {
        self.entries.clear();
        self.try_auto_save()
    }

    fn set_key_conversion(&mut self, conversion: Option<Box<dyn KeyConverter<K>>>) {
        self.conversion = conversion.unwrap_or_else(|| Box::new(DisplayConverter));
    }
}

impl<K: 'static, C> fmt::Debug for FileSettings<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSettings")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .field("auto_save", &self.auto_save)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    use optik_core::bind::{Bindable, Binding};
    use optik_core::codec::{JsonCodec, ZstdCodec};
    use optik_core::key::key_fn;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKey {
        One,
        Two,
        Three,
    }

    impl fmt::Display for TestKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Car {
        model: String,
        year: u16,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        height: u32,
        car: Car,
    }

    fn profile() -> Profile {
        Profile {
            name: "John Smith".to_string(),
            height: 175,
            car: Car {
                model: "roadster".to_string(),
                year: 2010,
            },
        }
    }

    fn temp_path() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.dat");
        (dir, path)
    }

    fn open_str(path: &Path) -> FileSettings<String> {
        FileSettings::open(path).unwrap()
    }

    // ------------------------------------------------------------------
    // Round trip and isolation
    // ------------------------------------------------------------------

    #[test]
    fn round_trip_by_value() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);

        store.write_value(&"greeting".to_string(), "hello").unwrap();
        store.write_value(&"count".to_string(), &42u32).unwrap();
        store.write_value(&"profile".to_string(), &profile()).unwrap();

        assert_eq!(
            store.read_value::<String>(&"greeting".to_string()).unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(
            store.read_value::<u32>(&"count".to_string()).unwrap(),
            Some(42)
        );
        assert_eq!(
            store.read_value::<Profile>(&"profile".to_string()).unwrap(),
            Some(profile())
        );
    }

    #[test]
    fn reads_are_isolated_copies() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.write_value(&"p".to_string(), &profile()).unwrap();

        let mut first: Profile = store.read_value(&"p".to_string()).unwrap().unwrap();
        let second: Profile = store.read_value(&"p".to_string()).unwrap().unwrap();

        first.car.model = "changed".to_string();
        first.name = "Someone Else".to_string();
        assert_eq!(second, profile());

        // Stored state is untouched by mutating a returned copy.
        let third: Profile = store.read_value(&"p".to_string()).unwrap().unwrap();
        assert_eq!(third, profile());
    }

    #[test]
    fn writes_snapshot_the_value() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);

        let mut original = profile();
        store.write_value(&"p".to_string(), &original).unwrap();
        original.car.model = "mutated after write".to_string();

        let stored: Profile = store.read_value(&"p".to_string()).unwrap().unwrap();
        assert_eq!(stored, profile());
    }

    // ------------------------------------------------------------------
    // Defaults, null, batches
    // ------------------------------------------------------------------

    #[test]
    fn absent_keys_fall_back() {
        let (_dir, path) = temp_path();
        let store = open_str(&path);

        assert_eq!(
            store
                .read_or(&"missing".to_string(), "fallback".to_string())
                .unwrap(),
            "fallback"
        );
        assert_eq!(store.read_or_default::<i32>(&"missing".to_string()).unwrap(), 0);
    }

    #[test]
    fn null_is_present_but_empty() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.write_raw(&"n".to_string(), Value::null()).unwrap();

        assert_eq!(store.read_raw(&"n".to_string()).unwrap(), Some(Value::null()));
        assert_eq!(store.read_value::<String>(&"n".to_string()).unwrap(), None);
        assert!(store.read_raw(&"absent".to_string()).unwrap().is_none());
    }

    #[test]
    fn read_many_returns_present_subset() {
        let (_dir, path) = temp_path();
        let mut store: FileSettings<TestKey> = FileSettings::open(&path).unwrap();
        store.write_value(&TestKey::One, &1u32).unwrap();
        store.write_value(&TestKey::Two, &2u32).unwrap();

        let found = store
            .read_many(&[TestKey::One, TestKey::Two, TestKey::Three])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(store.decode_value::<u32>(&found[&TestKey::One]).unwrap(), Some(1));
        assert!(!found.contains_key(&TestKey::Three));
    }

    #[test]
    fn read_all_is_keyed_by_canonical_string() {
        let (_dir, path) = temp_path();
        let mut store: FileSettings<TestKey> = FileSettings::open(&path).unwrap();
        store.write_value(&TestKey::One, &1u32).unwrap();
        store.write_value(&TestKey::Two, &2u32).unwrap();

        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("One"));
        assert!(all.contains_key("Two"));
    }

    // ------------------------------------------------------------------
    // Persistence through reload
    // ------------------------------------------------------------------

    #[test]
    fn reload_after_write() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.write_value(&"a".to_string(), &1u32).unwrap();
        store.write_value(&"b".to_string(), &2u32).unwrap();

        let fresh = open_str(&path);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh.read_or_default::<u32>(&"a".to_string()).unwrap(), 1);
        assert_eq!(fresh.read_or_default::<u32>(&"b".to_string()).unwrap(), 2);
    }

    #[test]
    fn reload_after_write_many() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        let one = Value::encode(store.codec(), &1u32).unwrap();
        let two = Value::encode(store.codec(), &2u32).unwrap();
        assert!(store
            .write_many(vec![("a".to_string(), one), ("b".to_string(), two)])
            .unwrap());

        let fresh = open_str(&path);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh.read_or_default::<u32>(&"b".to_string()).unwrap(), 2);
    }

    #[test]
    fn reload_after_remove() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.write_value(&"a".to_string(), &1u32).unwrap();
        store.write_value(&"b".to_string(), &2u32).unwrap();

        assert!(store.remove(&"a".to_string()).unwrap());
        assert!(!store.remove(&"ghost".to_string()).unwrap());

        let fresh = open_str(&path);
        assert_eq!(fresh.len(), 1);
        assert!(fresh.read_raw(&"a".to_string()).unwrap().is_none());
    }

    #[test]
    fn reload_after_remove_many_and_remove_all() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        for key in ["a", "b", "c"] {
            store.write_value(&key.to_string(), &0u8).unwrap();
        }

        assert!(store
            .remove_many(&["a".to_string(), "b".to_string()])
            .unwrap());
        assert_eq!(open_str(&path).len(), 1);

        store.remove_all().unwrap();
        assert!(open_str(&path).is_empty());
    }

    #[test]
    fn load_missing_file_resets_to_empty() {
        let (dir, path) = temp_path();
        let mut store = open_str(&path);
        store.set_auto_save(false);
        store.write_value(&"a".to_string(), &1u32).unwrap();
        assert_eq!(store.len(), 1);

        let found = store.load(dir.path().join("nowhere.dat")).unwrap();
        assert!(!found);
        assert!(store.is_empty());
    }

    #[test]
    fn save_without_path_is_a_config_error() {
        let store: FileSettings<String> = FileSettings::new();
        assert!(matches!(store.save(), Err(SettingsError::Config(_))));
    }

    // ------------------------------------------------------------------
    // Autosave policy
    // ------------------------------------------------------------------

    #[test]
    fn autosave_switching_scenario() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);

        store.write_value(&"Key1".to_string(), &1u32).unwrap();
        store.set_auto_save(false);
        store.write_value(&"Key2".to_string(), &2u32).unwrap();

        // Only the first write reached the disk.
        let probe = open_str(&path);
        let all = probe.read_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("Key1"));

        // Re-enabling autosave persists nothing by itself; the next
        // mutation flushes the whole map, buffered writes included.
        store.set_auto_save(true);
        assert_eq!(open_str(&path).len(), 1);

        store.write_value(&"Key3".to_string(), &3u32).unwrap();
        let probe = open_str(&path);
        assert_eq!(probe.len(), 3);
        assert_eq!(probe.read_or_default::<u32>(&"Key1".to_string()).unwrap(), 1);
        assert_eq!(probe.read_or_default::<u32>(&"Key2".to_string()).unwrap(), 2);
        assert_eq!(probe.read_or_default::<u32>(&"Key3".to_string()).unwrap(), 3);
    }

    #[test]
    fn explicit_save_persists_with_autosave_off() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.set_auto_save(false);
        store.write_value(&"a".to_string(), &1u32).unwrap();

        assert!(open_str(&path).is_empty());
        store.save().unwrap();
        assert_eq!(open_str(&path).len(), 1);
    }

    // ------------------------------------------------------------------
    // Codecs
    // ------------------------------------------------------------------

    #[test]
    fn zstd_codec_survives_reload() {
        let (_dir, path) = temp_path();
        let mut store: FileSettings<String, ZstdCodec> =
            FileSettings::open_with(&path, ZstdCodec::new(), true).unwrap();
        store.write_value(&"p".to_string(), &profile()).unwrap();

        let fresh: FileSettings<String, ZstdCodec> =
            FileSettings::open_with(&path, ZstdCodec::new(), true).unwrap();
        assert_eq!(
            fresh.read_value::<Profile>(&"p".to_string()).unwrap(),
            Some(profile())
        );
    }

    #[test]
    fn json_codec_writes_a_json_blob() {
        let (_dir, path) = temp_path();
        let mut store: FileSettings<String, JsonCodec> =
            FileSettings::open_with(&path, JsonCodec, true).unwrap();
        store.write_value(&"count".to_string(), &7u32).unwrap();

        let raw = std::fs::read(&path).unwrap();
        let blob: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(blob.get("count").is_some());

        let fresh: FileSettings<String, JsonCodec> =
            FileSettings::open_with(&path, JsonCodec, true).unwrap();
        assert_eq!(fresh.read_or_default::<u32>(&"count".to_string()).unwrap(), 7);
    }

    // ------------------------------------------------------------------
    // Key conversion
    // ------------------------------------------------------------------

    #[test]
    fn custom_conversion_applies_to_every_call() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.set_key_conversion(Some(Box::new(key_fn(|k: &String| {
            Ok(format!("app.{k}"))
        }))));

        store.write_value(&"width".to_string(), &800u32).unwrap();
        assert!(store.read_all().unwrap().contains_key("app.width"));
        assert_eq!(
            store.read_or_default::<u32>(&"width".to_string()).unwrap(),
            800
        );

        // Restoring the default conversion changes the addressing back.
        store.set_key_conversion(None);
        assert_eq!(store.read_or_default::<u32>(&"width".to_string()).unwrap(), 0);
        assert_eq!(store.read_or_default::<u32>(&"app.width".to_string()).unwrap(), 800);
    }

    #[test]
    fn conversion_failure_aborts_batch_before_any_write() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.write_value(&"kept".to_string(), &"before").unwrap();

        let calls = AtomicUsize::new(0);
        store.set_key_conversion(Some(Box::new(key_fn(move |k: &String| {
            if calls.fetch_add(1, Ordering::SeqCst) >= 1 {
                return Err(SettingsError::KeyConversion("conversion exploded".to_string()));
            }
            Ok(k.clone())
        }))));

        let cell = Value::encode(store.codec(), &1u32).unwrap();
        let result = store.write_many(vec![
            ("one".to_string(), cell.clone()),
            ("two".to_string(), cell.clone()),
            ("three".to_string(), cell),
        ]);
        assert!(matches!(result, Err(SettingsError::KeyConversion(_))));

        // Neither memory nor disk saw any of the batch.
        assert_eq!(store.read_all().unwrap().len(), 1);
        let fresh = open_str(&path);
        assert_eq!(fresh.len(), 1);
        assert!(fresh.read_raw(&"kept".to_string()).unwrap().is_some());
    }

    #[test]
    fn canonical_collision_is_rejected() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.set_key_conversion(Some(Box::new(key_fn(|_: &String| Ok("same".to_string())))));

        let cell = Value::encode(store.codec(), &1u32).unwrap();
        let result = store.write_many(vec![
            ("a".to_string(), cell.clone()),
            ("b".to_string(), cell),
        ]);
        assert!(matches!(result, Err(SettingsError::KeyCollision(_))));
        assert!(store.read_all().unwrap().is_empty());
    }

    // ------------------------------------------------------------------
    // Property binding
    // ------------------------------------------------------------------

    #[derive(Debug, Default, PartialEq)]
    struct WindowPrefs {
        width: u32,
        height: u32,
        title: String,
        // Not declared below: never persisted.
        dirty: bool,
    }

    impl<C: Codec> Bindable<C> for WindowPrefs {
        fn type_name() -> &'static str {
            "WindowPrefs"
        }

        fn bindings() -> Vec<Binding<Self, C>> {
            vec![
                Binding::read_write(
                    "width",
                    |w: &Self, c: &C| Value::encode(c, &w.width),
                    |w, c, cell| {
                        if let Some(v) = cell.decode(c)? {
                            w.width = v;
                        }
                        Ok(())
                    },
                ),
                Binding::read_write(
                    "height",
                    |w: &Self, c: &C| Value::encode(c, &w.height),
                    |w, c, cell| {
                        if let Some(v) = cell.decode(c)? {
                            w.height = v;
                        }
                        Ok(())
                    },
                ),
                Binding::read_write(
                    "title",
                    |w: &Self, c: &C| Value::encode(c, &w.title),
                    |w, c, cell| {
                        if let Some(v) = cell.decode(c)? {
                            w.title = v;
                        }
                        Ok(())
                    },
                ),
            ]
        }
    }

    #[test]
    fn properties_round_trip_through_reload() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        let prefs = WindowPrefs {
            width: 1280,
            height: 720,
            title: "main window".to_string(),
            dirty: true,
        };
        assert!(store.write_properties(&prefs).unwrap());

        let fresh = open_str(&path);
        let mut loaded = WindowPrefs::default();
        fresh.read_properties(&mut loaded).unwrap();
        assert_eq!(loaded.width, 1280);
        assert_eq!(loaded.height, 720);
        assert_eq!(loaded.title, "main window");
        assert!(!loaded.dirty);
    }

    #[test]
    fn remove_properties_spares_unrelated_entries() {
        let (_dir, path) = temp_path();
        let mut store = open_str(&path);
        store.write_properties(&WindowPrefs::default()).unwrap();
        store.write_value(&"unrelated".to_string(), &true).unwrap();

        assert!(store.remove_properties::<WindowPrefs>().unwrap());

        let fresh = open_str(&path);
        let all = fresh.read_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("unrelated"));
    }
}
