//! Property binding: mapping a type's declared properties onto store
//! entries.
//!
//! A [`Bindable`] type declares its persistable properties as
//! `(name, get, set)` triples. The store derives one entry per property,
//! keyed `"{type_name}.{property}"`, and drives them through its batch
//! operations. A property is excluded from persistence by simply not
//! declaring it; one-directional properties are declared with
//! [`Binding::read_only`] or [`Binding::write_only`]. Accessors are plain
//! functions, so bindings may also reach `static` state.

use std::fmt;

use crate::codec::Codec;
use crate::error::Result;
use crate::value::Value;

/// Accessor reading one bound property into a cell.
pub type Getter<T, C> = fn(&T, &C) -> Result<Value>;

/// Accessor writing one found cell back onto the target.
pub type Setter<T, C> = fn(&mut T, &C, &Value) -> Result<()>;

/// One declared property binding: a name plus optional accessors.
///
/// A binding without a getter is never written to the store; one without a
/// setter is never loaded from it.
pub struct Binding<T, C> {
    name: &'static str,
    get: Option<Getter<T, C>>,
    set: Option<Setter<T, C>>,
}

impl<T, C: Codec> Binding<T, C> {
    /// A property that is both saved and loaded.
    pub fn read_write(name: &'static str, get: Getter<T, C>, set: Setter<T, C>) -> Self {
        Self {
            name,
            get: Some(get),
            set: Some(set),
        }
    }

    /// A property that is saved but never loaded back.
    pub fn read_only(name: &'static str, get: Getter<T, C>) -> Self {
        Self {
            name,
            get: Some(get),
            set: None,
        }
    }

    /// A property that is loaded but never saved.
    pub fn write_only(name: &'static str, set: Setter<T, C>) -> Self {
        Self {
            name,
            get: None,
            set: Some(set),
        }
    }

    /// The declared property name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this binding can produce a cell to save.
    pub fn is_readable(&self) -> bool {
        self.get.is_some()
    }

    /// Whether this binding can accept a loaded cell.
    pub fn is_settable(&self) -> bool {
        self.set.is_some()
    }

    /// Read the property into a cell, or `None` if it has no getter.
    pub fn get(&self, source: &T, codec: &C) -> Option<Result<Value>> {
        self.get.map(|get| get(source, codec))
    }

    /// Write a found cell onto the target. No-op if it has no setter.
    pub fn set(&self, target: &mut T, codec: &C, cell: &Value) -> Result<()> {
        match self.set {
            Some(set) => set(target, codec, cell),
            None => Ok(()),
        }
    }
}

impl<T, C> fmt::Debug for Binding<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("readable", &self.get.is_some())
            .field("settable", &self.set.is_some())
            .finish()
    }
}

/// Capability trait: a type whose properties map onto store entries.
pub trait Bindable<C: Codec>: Sized {
    /// Type-name prefix used when deriving entry keys.
    fn type_name() -> &'static str;

    /// The declared property bindings.
    fn bindings() -> Vec<Binding<Self, C>>;

    /// The entry key for one property.
    fn entry_key(property: &str) -> String {
        format!("{}.{property}", Self::type_name())
    }
}
