//! The stored representation of one value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::Result;

/// One stored cell: either the codec's encoding of a caller value, or an
/// explicit null.
///
/// Null is a valid stored value, distinct from an absent key: reading an
/// absent key yields nothing, reading a null cell yields `Value::null()`.
/// Cells own their bytes, so every read hands the caller an independent
/// copy of the stored state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value {
    bytes: Option<Vec<u8>>,
}

impl Value {
    /// Encode a concrete value into a cell with the given codec.
    pub fn encode<C: Codec, T: Serialize + ?Sized>(codec: &C, value: &T) -> Result<Self> {
        Ok(Self {
            bytes: Some(codec.encode(value)?),
        })
    }

    /// The explicit null cell.
    pub fn null() -> Self {
        Self { bytes: None }
    }

    /// Whether this cell is the explicit null.
    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }

    /// Decode the cell into a concrete value. The null cell decodes to
    /// `None`.
    pub fn decode<C: Codec, T: DeserializeOwned>(&self, codec: &C) -> Result<Option<T>> {
        match &self.bytes {
            Some(bytes) => Ok(Some(codec.decode(bytes)?)),
            None => Ok(None),
        }
    }

    /// The encoded bytes, or `None` for the null cell.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Build a cell from bytes already produced by the store's codec.
    pub fn from_encoded(bytes: Option<Vec<u8>>) -> Self {
        Self { bytes }
    }
}
