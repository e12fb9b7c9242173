//! Pluggable value serialization.
//!
//! Every store carries a [`Codec`] that turns values into the bytes it
//! persists. The default is [`BincodeCodec`]; [`ZstdCodec`] wraps any inner
//! codec with compression, and [`JsonCodec`] produces UTF-8 text for
//! backends whose value column is not binary.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SettingsError};

/// Value serialization strategy shared by all backends.
///
/// A codec is carried as a generic store parameter (like a `HashMap`
/// hasher), so the choice is made once at construction and monomorphized
/// away.
pub trait Codec {
    /// Encode a value to bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a value from bytes.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Produce an independent copy of a value by round-tripping it through
    /// this codec.
    ///
    /// The copy shares no state with the original. Requires the value's
    /// type to survive encoding, and costs one encode plus one decode.
    fn deep_clone<T: Serialize + DeserializeOwned>(&self, value: &T) -> Result<T> {
        let bytes = self.encode(value)?;
        self.decode(&bytes)
    }
}

/// Default binary codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| SettingsError::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| SettingsError::Codec(e.to_string()))
    }
}

/// Default zstd compression level.
const DEFAULT_LEVEL: i32 = 3;

/// Compressing decorator around any inner codec.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec<C = BincodeCodec> {
    inner: C,
    level: i32,
}

impl ZstdCodec<BincodeCodec> {
    /// Zstd over the default binary codec.
    pub fn new() -> Self {
        Self::with_inner(BincodeCodec)
    }
}

impl Default for ZstdCodec<BincodeCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ZstdCodec<C> {
    /// Zstd over a caller-supplied inner codec.
    pub fn with_inner(inner: C) -> Self {
        Self {
            inner,
            level: DEFAULT_LEVEL,
        }
    }

    /// Override the compression level.
    pub fn level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }
}

impl<C: Codec> Codec for ZstdCodec<C> {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let raw = self.inner.encode(value)?;
        zstd::encode_all(raw.as_slice(), self.level)
            .map_err(|e| SettingsError::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let raw = zstd::decode_all(bytes).map_err(|e| SettingsError::Codec(e.to_string()))?;
        self.inner.decode(&raw)
    }
}

/// UTF-8 JSON codec, for text value columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| SettingsError::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| SettingsError::Codec(e.to_string()))
    }
}
