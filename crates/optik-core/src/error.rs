/// Errors from settings store operations.
///
/// Validation and range errors (`KeyConversion`, `KeyCollision`,
/// `KeyTooLong`) are always raised before the backend is touched, so a
/// failed call leaves the store exactly as it was. Backend errors are
/// propagated unmodified; transactional writes roll back first.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The installed key conversion failed to produce a canonical string.
    #[error("key conversion failed: {0}")]
    KeyConversion(String),

    /// Two distinct caller keys collapsed to the same canonical form
    /// within one batch operation.
    #[error("distinct keys collide on canonical form {0:?}")]
    KeyCollision(String),

    /// The canonical key exceeds the backend's maximum length.
    #[error("canonical key {key:?} is {length} characters, maximum is {max}")]
    KeyTooLong {
        key: String,
        length: usize,
        max: usize,
    },

    /// The store configuration is unusable (empty database path, invalid
    /// identifier, save with no file path established).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Encoding or decoding a value failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Error reported by the underlying database.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
