use thiserror::Error;

use crate::kv::KvError;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Local storage cannot be used at all (e.g. the probe write failed on
    /// open). Not recoverable by eviction.
    #[error("Local storage unavailable: {0}")]
    Unavailable(String),

    /// Local storage is full and the eviction ladder could not free enough
    /// space. The in-memory state was not updated.
    #[error("Local storage is full")]
    Full,

    /// Arbitrary backend I/O failure, distinct from both capacity and
    /// availability failures.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A persisted value failed to (de)serialize.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<KvError> for StoreError {
    fn from(e: KvError) -> Self {
        match e {
            KvError::Full => StoreError::Full,
            KvError::Unavailable(msg) => StoreError::Unavailable(msg),
            KvError::Sqlite(e) => StoreError::Backend(e.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
