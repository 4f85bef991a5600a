//! The key-value persistence contract.
//!
//! Backends must distinguish three failure modes: [`KvError::Full`]
//! (capacity exceeded, recoverable by evicting payload), [`KvError::
//! Unavailable`] (storage cannot be used at all, e.g. a blocked data
//! directory) and backend I/O errors. The evictor only ever reacts to
//! `Full`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    /// The write would exceed the backend's capacity limit.
    #[error("Storage capacity exceeded")]
    Full,

    /// Storage is not usable at all; no retry or eviction will help.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Minimal durable key-value surface the record store is built on.
pub trait KvBackend {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;
    fn remove(&mut self, key: &str) -> Result<(), KvError>;
    /// All stored keys, in unspecified order.
    fn keys(&self) -> Result<Vec<String>, KvError>;
}

/// Key used by [`probe`]. Backends must allow this write even at quota,
/// since it is immediately deleted.
const PROBE_KEY: &str = "__mealtrace_probe__";

/// Trivial write-then-delete availability check, run once on open.
///
/// Detects storage that is blocked outright (the private-browsing case)
/// so callers can surface [`KvError::Unavailable`] up front instead of
/// attempting a pointless eviction later.
pub fn probe(backend: &mut dyn KvBackend) -> Result<(), KvError> {
    match backend.set(PROBE_KEY, "1") {
        Ok(()) => backend.remove(PROBE_KEY),
        // A full store is still an available store.
        Err(KvError::Full) => Ok(()),
        Err(e) => Err(e),
    }
}
