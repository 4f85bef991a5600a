//! # mealtrace-store
//!
//! Local record storage for the Mealtrace client.
//!
//! The persistence contract is deliberately a plain key-value surface
//! ([`kv::KvBackend`]) with a three-way failure taxonomy: capacity
//! exceeded, storage unavailable, and arbitrary backend errors. On top of
//! it sits the typed [`RecordStore`] (goal, per-day meal logs, activity,
//! identity, pending sync queue) and the quota-pressure evictor that
//! progressively strips embedded images when a write hits the capacity
//! limit.

pub mod evict;
pub mod kv;
pub mod memory;
pub mod records;
pub mod sqlite;

mod error;

pub use error::{Result, StoreError};
pub use kv::{KvBackend, KvError};
pub use memory::MemoryKv;
pub use records::RecordStore;
pub use sqlite::SqliteKv;
