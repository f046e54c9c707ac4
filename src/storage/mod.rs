//! Storage - the synchronous key-value seam underneath the slot store.
//!
//! The tracker treats persistence the way a browser treats local storage:
//! string keys, string values, synchronous reads and writes. Anything
//! satisfying [`StorageBackend`] can carry save data; the crate ships an
//! in-memory backend for tests and a file-per-key backend for desktop use.

mod file;
mod memory;

use std::fmt;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Error type for backend operations.
///
/// Callers above the seam treat every variant as "behave as if empty": save
/// data is low-stakes and availability beats strict durability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    LockPoisoned(&'static str),
    Io(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::LockPoisoned(operation) => {
                write!(f, "storage lock poisoned during {}", operation)
            }
            StorageError::Io(message) => write!(f, "storage io error: {}", message),
        }
    }
}

impl std::error::Error for StorageError {}

/// Synchronous string key-value storage.
pub trait StorageBackend: Send + Sync {
    /// Read a value. Returns None if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
