//! Key-value persistence for chat state.
//!
//! The session store only needs four calls: get, set, remove and key
//! enumeration. Every call is synchronous and atomic. Keys enumerate in
//! insertion order, which the session listing relies on for tie-breaks.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde_json::{Map, Value};
use thiserror::Error;

/// Abstraction over local key-value storage backends.
pub trait KeyValueStorage: Send + Sync {
    /// Value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace. Replacing keeps the key's enumeration position.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. No-op when absent.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys, in insertion order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Ordered key/value entries shared by both backends.
pub(crate) type Entries = Map<String, Value>;

pub(crate) fn entry_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behavior every backend must share.

    use super::*;

    pub fn get_set_remove(storage: &dyn KeyValueStorage) {
        assert_eq!(storage.get("missing").unwrap(), None);

        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));

        storage.set("a", "2").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("2"));

        storage.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);

        storage.remove("a").unwrap();
    }

    pub fn keys_in_insertion_order(storage: &dyn KeyValueStorage) {
        storage.set("zeta", "1").unwrap();
        storage.set("alpha", "2").unwrap();
        storage.set("mid", "3").unwrap();
        // Overwrite keeps position, removal closes the gap
        storage.set("zeta", "4").unwrap();
        storage.remove("alpha").unwrap();
        storage.set("beta", "5").unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["zeta", "mid", "beta"]);
    }
}
