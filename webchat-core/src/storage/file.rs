use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{entry_value, Entries, KeyValueStorage, StorageError};

/// Single JSON document on disk holding every key.
///
/// Nothing is cached: every call reads the document, so writes made by
/// other handles or processes are always seen. Mutations run under an
/// exclusive lock on a sibling `.lock` file, then write a temp file and
/// rename it into place, so readers never observe a partial write.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Open the document at `path`. A missing file is an empty store; a
    /// document that does not parse is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = read_entries(&path)?;

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened file storage");

        Ok(Self { path })
    }

    /// Take the writer lock. Released when the returned handle is dropped.
    fn lock(&self) -> Result<File, StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
        }

        let lock_path = self.path.with_extension("json.lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| io_error(&lock_path, e))?;
        file.lock().map_err(|e| io_error(&lock_path, e))?;
        Ok(file)
    }

    /// Read-modify-write under the lock. `apply` returns whether anything
    /// changed; unchanged documents are not rewritten.
    fn update(&self, apply: impl FnOnce(&mut Entries) -> bool) -> Result<(), StorageError> {
        let _lock = self.lock()?;
        let mut entries = read_entries(&self.path)?;
        if apply(&mut entries) {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn flush(&self, entries: &Entries) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Entries, StorageError> {
    match fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Ok(Entries::new()),
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
        Err(e) => Err(io_error(path, e)),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = read_entries(&self.path)?;
        Ok(entries.get(key).map(entry_value))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.shift_remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = read_entries(&self.path)?;
        Ok(entries.keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    #[test]
    fn test_file_get_set_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("store.json")).unwrap();
        contract::get_set_remove(&storage);
    }

    #[test]
    fn test_file_keys_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("store.json")).unwrap();
        contract::keys_in_insertion_order(&storage);
    }

    #[test]
    fn test_file_survives_reopen_with_order_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("chatSessionId", "s-2").unwrap();
            storage.set("messages_s-2", "[]").unwrap();
            storage.set("messages_s-1", "[]").unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.keys().unwrap(),
            vec!["chatSessionId", "messages_s-2", "messages_s-1"]
        );
        assert_eq!(reopened.get("chatSessionId").unwrap().as_deref(), Some("s-2"));
        assert!(!path.with_extension("json.tmp").exists(), "temp file must be renamed away");
    }

    #[test]
    fn test_file_sees_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let first = FileStorage::open(&path).unwrap();
        let second = FileStorage::open(&path).unwrap();

        first.set("messages_s-1", "[1]").unwrap();
        first.set("messages_s-2", "[2]").unwrap();
        second.remove("messages_s-1").unwrap();
        second.set("chatSessionId", "s-3").unwrap();
        first.set("messages_s-2", "[2,3]").unwrap();

        assert_eq!(first.get("messages_s-1").unwrap(), None);
        assert_eq!(first.get("chatSessionId").unwrap().as_deref(), Some("s-3"));

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["messages_s-2", "chatSessionId"]);
        assert_eq!(reopened.get("messages_s-2").unwrap().as_deref(), Some("[2,3]"));
    }

    #[test]
    fn test_file_missing_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("none.json")).unwrap();
        assert!(storage.keys().unwrap().is_empty());
        assert_eq!(storage.name(), "file");
    }

    #[test]
    fn test_file_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        match FileStorage::open(&path) {
            Err(StorageError::Serialization(_)) => {}
            other => panic!("Expected Serialization error, got {:?}", other.map(|_| ())),
        }
    }
}
