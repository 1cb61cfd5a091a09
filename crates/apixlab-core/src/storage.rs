//! Durable key-value storage.
//!
//! [`FileStorage`] keeps all entries in a single JSON object file written with
//! restricted permissions (0600). Values are opaque strings; the session
//! layer stores its own JSON encoding under a fixed key.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{AuthError, AuthResult};

/// Durable string key-value capability.
pub trait KeyValueStorage: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    /// Returns a storage error if the backing store cannot be read.
    fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns a storage error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> AuthResult<()>;
}

/// JSON-file backed storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

type Entries = BTreeMap<String, String>;

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> AuthResult<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            AuthError::storage(format!("Failed to read {}", self.path.display()))
                .with_details(e.to_string())
        })?;

        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                // Corrupt file is treated as empty; the next write replaces it.
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt storage file");
                Ok(Entries::new())
            }
        }
    }

    fn save(&self, entries: &Entries) -> AuthResult<()> {
        let path = &self.path;
        let io_err = |what: &str, e: std::io::Error| {
            AuthError::storage(format!("Failed to {what} {}", path.display()))
                .with_details(e.to_string())
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| io_err("create directory for", e))?;
        }

        let contents = serde_json::to_string_pretty(entries).map_err(|e| {
            AuthError::storage("Failed to serialize storage").with_details(e.to_string())
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .map_err(|e| io_err("open", e))?;
            file.write_all(contents.as_bytes())
                .map_err(|e| io_err("write", e))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .map_err(|e| io_err("open", e))?;
            file.write_all(contents.as_bytes())
                .map_err(|e| io_err("write", e))?;
        }

        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }
}

/// In-memory storage for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Entries>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("storage.json");

        FileStorage::new(&path).set("a", "1").unwrap();
        FileStorage::new(&path).set("b", "2").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(storage.get("c").unwrap(), None);
    }

    #[test]
    fn test_file_storage_overwrites_value() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));

        storage.set("k", "v1").unwrap();
        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_file_storage_recovers_from_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        FileStorage::new(&path).set("k", "v").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(storage.get("other").unwrap(), None);
    }
}
