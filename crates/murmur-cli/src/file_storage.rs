//! JSON file storage.
//!
//! The whole file is one JSON object of string keys to string values. Every
//! operation re-reads the file, so separate processes sharing a state file
//! see each other's writes. Writes go to a sibling temporary file that is
//! then renamed over the target.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use murmur_store::{Storage, StorageError};

/// [`Storage`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: Arc<PathBuf>,
}

impl FileStorage {
    /// Open the state file at `path`. A missing file is empty storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let storage = Self { path: Arc::new(path.as_ref().to_path_buf()) };
        storage.load()?;
        Ok(storage)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(self.path.as_path()) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                StorageError::Corrupted(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(format!("{}: {e}", self.path.display()))),
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| StorageError::Corrupted(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, self.path.as_path()))
            .map_err(|e| StorageError::Io(format!("{}: {e}", self.path.display())))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.load()?;
        values.insert(key.to_owned(), value.to_owned());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.load()?;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.save(&values)
    }
}
