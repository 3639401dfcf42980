use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use seed_logging::{seed_debug, seed_warn};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{KeyValueStore, StoreError, StoreValue};

pub const STATE_FILENAME: &str = "seed_state.ron";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the state directory exists; create if missing.
pub fn ensure_state_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StateDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_state_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Key-value store kept as a single RON map inside a state directory.
///
/// Every write rewrites the whole file atomically, so a crash leaves either
/// the previous or the new map on disk.
pub struct RonFileStore {
    writer: AtomicFileWriter,
    path: PathBuf,
    values: Mutex<BTreeMap<String, StoreValue>>,
}

impl RonFileStore {
    /// Opens the store, reading whatever a previous process left behind.
    ///
    /// A missing file is an empty store; a corrupt one is logged and treated
    /// as empty.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        ensure_state_dir(&dir)?;
        let path = dir.join(STATE_FILENAME);
        let values = read_values(&path);
        Ok(Self {
            writer: AtomicFileWriter::new(dir),
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, StoreValue>) -> bool,
    ) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = values.clone();
        if !apply(&mut next) {
            return Ok(());
        }

        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&next, pretty)
            .map_err(|err| PersistError::Serialize(err.to_string()))?;
        self.writer.write(STATE_FILENAME, &content)?;
        *values = next;
        Ok(())
    }
}

impl KeyValueStore for RonFileStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        self.commit(|values| values.insert(key.to_string(), value.clone()) != Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.commit(|values| values.remove(key).is_some())
    }

    /// One file rewrite for the whole batch.
    fn write_batch(&self, changes: Vec<(&str, Option<StoreValue>)>) -> Result<(), StoreError> {
        self.commit(|values| {
            let mut changed = false;
            for (key, value) in changes {
                changed |= match value {
                    Some(value) => values.insert(key.to_string(), value.clone()) != Some(value),
                    None => values.remove(key).is_some(),
                };
            }
            changed
        })
    }
}

fn read_values(path: &Path) -> BTreeMap<String, StoreValue> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return BTreeMap::new();
        }
        Err(err) => {
            seed_warn!("Failed to read persisted state from {:?}: {}", path, err);
            return BTreeMap::new();
        }
    };

    match ron::from_str(&content) {
        Ok(values) => {
            seed_debug!("Loaded persisted state from {:?}", path);
            values
        }
        Err(err) => {
            seed_warn!("Failed to parse persisted state from {:?}: {}", path, err);
            BTreeMap::new()
        }
    }
}
