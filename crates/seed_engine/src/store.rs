use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use seed_core::PersistedJobRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PersistError;

pub const KEY_QUEUED: &str = "seed.queued";
pub const KEY_DOWNLOADED: &str = "seed.downloaded";
pub const KEY_TOTAL: &str = "seed.total";
pub const KEY_PHASE: &str = "seed.phase";
pub const KEY_LAST_ERROR: &str = "seed.last_error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreValue {
    Bool(bool),
    Int(u64),
    Text(String),
}

impl StoreValue {
    fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<u64> {
        match self {
            StoreValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            StoreValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write to {key} rejected: {reason}")]
    Rejected { key: String, reason: String },
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Durable, process-local scalar storage that survives relaunch.
///
/// Writes are last-write-wins per key; nothing is transactional across keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<StoreValue>;
    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Applies several changes in order; `None` removes the key.
    ///
    /// The default attempts every change even if one fails and returns the
    /// last failure. Stores that can write all changes at once should.
    fn write_batch(&self, changes: Vec<(&str, Option<StoreValue>)>) -> Result<(), StoreError> {
        let mut result = Ok(());
        for (key, value) in changes {
            let outcome = match value {
                Some(value) => self.set(key, value),
                None => self.remove(key),
            };
            if let Err(err) = outcome {
                result = Err(err);
            }
        }
        result
    }
}

/// Reads the job record; missing or mistyped fields read as absent.
pub fn load_record(store: &dyn KeyValueStore) -> PersistedJobRecord {
    PersistedJobRecord {
        queued: store
            .get(KEY_QUEUED)
            .and_then(|value| value.as_bool())
            .unwrap_or(false),
        downloaded: store
            .get(KEY_DOWNLOADED)
            .and_then(|value| value.as_int())
            .unwrap_or(0),
        total: store
            .get(KEY_TOTAL)
            .and_then(|value| value.as_int())
            .unwrap_or(0),
        phase: store.get(KEY_PHASE).and_then(StoreValue::into_text),
        last_error: store.get(KEY_LAST_ERROR).and_then(StoreValue::into_text),
    }
}

/// Writes every field of `record`, removing keys that hold the default value.
///
/// New values are written before stale keys are removed, so a store that
/// applies the batch key by key never passes through a shape that
/// reconstructs as `Idle` on the way from one active record to another.
pub fn save_record(
    store: &dyn KeyValueStore,
    record: &PersistedJobRecord,
) -> Result<(), StoreError> {
    let fields = [
        (
            KEY_LAST_ERROR,
            record.last_error.clone().map(StoreValue::Text),
        ),
        (KEY_PHASE, record.phase.clone().map(StoreValue::Text)),
        (KEY_QUEUED, record.queued.then_some(StoreValue::Bool(true))),
        (
            KEY_DOWNLOADED,
            (record.downloaded > 0).then_some(StoreValue::Int(record.downloaded)),
        ),
        (
            KEY_TOTAL,
            (record.total > 0).then_some(StoreValue::Int(record.total)),
        ),
    ];

    let (sets, removals): (Vec<_>, Vec<_>) =
        fields.into_iter().partition(|(_, value)| value.is_some());
    store.write_batch(sets.into_iter().chain(removals).collect())
}

/// In-memory store, used by tests and short-lived hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, StoreValue>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K: Into<String>>(values: impl IntoIterator<Item = (K, StoreValue)>) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(values.into_iter().map(|(key, value)| (key.into(), value)));
        store
    }

    /// Makes every subsequent `set`/`remove` fail until switched back.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BTreeMap<String, StoreValue> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                reason: "store is read-only".to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
