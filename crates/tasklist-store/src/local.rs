//! Local snapshot provider backed by a key-value store.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tasklist_core::{Task, TaskId, Timestamp};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::ticket::{WriteOutcome, WriteTicket};
use crate::{Created, SnapshotCallback, StorageProvider, Subscription, SyncMode, dedupe_ids};

/// Key under which the task array is stored unless configured otherwise.
pub const DEFAULT_SNAPSHOT_KEY: &str = "tasklist:tasks:v1";

/// String key-value persistence used by [`LocalSnapshotProvider`].
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns a storage error when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    /// Returns a storage error when the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Key-value store keeping one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (and create if needed) the directory holding the values.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the value files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|err| StorageError::Io(err.error))?;
        Ok(())
    }
}

/// In-memory key-value store with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryKeyValueStore {
    /// Empty store without quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store rejecting values larger than `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(quota),
        }
    }

    /// Seed a raw value, bypassing the quota.
    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.lock().insert(key.to_owned(), value.to_owned());
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota
            && value.len() > quota
        {
            return Err(StorageError::QuotaExceeded {
                needed: value.len(),
                quota,
            });
        }
        self.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for &K {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Synchronous provider that rewrites the whole task array on every mutation.
#[derive(Debug)]
pub struct LocalSnapshotProvider<K> {
    kv: K,
    key: String,
    tasks: Mutex<Vec<Task>>,
}

impl<K: KeyValueStore> LocalSnapshotProvider<K> {
    /// Open the snapshot stored under `key`.
    pub fn open(kv: K, key: impl Into<String>) -> Self {
        let key = key.into();
        let tasks = read_snapshot(&kv, &key);
        Self {
            kv,
            key,
            tasks: Mutex::new(tasks),
        }
    }

    /// Key under which the snapshot is stored.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the underlying key-value store.
    pub const fn kv(&self) -> &K {
        &self.kv
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, tasks: &[Task]) -> WriteOutcome {
        let result = serde_json::to_string(tasks)
            .map_err(StorageError::from)
            .and_then(|raw| self.kv.set(&self.key, &raw));
        match result {
            Ok(()) => {
                debug!(key = %self.key, count = tasks.len(), "Saved task snapshot");
                WriteOutcome::Persisted
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "Failed to save task snapshot");
                WriteOutcome::Failed(err)
            }
        }
    }
}

impl<K: KeyValueStore> StorageProvider for LocalSnapshotProvider<K> {
    fn sync_mode(&self) -> SyncMode {
        SyncMode::Snapshot
    }

    fn load(&self) -> Vec<Task> {
        let tasks = read_snapshot(&self.kv, &self.key);
        let mut current = self.lock();
        current.clone_from(&tasks);
        drop(current);
        tasks
    }

    fn subscribe(&self, _callback: SnapshotCallback) -> Option<Subscription> {
        None
    }

    fn create(&self, text: &str) -> Result<Created, StorageError> {
        let task = Task::new(TaskId::new(), text, Timestamp::now())?;
        let mut tasks = self.lock();
        tasks.insert(0, task.clone());
        let outcome = self.save(&tasks);
        drop(tasks);
        info!(id = %task.id(), "Created task");
        Ok(Created {
            task,
            write: WriteTicket::ready(outcome),
        })
    }

    fn mark_complete(&self, id: &TaskId, at: Timestamp) -> WriteTicket {
        let mut tasks = self.lock();
        let changed = tasks
            .iter_mut()
            .find(|task| task.id() == id)
            .is_some_and(|task| task.complete(at));
        if !changed {
            return WriteTicket::skipped();
        }
        WriteTicket::ready(self.save(&tasks))
    }

    fn remove(&self, id: &TaskId) -> WriteTicket {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|task| task.id() != id);
        if tasks.len() == before {
            return WriteTicket::skipped();
        }
        WriteTicket::ready(self.save(&tasks))
    }

    fn persist_order(&self, order: &[TaskId]) -> WriteTicket {
        let mut tasks = self.lock();
        let rank: HashMap<&TaskId, usize> = order.iter().enumerate().map(|(idx, id)| (id, idx)).collect();
        let mut reordered = tasks.clone();
        // Records missing from `order` keep their relative position at the end.
        reordered.sort_by_key(|task| rank.get(task.id()).copied().unwrap_or(usize::MAX));
        if reordered == *tasks {
            return WriteTicket::skipped();
        }
        *tasks = reordered;
        WriteTicket::ready(self.save(&tasks))
    }
}

fn read_snapshot<K: KeyValueStore + ?Sized>(kv: &K, key: &str) -> Vec<Task> {
    match kv.get(key) {
        Ok(Some(raw)) => decode_snapshot(&raw),
        Ok(None) => {
            debug!(%key, "No task snapshot stored yet");
            Vec::new()
        }
        Err(err) => {
            warn!(%key, error = %err, "Failed to read task snapshot");
            Vec::new()
        }
    }
}

/// Decode a serialized task array.
///
/// Anything other than a JSON array yields an empty list; invalid elements are
/// skipped individually.
#[must_use]
pub fn decode_snapshot(raw: &str) -> Vec<Task> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "Ignoring corrupt task snapshot");
            return Vec::new();
        }
    };
    let Value::Array(items) = value else {
        warn!("Ignoring task snapshot that is not an array");
        return Vec::new();
    };

    let tasks = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<Task>(item) {
            Ok(task) => Some(task),
            Err(err) => {
                warn!(index = idx, error = %err, "Skipping invalid task record");
                None
            }
        })
        .collect();
    dedupe_ids(tasks)
}
