//! Storage providers for tasklist.
//!
//! Two interchangeable providers persist the task list: a synchronous
//! [`LocalSnapshotProvider`] that rewrites the whole set under one key, and an
//! asynchronous [`RealtimeProvider`] that mirrors a document collection and
//! pushes every change to its subscribers.

pub mod document;
pub mod error;
pub mod local;
pub mod memory;
pub mod realtime;
pub mod ticket;

pub use document::{Document, DocumentCollection, Fields, task_from_document, task_to_fields};
pub use error::StorageError;
pub use local::{
    DEFAULT_SNAPSHOT_KEY, FileKeyValueStore, KeyValueStore, LocalSnapshotProvider, MemoryKeyValueStore,
};
pub use memory::InMemoryCollection;
pub use realtime::RealtimeProvider;
pub use ticket::{WriteOutcome, WriteReporter, WriteTicket};

use std::fmt;
use tasklist_core::{Task, TaskId, Timestamp};

/// How a provider delivers the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// The list is read once with [`StorageProvider::load`]; local edits are authoritative.
    Snapshot,
    /// The list arrives through [`StorageProvider::subscribe`]; every push replaces local state.
    Push,
}

/// Callback receiving the full task sequence after every backend change.
pub type SnapshotCallback = Box<dyn Fn(Vec<Task>) + Send + Sync + 'static>;

/// Handle of an active subscription. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap the teardown routine of a subscription.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Record returned by [`StorageProvider::create`].
#[derive(Debug)]
pub struct Created {
    /// Newly assigned record.
    pub task: Task,
    /// Outcome of persisting the record.
    pub write: WriteTicket,
}

/// Pluggable persistence backend for the task list.
pub trait StorageProvider {
    /// Delivery mode of the provider.
    fn sync_mode(&self) -> SyncMode;

    /// Best-effort snapshot of the stored tasks.
    ///
    /// Never fails: unreadable or corrupt data yields an empty list.
    fn load(&self) -> Vec<Task>;

    /// Register `callback` for full-sequence pushes.
    ///
    /// Returns `None` for providers without push support.
    fn subscribe(&self, callback: SnapshotCallback) -> Option<Subscription>;

    /// Assign an id and creation time to `text` and persist the new record.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidRecord`] when the text is blank.
    fn create(&self, text: &str) -> Result<Created, StorageError>;

    /// Set the completion time of a task. Already completed tasks are left untouched.
    fn mark_complete(&self, id: &TaskId, at: Timestamp) -> WriteTicket;

    /// Delete a task in any state.
    fn remove(&self, id: &TaskId) -> WriteTicket;

    /// Persist a new display order. Providers that do not store order skip it.
    fn persist_order(&self, _order: &[TaskId]) -> WriteTicket {
        WriteTicket::skipped()
    }
}

impl<P: StorageProvider + ?Sized> StorageProvider for Box<P> {
    fn sync_mode(&self) -> SyncMode {
        (**self).sync_mode()
    }

    fn load(&self) -> Vec<Task> {
        (**self).load()
    }

    fn subscribe(&self, callback: SnapshotCallback) -> Option<Subscription> {
        (**self).subscribe(callback)
    }

    fn create(&self, text: &str) -> Result<Created, StorageError> {
        (**self).create(text)
    }

    fn mark_complete(&self, id: &TaskId, at: Timestamp) -> WriteTicket {
        (**self).mark_complete(id, at)
    }

    fn remove(&self, id: &TaskId) -> WriteTicket {
        (**self).remove(id)
    }

    fn persist_order(&self, order: &[TaskId]) -> WriteTicket {
        (**self).persist_order(order)
    }
}

/// Keep the first occurrence of every id, logging the rest.
pub(crate) fn dedupe_ids(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = std::collections::HashSet::with_capacity(tasks.len());
    tasks
        .into_iter()
        .filter(|task| {
            let fresh = seen.insert(task.id().clone());
            if !fresh {
                tracing::warn!(id = %task.id(), "Dropping duplicate task id");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscription_cancels_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let id: TaskId = "same".parse().unwrap_or_else(|err| panic!("must parse id: {err}"));
        let first = Task::new(id.clone(), "first", Timestamp::from_unix_millis(1))
            .unwrap_or_else(|err| panic!("must create task: {err}"));
        let second = Task::new(id, "second", Timestamp::from_unix_millis(2))
            .unwrap_or_else(|err| panic!("must create task: {err}"));
        let kept = dedupe_ids(vec![first, second]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text(), "first");
    }
}
