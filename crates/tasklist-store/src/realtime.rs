//! Realtime provider mirroring a document collection.

use std::cmp::Reverse;
use std::future::Future;

use serde_json::Value;
use tasklist_core::{Task, TaskId, Timestamp};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentCollection, FIELD_COMPLETED_AT, Fields, task_from_document, task_to_fields};
use crate::error::StorageError;
use crate::ticket::{WriteOutcome, WriteTicket};
use crate::{Created, SnapshotCallback, StorageProvider, Subscription, SyncMode, dedupe_ids};

/// Provider that pushes the collection to subscribers and writes without waiting.
///
/// Every write is spawned onto the runtime; its outcome is available through
/// the returned [`WriteTicket`].
#[derive(Debug, Clone)]
pub struct RealtimeProvider<C> {
    collection: C,
    runtime: Handle,
}

impl<C: DocumentCollection + Clone> RealtimeProvider<C> {
    /// Attach to `collection` using the current tokio runtime.
    ///
    /// # Errors
    /// Returns [`StorageError::NoRuntime`] outside of a tokio runtime.
    pub fn new(collection: C) -> Result<Self, StorageError> {
        let runtime = Handle::try_current().map_err(|_| StorageError::NoRuntime)?;
        Ok(Self::with_handle(collection, runtime))
    }

    /// Attach to `collection`, spawning work onto `runtime`.
    pub const fn with_handle(collection: C, runtime: Handle) -> Self {
        Self { collection, runtime }
    }

    /// Borrow the underlying collection.
    pub const fn collection(&self) -> &C {
        &self.collection
    }

    /// Spawn `write` and report its outcome. With `missing_ok`, a document
    /// deleted by another client in the meantime counts as a no-op.
    fn dispatch<F>(&self, op: &'static str, id: &TaskId, missing_ok: bool, write: F) -> WriteTicket
    where
        F: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        let (reporter, ticket) = WriteTicket::pending();
        let id = id.clone();
        let collection = self.collection.name().to_owned();
        self.runtime.spawn(async move {
            let outcome = match write.await {
                Err(StorageError::DocumentNotFound(_)) if missing_ok => {
                    debug!(op, %id, %collection, "Document already gone");
                    WriteOutcome::Skipped
                }
                result => WriteOutcome::from(result),
            };
            match outcome.error() {
                None => debug!(op, %id, %collection, "Remote write applied"),
                Some(err) => warn!(op, %id, %collection, error = %err, "Remote write failed"),
            }
            reporter.report(outcome);
        });
        ticket
    }

    fn current_document(&self, id: &TaskId) -> Option<Document> {
        self.collection
            .listen()
            .borrow()
            .iter()
            .find(|doc| doc.id == id.as_str())
            .cloned()
    }
}

impl<C: DocumentCollection + Clone> StorageProvider for RealtimeProvider<C> {
    fn sync_mode(&self) -> SyncMode {
        SyncMode::Push
    }

    fn load(&self) -> Vec<Task> {
        decode_documents(&self.collection.listen().borrow())
    }

    fn subscribe(&self, callback: SnapshotCallback) -> Option<Subscription> {
        let mut rx = self.collection.listen();
        let collection = self.collection.name().to_owned();
        let handle = self.runtime.spawn(async move {
            loop {
                let tasks = decode_documents(&rx.borrow_and_update());
                debug!(%collection, count = tasks.len(), "Delivering collection snapshot");
                callback(tasks);
                if rx.changed().await.is_err() {
                    debug!(%collection, "Collection closed; ending subscription");
                    break;
                }
            }
        });
        info!(collection = %self.collection.name(), "Subscribed to collection");
        Some(Subscription::new(move || handle.abort()))
    }

    fn create(&self, text: &str) -> Result<Created, StorageError> {
        let id: TaskId = self.collection.allocate_id().parse()?;
        let task = Task::new(id, text, Timestamp::now())?;
        let write = self.dispatch(
            "create",
            task.id(),
            false,
            self.collection.insert(task.id().to_string(), task_to_fields(&task)),
        );
        Ok(Created { task, write })
    }

    fn mark_complete(&self, id: &TaskId, at: Timestamp) -> WriteTicket {
        let Some(doc) = self.current_document(id) else {
            debug!(%id, "Task no longer in collection");
            return WriteTicket::skipped();
        };
        if doc.fields.get(FIELD_COMPLETED_AT).is_some_and(|value| !value.is_null()) {
            debug!(%id, "Task already completed remotely");
            return WriteTicket::skipped();
        }

        let mut fields = Fields::new();
        fields.insert(FIELD_COMPLETED_AT.into(), Value::from(at.unix_millis()));
        self.dispatch("complete", id, true, self.collection.update(id.to_string(), fields))
    }

    fn remove(&self, id: &TaskId) -> WriteTicket {
        if self.current_document(id).is_none() {
            debug!(%id, "Task no longer in collection");
            return WriteTicket::skipped();
        }
        self.dispatch("remove", id, true, self.collection.delete(id.to_string()))
    }
}

/// Validate documents and order them by creation time, newest first.
///
/// Documents failing the schema are logged and dropped.
#[must_use]
pub fn decode_documents(docs: &[Document]) -> Vec<Task> {
    let mut tasks: Vec<Task> = docs
        .iter()
        .filter_map(|doc| match task_from_document(doc) {
            Ok(task) => Some(task),
            Err(err) => {
                warn!(id = %doc.id, error = %err, "Discarding malformed document");
                None
            }
        })
        .collect();
    tasks.sort_by_key(|task| Reverse((task.created_at(), task.id().clone())));
    dedupe_ids(tasks)
}
