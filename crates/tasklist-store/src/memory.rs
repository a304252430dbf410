//! In-process document collection.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::document::{Document, DocumentCollection, Fields};
use crate::error::StorageError;

/// Document collection living in process memory.
///
/// Clones share the same documents, so several providers attached to one
/// collection behave like devices syncing through a hosted store. Concurrent
/// writes resolve as last writer wins.
#[derive(Debug, Clone)]
pub struct InMemoryCollection {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    name: String,
    docs: Mutex<Vec<Document>>,
    available: AtomicBool,
    tx: watch::Sender<Vec<Document>>,
}

impl InMemoryCollection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                docs: Mutex::new(Vec::new()),
                available: AtomicBool::new(true),
                tx,
            }),
        }
    }

    /// Simulate an outage: while unavailable every write fails.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Write raw documents without validation, as another client might.
    pub fn put_raw(&self, doc: Document) {
        self.inner.write(|docs| {
            docs.retain(|existing| existing.id != doc.id);
            docs.push(doc);
            Ok(())
        })
        .unwrap_or_else(|err| debug!(error = %err, "Raw document write rejected"));
    }

    /// Current documents in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.inner.lock().clone()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Vec<Document>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, apply: impl FnOnce(&mut Vec<Document>) -> Result<(), StorageError>) -> Result<(), StorageError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("collection '{}' is offline", self.name)));
        }
        let mut docs = self.lock();
        apply(&mut docs)?;
        let snapshot = docs.clone();
        drop(docs);
        self.tx.send_replace(snapshot);
        Ok(())
    }
}

impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn insert(&self, id: String, fields: Fields) -> impl Future<Output = Result<(), StorageError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        async move {
            tokio::task::yield_now().await;
            inner.write(|docs| {
                docs.retain(|doc| doc.id != id);
                docs.push(Document { id, fields });
                Ok(())
            })
        }
    }

    fn update(&self, id: String, fields: Fields) -> impl Future<Output = Result<(), StorageError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        async move {
            tokio::task::yield_now().await;
            inner.write(|docs| {
                let doc = docs
                    .iter_mut()
                    .find(|doc| doc.id == id)
                    .ok_or_else(|| StorageError::DocumentNotFound(id.clone()))?;
                doc.fields.extend(fields);
                Ok(())
            })
        }
    }

    fn delete(&self, id: String) -> impl Future<Output = Result<(), StorageError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        async move {
            tokio::task::yield_now().await;
            inner.write(|docs| {
                let before = docs.len();
                docs.retain(|doc| doc.id != id);
                if docs.len() == before {
                    return Err(StorageError::DocumentNotFound(id));
                }
                Ok(())
            })
        }
    }

    fn listen(&self) -> watch::Receiver<Vec<Document>> {
        self.inner.tx.subscribe()
    }
}
