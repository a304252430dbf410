//! Canonical task sequence and the intents that mutate it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tasklist_core::{Task, TaskId, Timestamp};
use tasklist_store::{StorageProvider, Subscription, SyncMode, WriteTicket};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Direction of a reorder intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the front of the list.
    Up,
    /// Towards the back of the list.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown direction '{other}' (expected up or down)")),
        }
    }
}

/// Result of a successful add intent.
#[derive(Debug)]
pub struct Added {
    /// Identifier assigned by the provider.
    pub id: TaskId,
    /// Outcome of persisting the new record.
    pub write: WriteTicket,
}

/// Owner of the canonical task sequence.
///
/// Snapshot providers are loaded once and local edits stay authoritative.
/// Push providers replace the whole sequence on every update, so local
/// reordering only lasts until the next push.
pub struct TaskStore<P> {
    provider: P,
    tasks: Vec<Arc<Task>>,
    revision: u64,
    updates: Option<mpsc::UnboundedReceiver<Vec<Task>>>,
    subscription: Option<Subscription>,
}

impl<P> TaskStore<P> {
    /// Canonical sequence.
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    /// Look up a task by id.
    pub fn get(&self, id: &TaskId) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true when there are no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Counter bumped on every change of the canonical sequence.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Borrow the storage provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns true while pushes from the provider are being received.
    pub const fn is_subscribed(&self) -> bool {
        self.updates.is_some()
    }

    /// Tear down the subscription, if any. Pending pushes are discarded.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!("Closed task subscription");
        }
        self.updates = None;
    }

    /// Replace the canonical sequence wholesale.
    ///
    /// Records equal to the current ones keep their allocation; duplicate ids
    /// keep their first occurrence.
    pub fn apply_snapshot(&mut self, incoming: Vec<Task>) {
        let mut previous: HashMap<TaskId, Arc<Task>> = self
            .tasks
            .drain(..)
            .map(|task| (task.id().clone(), task))
            .collect();
        let mut next: Vec<Arc<Task>> = Vec::with_capacity(incoming.len());
        let mut seen: HashSet<TaskId> = HashSet::with_capacity(incoming.len());
        for task in incoming {
            if !seen.insert(task.id().clone()) {
                warn!(id = %task.id(), "Ignoring duplicate task in snapshot");
                continue;
            }
            let reused = previous
                .remove(task.id())
                .filter(|existing| **existing == task)
                .unwrap_or_else(|| Arc::new(task));
            next.push(reused);
        }
        self.tasks = next;
        self.bump();
        debug!(count = self.tasks.len(), revision = self.revision, "Applied task snapshot");
    }

    /// Apply every push received so far, in order. Returns how many were applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(updates) = self.updates.as_mut() {
            while let Ok(tasks) = updates.try_recv() {
                pending.push(tasks);
            }
        }
        let applied = pending.len();
        for tasks in pending {
            self.apply_snapshot(tasks);
        }
        applied
    }

    /// Wait for the next push and apply it.
    ///
    /// Returns false once the subscription has ended. Never resolves for
    /// snapshot providers, which makes it usable as a `select!` branch.
    pub async fn next_update(&mut self) -> bool {
        let received = match self.updates.as_mut() {
            Some(updates) => updates.recv().await,
            None => return std::future::pending().await,
        };
        match received {
            Some(tasks) => {
                self.apply_snapshot(tasks);
                true
            }
            None => {
                warn!("Task subscription ended");
                self.updates = None;
                self.subscription = None;
                false
            }
        }
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == id)
    }
}

impl<P: StorageProvider> TaskStore<P> {
    /// Build a store over `provider`, loading or subscribing depending on its mode.
    pub fn open(provider: P) -> Self {
        let mut store = Self {
            provider,
            tasks: Vec::new(),
            revision: 0,
            updates: None,
            subscription: None,
        };

        match store.provider.sync_mode() {
            SyncMode::Snapshot => {
                let tasks = store.provider.load();
                info!(count = tasks.len(), "Loaded task snapshot");
                store.apply_snapshot(tasks);
            }
            SyncMode::Push => {
                let (tx, rx) = mpsc::unbounded_channel();
                store.subscription = store.provider.subscribe(Box::new(move |tasks| {
                    // The receiver is gone once the store is closed.
                    let _ = tx.send(tasks);
                }));
                if store.subscription.is_some() {
                    store.updates = Some(rx);
                } else {
                    warn!("Push provider refused subscription; falling back to a snapshot");
                    let tasks = store.provider.load();
                    store.apply_snapshot(tasks);
                }
            }
        }
        store
    }

    /// Delivery mode of the provider.
    pub fn sync_mode(&self) -> SyncMode {
        self.provider.sync_mode()
    }

    /// Add a task. Blank text is ignored.
    ///
    /// Snapshot providers get the new record prepended right away; push
    /// providers show it once the backend echoes it back.
    pub fn add_task(&mut self, text: &str) -> Option<Added> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank task text");
            return None;
        }

        let created = match self.provider.create(text) {
            Ok(created) => created,
            Err(err) => {
                warn!(error = %err, "Provider rejected new task");
                return None;
            }
        };
        let id = created.task.id().clone();
        if self.provider.sync_mode() == SyncMode::Snapshot {
            self.tasks.insert(0, Arc::new(created.task));
            self.bump();
        }
        info!(%id, "Added task");
        Some(Added {
            id,
            write: created.write,
        })
    }

    /// Complete an active task. Unknown or completed tasks are left alone.
    pub fn complete_task(&mut self, id: &TaskId) -> Option<WriteTicket> {
        let idx = self.position(id)?;
        if self.tasks[idx].is_completed() {
            debug!(%id, "Task already completed");
            return None;
        }

        let at = Timestamp::now();
        let write = self.provider.mark_complete(id, at);
        Arc::make_mut(&mut self.tasks[idx]).complete(at);
        self.bump();
        info!(%id, "Completed task");
        Some(write)
    }

    /// Remove a task in any state. Unknown ids are ignored.
    pub fn remove_task(&mut self, id: &TaskId) -> Option<WriteTicket> {
        let idx = self.position(id)?;
        let write = self.provider.remove(id);
        self.tasks.remove(idx);
        self.bump();
        info!(%id, "Removed task");
        Some(write)
    }

    /// Swap an active task with its nearest active neighbour in the canonical sequence.
    ///
    /// Completed tasks are locked in place: they cannot be moved and are
    /// stepped over. Moving past either end is a no-op.
    pub fn move_task(&mut self, id: &TaskId, direction: Direction) -> Option<WriteTicket> {
        let idx = self.position(id)?;
        if self.tasks[idx].is_completed() {
            debug!(%id, "Completed tasks are locked in place");
            return None;
        }
        let is_active = |i: &usize| !self.tasks[*i].is_completed();
        let Some(target) = (match direction {
            Direction::Up => (0..idx).rev().find(is_active),
            Direction::Down => (idx + 1..self.tasks.len()).find(is_active),
        }) else {
            debug!(%id, %direction, "Move clamped at the end of the list");
            return None;
        };

        self.tasks.swap(idx, target);
        self.bump();
        debug!(%id, %direction, from = idx, to = target, "Moved task");
        let order: Vec<TaskId> = self.tasks.iter().map(|task| task.id().clone()).collect();
        Some(self.provider.persist_order(&order))
    }
}

impl<P> fmt::Debug for TaskStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("revision", &self.revision)
            .field("subscribed", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}
