//! Subcommand dispatch and the intents shared with the shell.

use std::path::Path;

use anyhow::Result;
use tasklist_app::{Direction, ListView, TaskStore, TasklistConfig, open_provider};
use tasklist_core::TaskId;
use tasklist_store::{StorageError, StorageProvider, WriteOutcome, WriteTicket};
use tracing::warn;

use crate::render::{Layout, render};
use crate::selector::{resolve, unique_prefix_len};
use crate::{Command, shell};

const MIN_ID_WIDTH: usize = 8;

/// A mutation requested by the user. Selectors are resolved against the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Add(String),
    Complete(String),
    Remove(String),
    Move(String, Direction),
}

/// Result of applying an intent.
#[derive(Debug)]
pub struct Applied {
    pub message: String,
    pub write: Option<WriteTicket>,
}

impl Applied {
    const fn changed(message: String, write: WriteTicket) -> Self {
        Self {
            message,
            write: Some(write),
        }
    }

    const fn unchanged(message: String) -> Self {
        Self { message, write: None }
    }
}

/// Open the configured store and execute `command`.
pub async fn run(command: Command, config: &TasklistConfig, fallback_dir: &Path) -> Result<()> {
    let provider = open_provider(&config.storage, fallback_dir)?;
    let mut store = TaskStore::open(provider);
    let mut view = ListView::new(config.view.criteria(), config.view.show_completed);

    // Push providers deliver the current list as their first update.
    if store.is_subscribed() && !store.next_update().await {
        warn!("Subscription ended before the first snapshot");
    }

    let intent = match command {
        Command::Shell => return shell::run(store, view).await,
        Command::Ls { query, filter, all } => {
            if let Some(query) = query {
                view.set_query(query);
            }
            if let Some(filter) = filter {
                view.set_filter(filter);
            }
            if all && !view.show_completed() {
                view.toggle_completed();
            }
            print!("{}", screen(&store, &mut view));
            return Ok(());
        }
        Command::Add { text } => Intent::Add(text.join(" ")),
        Command::Done { selector } => Intent::Complete(selector),
        Command::Rm { selector } => Intent::Remove(selector),
        Command::Up { selector } => Intent::Move(selector, Direction::Up),
        Command::Down { selector } => Intent::Move(selector, Direction::Down),
    };

    let applied = apply(intent, &mut store, &mut view)?;
    println!("{}", applied.message);
    if let Some(write) = applied.write {
        settle(write).await;
    }
    store.close();
    Ok(())
}

/// Apply `intent` to the store.
///
/// Fails only when a selector cannot be resolved; no-op intents succeed with
/// an explanatory message.
pub fn apply<P: StorageProvider>(intent: Intent, store: &mut TaskStore<P>, view: &mut ListView) -> Result<Applied> {
    let applied = match intent {
        Intent::Add(text) => match store.add_task(&text) {
            Some(added) => Applied::changed(format!("Added \"{}\"", text.trim()), added.write),
            None => Applied::unchanged("Nothing to add".to_owned()),
        },
        Intent::Complete(selector) => {
            let (id, text) = select(&selector, store, view)?;
            match store.complete_task(&id) {
                Some(write) => Applied::changed(format!("Completed \"{text}\""), write),
                None => Applied::unchanged(format!("\"{text}\" is already completed")),
            }
        }
        Intent::Remove(selector) => {
            let (id, text) = select(&selector, store, view)?;
            match store.remove_task(&id) {
                Some(write) => Applied::changed(format!("Removed \"{text}\""), write),
                None => Applied::unchanged(format!("\"{text}\" is already gone")),
            }
        }
        Intent::Move(selector, direction) => {
            let (id, text) = select(&selector, store, view)?;
            let locked = store.get(&id).is_some_and(|task| task.is_completed());
            match store.move_task(&id, direction) {
                Some(write) => Applied::changed(format!("Moved \"{text}\" {direction}"), write),
                None if locked => Applied::unchanged(format!("\"{text}\" is completed and locked")),
                None => {
                    let end = match direction {
                        Direction::Up => "top",
                        Direction::Down => "bottom",
                    };
                    Applied::unchanged(format!("\"{text}\" is already at the {end}"))
                }
            }
        }
    };
    Ok(applied)
}

/// Wait for a write and warn when it was not persisted.
pub async fn settle(write: WriteTicket) {
    if let Some(err) = write_error(write).await {
        eprintln!("{}", unsaved(&err));
    }
}

/// Wait for a write and return its error, if any.
pub async fn write_error(write: WriteTicket) -> Option<StorageError> {
    match write.outcome().await {
        WriteOutcome::Failed(err) => Some(err),
        WriteOutcome::Persisted | WriteOutcome::Skipped => None,
    }
}

/// Warning shown for a change that was not persisted.
pub fn unsaved(err: &StorageError) -> String {
    format!("warning: change was not saved: {err}")
}

/// Render the current view of `store`.
pub fn screen<P>(store: &TaskStore<P>, view: &mut ListView) -> String {
    let layout = Layout {
        show_completed: view.show_completed(),
        id_width: unique_prefix_len(store.tasks().iter().map(|task| task.id()), MIN_ID_WIDTH),
    };
    let criteria = view.criteria().clone();
    render(view.project(store), &criteria, layout)
}

fn select<P>(selector: &str, store: &TaskStore<P>, view: &mut ListView) -> Result<(TaskId, String)> {
    let id = resolve(selector, view.project(store), store.tasks())?;
    let text = store.get(&id).map(|task| task.text().to_owned()).unwrap_or_default();
    Ok((id, text))
}
