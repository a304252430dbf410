//! Resolution of user-supplied task selectors.

use std::sync::Arc;

use anyhow::{Result, bail};
use tasklist_core::{Projection, Task, TaskId};

/// Resolve `selector` to a task id.
///
/// A number within range picks the row with that position in the rendered
/// order (active rows first, then completed rows). Anything else, including
/// numbers past the last row, is matched as an id prefix against every known
/// task and must be unambiguous.
pub fn resolve(selector: &str, projection: &Projection, tasks: &[Arc<Task>]) -> Result<TaskId> {
    let selector = selector.trim();
    if selector.is_empty() {
        bail!("missing task selector");
    }

    let by_position = selector
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .and_then(|idx| projection.visible().nth(idx));
    if let Some(task) = by_position {
        return Ok(task.id().clone());
    }

    let mut matches = tasks.iter().filter(|task| task.id().starts_with(selector));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id().clone()),
        (Some(_), Some(_)) => bail!("task id prefix '{selector}' is ambiguous"),
        (None, _) => bail!("no task matches '{selector}'"),
    }
}

/// Shortest prefix length that tells every id apart, but at least `min`.
pub fn unique_prefix_len<'a>(ids: impl IntoIterator<Item = &'a TaskId>, min: usize) -> usize {
    let mut ids: Vec<&str> = ids.into_iter().map(TaskId::as_str).collect();
    ids.sort_unstable();
    let shared = ids
        .windows(2)
        .map(|pair| common_prefix(pair[0], pair[1]) + 1)
        .max()
        .unwrap_or(0);
    let longest = ids.iter().map(|id| id.chars().count()).max().unwrap_or(0);
    shared.max(min).min(longest.max(min))
}

fn common_prefix(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
