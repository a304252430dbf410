use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Task, TextMatcher};

/// Which completion states a projection keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionFilter {
    /// Keep active and completed tasks.
    #[default]
    All,
    /// Keep only active tasks.
    Active,
    /// Keep only completed tasks.
    Completed,
}

impl CompletionFilter {
    /// String representation used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Returns true when active tasks pass the filter.
    #[must_use]
    pub const fn keeps_active(self) -> bool {
        matches!(self, Self::All | Self::Active)
    }

    /// Returns true when completed tasks pass the filter.
    #[must_use]
    pub const fn keeps_completed(self) -> bool {
        matches!(self, Self::All | Self::Completed)
    }
}

impl fmt::Display for CompletionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!("unknown completion filter '{other}' (expected all, active or completed)")),
        }
    }
}

/// Inputs of a projection besides the canonical sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCriteria {
    /// Raw search query; trimmed and case-folded when matching.
    pub query: String,
    /// Completion filter.
    pub filter: CompletionFilter,
}

impl ViewCriteria {
    /// Replace the search query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Replace the completion filter.
    #[must_use]
    pub const fn with_filter(mut self, filter: CompletionFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Counters over the whole canonical sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Number of tasks.
    pub total: usize,
    /// Number of tasks without a completion time.
    pub active: usize,
    /// Number of completed tasks.
    pub completed: usize,
}

/// Active and completed sub-lists derived from the canonical sequence.
///
/// Both lists keep canonical order and share the canonical allocations, so
/// unchanged records keep their identity across recomputations.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    /// Matching tasks that are still active.
    pub active: Vec<Arc<Task>>,
    /// Matching tasks that are completed.
    pub completed: Vec<Arc<Task>>,
    /// Counters over the unfiltered sequence.
    pub summary: Summary,
}

impl Projection {
    /// Derive the projection of `tasks` under `criteria`.
    #[must_use]
    pub fn compute(tasks: &[Arc<Task>], criteria: &ViewCriteria) -> Self {
        let matcher = TextMatcher::new(&criteria.query);
        let mut projection = Self::default();

        for task in tasks {
            projection.summary.total += 1;
            if task.is_completed() {
                projection.summary.completed += 1;
            } else {
                projection.summary.active += 1;
            }

            if matcher.as_ref().is_some_and(|m| !m.matches(task)) {
                continue;
            }
            if task.is_completed() {
                if criteria.filter.keeps_completed() {
                    projection.completed.push(Arc::clone(task));
                }
            } else if criteria.filter.keeps_active() {
                projection.active.push(Arc::clone(task));
            }
        }

        projection
    }

    /// Iterate visible tasks: active first, then completed.
    pub fn visible(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.active.iter().chain(self.completed.iter())
    }

    /// Returns true when neither sub-list has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }
}
