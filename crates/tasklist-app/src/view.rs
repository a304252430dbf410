//! Memoized projection of a [`TaskStore`].

use tasklist_core::{CompletionFilter, Projection, ViewCriteria};
use tracing::trace;

use crate::task_store::TaskStore;

/// Display state of the task list plus the last computed projection.
///
/// The projection is recomputed only when the store revision or the criteria
/// change. A `ListView` is meant to follow a single store.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    criteria: ViewCriteria,
    show_completed: bool,
    cached: Option<(u64, Projection)>,
}

impl ListView {
    /// View with the given criteria and completed section visibility.
    #[must_use]
    pub const fn new(criteria: ViewCriteria, show_completed: bool) -> Self {
        Self {
            criteria,
            show_completed,
            cached: None,
        }
    }

    /// Current criteria.
    #[must_use]
    pub const fn criteria(&self) -> &ViewCriteria {
        &self.criteria
    }

    /// Whether the completed section is expanded.
    #[must_use]
    pub const fn show_completed(&self) -> bool {
        self.show_completed
    }

    /// Replace the search query.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.criteria.query != query {
            self.criteria.query = query;
            self.cached = None;
        }
    }

    /// Replace the completion filter.
    pub fn set_filter(&mut self, filter: CompletionFilter) {
        if self.criteria.filter != filter {
            self.criteria.filter = filter;
            self.cached = None;
        }
    }

    /// Expand or collapse the completed section. Returns the new state.
    pub const fn toggle_completed(&mut self) -> bool {
        self.show_completed = !self.show_completed;
        self.show_completed
    }

    /// Projection of `store` under the current criteria.
    pub fn project<P>(&mut self, store: &TaskStore<P>) -> &Projection {
        let revision = store.revision();
        let stale = !matches!(&self.cached, Some((cached, _)) if *cached == revision);
        if stale {
            trace!(revision, "Recomputing projection");
            self.cached = Some((revision, Projection::compute(store.tasks(), &self.criteria)));
        }
        let (_, projection) = self.cached.get_or_insert_with(|| (revision, Projection::default()));
        projection
    }
}
