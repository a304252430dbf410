use crate::Task;

/// Case-insensitive substring matcher for task text.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Determine whether the task text contains the query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        task.text().to_lowercase().contains(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TaskId, Timestamp};

    fn task(text: &str) -> Task {
        Task::new(TaskId::new(), text, Timestamp::from_unix_millis(0))
            .unwrap_or_else(|err| panic!("must create task: {err}"))
    }

    #[test]
    fn matcher_skips_blank_queries() {
        assert!(TextMatcher::new("").is_none());
        assert!(TextMatcher::new("   ").is_none());
        assert!(TextMatcher::new("\n").is_none());
    }

    #[test]
    fn matcher_respects_case_insensitive_search() {
        let moon = task("Moon walk");

        let matcher =
            TextMatcher::new("moo").unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(matcher.matches(&moon));

        let matcher =
            TextMatcher::new("  WALK ").unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(matcher.matches(&moon));

        let missing =
            TextMatcher::new("zzz").unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(!missing.matches(&moon));
    }

    #[test]
    fn matcher_folds_non_ascii_case() {
        let task = task("ÜBER Café");
        let matcher =
            TextMatcher::new("über café").unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(matcher.matches(&task));
    }
}
