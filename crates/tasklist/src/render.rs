//! Plain-text rendering of a projection.

use std::borrow::Cow;
use std::fmt::Write as _;

use tasklist_core::{CompletionFilter, Projection, Task, Timestamp, ViewCriteria};
use time::macros::format_description;
use unicode_segmentation::UnicodeSegmentation;

const TEXT_WIDTH: usize = 40;
const LOCKED_MARKER: &str = "locked";

/// Options controlling how the list is laid out.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// Expand the completed section.
    pub show_completed: bool,
    /// Number of id characters shown per row.
    pub id_width: usize,
}

/// Render the projection as the text shown to the user.
pub fn render(projection: &Projection, criteria: &ViewCriteria, layout: Layout) -> String {
    let mut out = String::new();
    let summary = projection.summary;
    let _ = writeln!(
        out,
        "{} total · {} active · {} done",
        summary.total, summary.active, summary.completed
    );
    if let Some(line) = criteria_line(criteria) {
        let _ = writeln!(out, "{line}");
    }

    if summary.total == 0 {
        out.push_str("No tasks yet.\n");
        return out;
    }
    if projection.is_empty() {
        out.push_str("No tasks match.\n");
        return out;
    }

    for (idx, task) in projection.active.iter().enumerate() {
        out.push_str(&row(idx + 1, task, layout.id_width));
    }

    if criteria.filter.keeps_completed() && !projection.completed.is_empty() {
        let marker = if layout.show_completed { '▾' } else { '▸' };
        let _ = writeln!(out, "{marker} Completed ({})", projection.completed.len());
        if layout.show_completed {
            let offset = projection.active.len();
            for (idx, task) in projection.completed.iter().enumerate() {
                out.push_str(&row(offset + idx + 1, task, layout.id_width));
            }
        }
    }
    out
}

fn criteria_line(criteria: &ViewCriteria) -> Option<String> {
    let mut parts = Vec::new();
    if criteria.filter != CompletionFilter::All {
        parts.push(format!("filter: {}", criteria.filter));
    }
    if !criteria.query.trim().is_empty() {
        parts.push(format!("search: \"{}\"", criteria.query.trim()));
    }
    (!parts.is_empty()).then(|| parts.join(" · "))
}

fn row(position: usize, task: &Task, id_width: usize) -> String {
    let id: String = task.id().as_str().chars().take(id_width).collect();
    let text = pad(&truncate_with_ellipsis(task.text(), TEXT_WIDTH), TEXT_WIDTH);
    match task.completed_at() {
        Some(done) => format!(
            "{position:>3}. {text}  {LOCKED_MARKER:<6}  {id}  done {}\n",
            format_time(done)
        ),
        None => format!(
            "{position:>3}. {text}  {:<6}  {id}  {}\n",
            "",
            format_time(task.created_at())
        ),
    }
}

/// Format a timestamp in UTC, e.g. `2024-05-01 10:00 UTC`.
pub fn format_time(at: Timestamp) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    at.to_datetime()
        .and_then(|dt| dt.format(format).ok())
        .unwrap_or_else(|| format!("@{}ms", at.unix_millis()))
}

fn truncate_with_ellipsis(input: &str, max_graphemes: usize) -> Cow<'_, str> {
    const ELLIPSIS: &str = "...";
    const ELLIPSIS_GRAPHEMES: usize = 3;

    if input.graphemes(true).count() <= max_graphemes {
        return Cow::Borrowed(input);
    }
    if max_graphemes <= ELLIPSIS_GRAPHEMES {
        return Cow::Owned(input.graphemes(true).take(max_graphemes).collect());
    }

    let mut truncated: String = input.graphemes(true).take(max_graphemes - ELLIPSIS_GRAPHEMES).collect();
    truncated.push_str(ELLIPSIS);
    Cow::Owned(truncated)
}

fn pad(input: &str, width: usize) -> String {
    let len = input.graphemes(true).count();
    let mut padded = input.to_owned();
    padded.extend(std::iter::repeat_n(' ', width.saturating_sub(len)));
    padded
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    const LAYOUT: Layout = Layout {
        show_completed: true,
        id_width: 4,
    };

    fn task(id: &str, text: &str, created: i64, completed: Option<i64>) -> Arc<Task> {
        Arc::new(
            Task::restore(
                id.parse().unwrap(),
                text,
                Timestamp::from_unix_millis(created),
                completed.map(Timestamp::from_unix_millis),
            )
            .unwrap(),
        )
    }

    fn scenario() -> Vec<Arc<Task>> {
        vec![
            task("mom-1", "Call mom", 1_714_557_660_000, None),
            task("milk-1", "Buy milk", 1_714_557_600_000, Some(1_714_557_900_000)),
        ]
    }

    #[test]
    fn renders_badges_rows_and_completed_section() {
        let tasks = scenario();
        let criteria = ViewCriteria::default();
        let out = render(&Projection::compute(&tasks, &criteria), &criteria, LAYOUT);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "2 total · 1 active · 1 done");
        assert!(lines[1].starts_with("  1. Call mom"));
        assert!(lines[1].contains("mom-"));
        assert!(lines[1].ends_with("2024-05-01 10:01 UTC"));
        assert_eq!(lines[2], "▾ Completed (1)");
        assert!(lines[3].starts_with("  2. Buy milk"));
        assert!(lines[3].contains("locked"));
        assert!(lines[3].ends_with("done 2024-05-01 10:05 UTC"));
    }

    #[test]
    fn collapsed_section_hides_rows() {
        let tasks = scenario();
        let criteria = ViewCriteria::default();
        let layout = Layout {
            show_completed: false,
            ..LAYOUT
        };
        let out = render(&Projection::compute(&tasks, &criteria), &criteria, layout);
        assert!(out.contains("▸ Completed (1)"));
        assert!(!out.contains("Buy milk"));
    }

    #[test]
    fn shows_criteria_and_empty_states() {
        let criteria = ViewCriteria::default();
        let out = render(&Projection::compute(&[], &criteria), &criteria, LAYOUT);
        assert!(out.contains("No tasks yet."));

        let tasks = scenario();
        let criteria = ViewCriteria::default()
            .with_query("zzz")
            .with_filter(CompletionFilter::Active);
        let out = render(&Projection::compute(&tasks, &criteria), &criteria, LAYOUT);
        assert!(out.contains("filter: active · search: \"zzz\""));
        assert!(out.contains("No tasks match."));
        assert!(out.starts_with("2 total · 1 active · 1 done"));
    }

    #[test]
    fn truncates_on_grapheme_boundaries() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_with_ellipsis("👨‍👩‍👧👨‍👩‍👧👨‍👩‍👧", 2), "👨‍👩‍👧👨‍👩‍👧");
        assert_eq!(pad("é", 3).graphemes(true).count(), 3);
    }
}
