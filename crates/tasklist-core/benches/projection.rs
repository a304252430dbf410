#![allow(missing_docs)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use tasklist_core::{CompletionFilter, Projection, Task, TaskId, Timestamp, ViewCriteria};

fn build_tasks(count: i64) -> Vec<Arc<Task>> {
    (0..count)
        .filter_map(|n| {
            let completed = (n % 3 == 0).then(|| Timestamp::from_unix_millis(n + 1));
            Task::restore(
                TaskId::new(),
                &format!("task number {n} about the moon"),
                Timestamp::from_unix_millis(n),
                completed,
            )
            .ok()
        })
        .map(Arc::new)
        .collect()
}

fn bench_projection(c: &mut Criterion) {
    let tasks = build_tasks(10_000);

    c.bench_function("project_all_10k", |b| {
        let criteria = ViewCriteria::default();
        b.iter(|| Projection::compute(black_box(&tasks), black_box(&criteria)));
    });

    c.bench_function("project_query_active_10k", |b| {
        let criteria = ViewCriteria::default()
            .with_query("NUMBER 99")
            .with_filter(CompletionFilter::Active);
        b.iter(|| Projection::compute(black_box(&tasks), black_box(&criteria)));
    });
}

criterion_group!(benches, bench_projection);
criterion_main!(benches);
