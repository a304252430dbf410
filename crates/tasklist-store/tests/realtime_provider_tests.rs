//! Integration tests for `RealtimeProvider` over an in-process collection.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use tasklist_core::{Task, TaskId, Timestamp};
use tasklist_store::{
    Document, InMemoryCollection, RealtimeProvider, StorageError, StorageProvider, Subscription, SyncMode,
    WriteOutcome,
};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

fn listen(provider: &RealtimeProvider<InMemoryCollection>) -> (Subscription, mpsc::UnboundedReceiver<Vec<Task>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = provider
        .subscribe(Box::new(move |tasks| {
            let _ = tx.send(tasks);
        }))
        .expect("realtime provider supports push");
    (subscription, rx)
}

/// Receive pushes until one satisfies `done`.
async fn next_matching(rx: &mut mpsc::UnboundedReceiver<Vec<Task>>, done: impl Fn(&[Task]) -> bool) -> Vec<Task> {
    timeout(Duration::from_secs(5), async {
        loop {
            let tasks = rx.recv().await.expect("subscription alive");
            if done(&tasks) {
                return tasks;
            }
        }
    })
    .await
    .expect("timed out waiting for a push")
}

fn raw(id: &str, fields: serde_json::Value) -> Document {
    let serde_json::Value::Object(fields) = fields else {
        panic!("fields must be an object");
    };
    Document {
        id: id.to_owned(),
        fields,
    }
}

#[tokio::test]
async fn subscription_delivers_current_state_then_changes() {
    let collection = InMemoryCollection::new("tasks");
    let provider = RealtimeProvider::new(collection.clone()).unwrap();
    assert_eq!(provider.sync_mode(), SyncMode::Push);

    let (_subscription, mut rx) = listen(&provider);
    let initial = rx.recv().await.unwrap();
    assert!(initial.is_empty());

    let created = provider.create("  Buy milk  ").unwrap();
    assert_eq!(created.task.text(), "Buy milk");
    assert!(created.write.outcome().await.is_persisted());

    let tasks = next_matching(&mut rx, |tasks| tasks.len() == 1).await;
    assert_eq!(tasks[0], created.task);
    assert_eq!(provider.load(), tasks);
}

#[tokio::test]
async fn pushes_are_ordered_newest_first() {
    let collection = InMemoryCollection::new("tasks");
    collection.put_raw(raw("a", json!({ "text": "old", "createdAt": 1_000, "completedAt": null })));
    collection.put_raw(raw("c", json!({ "text": "tie high", "createdAt": 2_000 })));
    collection.put_raw(raw("b", json!({ "text": "tie low", "createdAt": 2_000 })));

    let provider = RealtimeProvider::new(collection).unwrap();
    let (_subscription, mut rx) = listen(&provider);
    let tasks = rx.recv().await.unwrap();
    let texts: Vec<&str> = tasks.iter().map(Task::text).collect();
    assert_eq!(texts, vec!["tie high", "tie low", "old"]);
}

#[tokio::test]
async fn malformed_documents_are_dropped() {
    let collection = InMemoryCollection::new("tasks");
    collection.put_raw(raw("ok", json!({ "text": "valid", "createdAt": 5 })));
    collection.put_raw(raw("blank", json!({ "text": "   ", "createdAt": 5 })));
    collection.put_raw(raw("no-time", json!({ "text": "missing createdAt" })));
    collection.put_raw(raw("bad-type", json!({ "text": 42, "createdAt": 5 })));
    collection.put_raw(raw("iso", json!({ "text": "iso time", "createdAt": "2024-05-01T10:00:00Z" })));

    let provider = RealtimeProvider::new(collection).unwrap();
    let tasks = provider.load();
    let ids: Vec<&str> = tasks.iter().map(|task| task.id().as_str()).collect();
    assert_eq!(ids, vec!["iso", "ok"]);
}

#[tokio::test]
async fn mark_complete_is_idempotent() {
    let collection = InMemoryCollection::new("tasks");
    let provider = RealtimeProvider::new(collection.clone()).unwrap();
    let created = provider.create("Walk dog").unwrap();
    assert!(created.write.outcome().await.is_persisted());
    let id = created.task.id().clone();

    let first = Timestamp::from_unix_millis(10_000);
    assert!(provider.mark_complete(&id, first).outcome().await.is_persisted());
    let second = Timestamp::from_unix_millis(20_000);
    assert!(matches!(
        provider.mark_complete(&id, second).outcome().await,
        WriteOutcome::Skipped
    ));

    let tasks = provider.load();
    assert_eq!(tasks[0].completed_at(), Some(first));
}

#[tokio::test]
async fn failed_writes_report_errors() {
    let collection = InMemoryCollection::new("tasks");
    let provider = RealtimeProvider::new(collection.clone()).unwrap();

    collection.set_available(false);
    let created = provider.create("offline").unwrap();
    let outcome = created.write.outcome().await;
    assert!(outcome.is_failed());
    assert!(matches!(outcome.error(), Some(StorageError::Unavailable(_))));
    assert!(collection.documents().is_empty());

    collection.set_available(true);
    let created = provider.create("online").unwrap();
    assert!(created.write.outcome().await.is_persisted());
}

#[tokio::test]
async fn writes_to_missing_documents_are_skipped() {
    let collection = InMemoryCollection::new("tasks");
    let provider = RealtimeProvider::new(collection.clone()).unwrap();

    let ghost: TaskId = "ghost".parse().unwrap();
    let outcome = provider.mark_complete(&ghost, Timestamp::from_unix_millis(1)).outcome().await;
    assert!(matches!(outcome, WriteOutcome::Skipped));
    assert!(matches!(provider.remove(&ghost).outcome().await, WriteOutcome::Skipped));
}

#[tokio::test]
async fn concurrent_deletes_resolve_as_skipped() {
    let collection = InMemoryCollection::new("tasks");
    let laptop = RealtimeProvider::new(collection.clone()).unwrap();
    let phone = RealtimeProvider::new(collection.clone()).unwrap();
    let created = laptop.create("Shared").unwrap();
    assert!(created.write.outcome().await.is_persisted());
    let id = created.task.id().clone();

    // Both writes are dispatched before either one runs.
    let first = laptop.remove(&id);
    let second = phone.remove(&id);
    let late_complete = phone.mark_complete(&id, Timestamp::from_unix_millis(5));

    assert!(first.outcome().await.is_persisted());
    assert!(matches!(second.outcome().await, WriteOutcome::Skipped));
    assert!(matches!(late_complete.outcome().await, WriteOutcome::Skipped));
    assert!(collection.documents().is_empty());
}

#[tokio::test]
async fn unsubscribe_stops_pushes() {
    let collection = InMemoryCollection::new("tasks");
    let provider = RealtimeProvider::new(collection.clone()).unwrap();
    let (subscription, mut rx) = listen(&provider);
    assert!(rx.recv().await.unwrap().is_empty());

    subscription.unsubscribe();
    // The aborted task drops the callback and with it the sender.
    assert!(timeout(Duration::from_secs(5), rx.recv()).await.unwrap().is_none());

    let created = provider.create("unheard").unwrap();
    assert!(created.write.outcome().await.is_persisted());
    sleep(Duration::from_millis(5)).await;
    assert_eq!(collection.documents().len(), 1);
}

#[tokio::test]
async fn providers_sharing_a_collection_see_each_other() {
    let collection = InMemoryCollection::new("tasks");
    let phone = RealtimeProvider::new(collection.clone()).unwrap();
    let laptop = RealtimeProvider::new(collection.clone()).unwrap();
    let (_subscription, mut laptop_rx) = listen(&laptop);

    let created = phone.create("Call mom").unwrap();
    assert!(created.write.outcome().await.is_persisted());
    let tasks = next_matching(&mut laptop_rx, |tasks| tasks.len() == 1).await;
    assert_eq!(tasks[0].text(), "Call mom");

    let id = created.task.id().clone();
    assert!(laptop.remove(&id).outcome().await.is_persisted());
    next_matching(&mut laptop_rx, |tasks| tasks.is_empty()).await;
    assert!(phone.load().is_empty());
}
