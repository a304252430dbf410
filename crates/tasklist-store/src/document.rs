//! Remote document schema and collection interface.

use std::future::Future;

use serde_json::{Map, Value};
use tasklist_core::{Task, TaskId, Timestamp};
use tokio::sync::watch;

use crate::error::StorageError;

/// Field holding the task text.
pub const FIELD_TEXT: &str = "text";
/// Field holding the creation time.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Field holding the completion time.
pub const FIELD_COMPLETED_AT: &str = "completedAt";

/// Field map of a document.
pub type Fields = Map<String, Value>;

/// A document of a remote collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier assigned by the collection; becomes the task id.
    pub id: String,
    /// Loosely typed document fields.
    pub fields: Fields,
}

/// Remote collection of task documents.
///
/// Write futures are `'static` so providers can dispatch them onto a runtime
/// without waiting for completion.
pub trait DocumentCollection: Send + Sync + 'static {
    /// Name of the collection.
    fn name(&self) -> &str;

    /// Reserve a fresh document identifier.
    fn allocate_id(&self) -> String {
        TaskId::new().to_string()
    }

    /// Create a document with the given id.
    fn insert(&self, id: String, fields: Fields) -> impl Future<Output = Result<(), StorageError>> + Send + 'static;

    /// Merge `fields` into an existing document.
    fn update(&self, id: String, fields: Fields) -> impl Future<Output = Result<(), StorageError>> + Send + 'static;

    /// Delete a document.
    fn delete(&self, id: String) -> impl Future<Output = Result<(), StorageError>> + Send + 'static;

    /// Watch the full document set. The receiver always holds the latest state.
    fn listen(&self) -> watch::Receiver<Vec<Document>>;
}

/// Serialize a task into document fields. The id is carried by the document itself.
#[must_use]
pub fn task_to_fields(task: &Task) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_TEXT.into(), Value::from(task.text()));
    fields.insert(FIELD_CREATED_AT.into(), Value::from(task.created_at().unix_millis()));
    fields.insert(
        FIELD_COMPLETED_AT.into(),
        task.completed_at()
            .map_or(Value::Null, |at| Value::from(at.unix_millis())),
    );
    fields
}

/// Validate a document against the task schema.
///
/// # Errors
/// Returns [`StorageError::InvalidDocument`] when a required field is missing or
/// has the wrong type, and [`StorageError::InvalidRecord`] for blank ids or text.
pub fn task_from_document(doc: &Document) -> Result<Task, StorageError> {
    let invalid = |reason: &str| StorageError::InvalidDocument {
        id: doc.id.clone(),
        reason: reason.to_owned(),
    };

    let id: TaskId = doc.id.parse()?;
    let text = match doc.fields.get(FIELD_TEXT) {
        Some(Value::String(text)) => text.as_str(),
        Some(_) => return Err(invalid("text must be a string")),
        None => return Err(invalid("text is missing")),
    };
    let created_at = match doc.fields.get(FIELD_CREATED_AT) {
        None | Some(Value::Null) => return Err(invalid("createdAt is missing")),
        Some(value) => coerce_timestamp(value).ok_or_else(|| invalid("createdAt is not a timestamp"))?,
    };
    let completed_at = match doc.fields.get(FIELD_COMPLETED_AT) {
        None | Some(Value::Null) => None,
        Some(value) => Some(coerce_timestamp(value).ok_or_else(|| invalid("completedAt is not a timestamp"))?),
    };

    Ok(Task::restore(id, text, created_at, completed_at)?)
}

/// Accept millisecond numbers and RFC 3339 strings.
#[allow(clippy::cast_possible_truncation)]
fn coerce_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|ms| ms.is_finite()).map(|ms| ms.trunc() as i64))
            .map(Timestamp::from_unix_millis),
        Value::String(raw) => Timestamp::parse_rfc3339(raw),
        _ => None,
    }
}
