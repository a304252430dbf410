//! Error types for tasklist storage providers.

use tasklist_core::TaskError;
use thiserror::Error;

/// Errors that can occur while reading or writing task storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The record handed to the provider failed validation.
    #[error("Invalid task record: {0}")]
    InvalidRecord(#[from] TaskError),

    /// A document did not match the task schema.
    #[error("Invalid document {id}: {reason}")]
    InvalidDocument {
        /// Identifier of the offending document.
        id: String,
        /// Human readable reason.
        reason: String,
    },

    /// Targeted document does not exist in the collection.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Snapshot could not be encoded or decoded.
    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Writing would exceed the storage quota.
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Size of the rejected value in bytes.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// Backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Realtime provider was created outside of a tokio runtime.
    #[error("No tokio runtime available for realtime storage")]
    NoRuntime,

    /// The write was dropped before it reported an outcome.
    #[error("Write cancelled before completion")]
    Cancelled,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
