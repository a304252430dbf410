//! Application layer for tasklist.
//!
//! This crate owns the canonical task sequence, the memoized list view, and the
//! configuration that selects a storage provider. Interfaces drive it through
//! intents and render the projection it produces.

pub mod backend;
pub mod config;
pub mod task_store;
pub mod view;

// Re-exports for convenience
pub use backend::{DynProvider, open_provider};
pub use config::{APP_DIR, Backend, CONFIG_FILE, StorageConfig, TasklistConfig, ViewConfig};
pub use task_store::{Added, Direction, TaskStore};
pub use view::ListView;
