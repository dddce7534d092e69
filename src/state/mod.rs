//! Task state store
//!
//! Holds the progress record of every task. Updates are field-level merges
//! ([`TaskUpdate`]) applied one at a time, so a stage only ever writes the
//! fields it produced.
//!
//! - [`MemoryTaskStore`]: process-resident map (default)
//! - [`SqliteTaskStore`]: SQLite file, for inspecting runs from outside the process

mod memory;
mod sqlite;

pub use memory::MemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use crate::config::StateConfig;
use crate::error::Result;
use crate::types::{Task, TaskId, TaskUpdate};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for task records
///
/// Implementations must serialize `update` calls so that concurrent merges on
/// the same task never lose a field.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task
    ///
    /// A finished task with the same id is replaced; a running one is an
    /// `AlreadyExists` error.
    async fn create(&self, task: Task) -> Result<Task>;

    /// Fetch a task by id
    async fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// Merge `update` into the stored record and return the result
    async fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task>;

    /// All tasks, oldest first
    async fn list(&self) -> Result<Vec<Task>>;

    /// Remove a task; returns whether it existed
    async fn delete(&self, id: &TaskId) -> Result<bool>;
}

/// Open the store selected in configuration
pub async fn store_from_config(config: &StateConfig) -> Result<Arc<dyn TaskStore>> {
    match config {
        StateConfig::Memory => Ok(Arc::new(MemoryTaskStore::new())),
        StateConfig::Sqlite { path } => Ok(Arc::new(SqliteTaskStore::new(path).await?)),
    }
}
