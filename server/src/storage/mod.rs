//! Storage module
//!
//! `TodoStore` is the todo tree contract every backend fulfils. Two shapes
//! of persistence implement it:
//! - whole-tree documents (`DocumentTodoStore` over a `DocumentStore`)
//! - one row per entity (`crate::database::Repository`)

pub mod document;
pub mod json_file;
pub mod memory;

pub use document::{DocumentStore, DocumentTodoStore};
pub use json_file::JsonFileStore;
pub use memory::MemoryDocumentStore;

use crate::error::Result;
use crate::models::{Subtask, SubtaskPatch, Task, TaskPatch, Todo, UserId};
use async_trait::async_trait;

/// Per-user todo tree store.
///
/// Every operation addresses only the caller's own tree; ids that do not
/// resolve inside it fail with the matching `NotFound` error. A failed
/// operation leaves the stored tree unchanged.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Full tree for the user, empty if none exists
    async fn list_todos(&self, user: &UserId) -> Result<Vec<Todo>>;

    async fn get_todo(&self, user: &UserId, todo_id: &str) -> Result<Todo>;

    async fn create_todo(&self, user: &UserId, title: &str) -> Result<Todo>;

    async fn rename_todo(&self, user: &UserId, todo_id: &str, title: &str) -> Result<Todo>;

    /// Delete a todo and all of its tasks and subtasks
    async fn delete_todo(&self, user: &UserId, todo_id: &str) -> Result<()>;

    async fn create_task(&self, user: &UserId, todo_id: &str, title: &str) -> Result<Task>;

    async fn update_task(&self, user: &UserId, task_id: &str, patch: TaskPatch) -> Result<Task>;

    /// Delete a task and its subtasks
    async fn delete_task(&self, user: &UserId, task_id: &str) -> Result<()>;

    async fn create_subtask(&self, user: &UserId, task_id: &str, title: &str) -> Result<Subtask>;

    async fn update_subtask(
        &self,
        user: &UserId,
        subtask_id: &str,
        patch: SubtaskPatch,
    ) -> Result<Subtask>;

    async fn delete_subtask(&self, user: &UserId, subtask_id: &str) -> Result<()>;
}
