//! Todo tree service
//!
//! High-level business logic over the injected `TodoStore`: input
//! validation, nested-path resolution for the request surface, and
//! change notifications after every successful mutation.

use super::events::{ChangeNotifier, TreeSubscription};
use crate::error::{AppError, Result};
use crate::models::{
    check_edit_title, require_title, Subtask, SubtaskPatch, Task, TaskPatch, Todo, UserId,
};
use crate::storage::TodoStore;
use std::sync::Arc;

/// Service for managing todo trees
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    notifier: ChangeNotifier,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self {
            store,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Re-deliver the user's tree to live subscribers
    async fn notify(&self, user: &UserId) {
        let Some(ticket) = self.notifier.ticket(user) else {
            return;
        };

        match self.store.list_todos(user).await {
            Ok(todos) => self.notifier.publish(user, ticket, todos),
            Err(e) => tracing::warn!("Failed to publish tree for user {}: {}", user, e),
        }
    }

    // ===== Queries =====

    /// List the user's full tree
    pub async fn list_todos(&self, user: &UserId) -> Result<Vec<Todo>> {
        self.store.list_todos(user).await
    }

    pub async fn get_todo(&self, user: &UserId, todo_id: &str) -> Result<Todo> {
        self.store.get_todo(user, todo_id).await
    }

    pub async fn list_tasks(&self, user: &UserId, todo_id: &str) -> Result<Vec<Task>> {
        Ok(self.get_todo(user, todo_id).await?.tasks)
    }

    /// Get a task, requiring it to belong to `todo_id`
    pub async fn get_task(&self, user: &UserId, todo_id: &str, task_id: &str) -> Result<Task> {
        let todo = self.get_todo(user, todo_id).await?;

        todo.tasks
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))
    }

    pub async fn list_subtasks(
        &self,
        user: &UserId,
        todo_id: &str,
        task_id: &str,
    ) -> Result<Vec<Subtask>> {
        Ok(self.get_task(user, todo_id, task_id).await?.subtasks)
    }

    /// Confirm a subtask sits under the given todo and task
    pub async fn ensure_subtask(
        &self,
        user: &UserId,
        todo_id: &str,
        task_id: &str,
        subtask_id: &str,
    ) -> Result<()> {
        let task = self.get_task(user, todo_id, task_id).await?;

        match task.find_subtask(subtask_id) {
            Some(_) => Ok(()),
            None => Err(AppError::SubtaskNotFound(subtask_id.to_string())),
        }
    }

    /// Live view of the user's tree
    pub async fn subscribe(&self, user: &UserId) -> Result<TreeSubscription> {
        // Register before reading so no mutation falls between the two
        let mut subscription = self.notifier.subscribe(user, Vec::new());
        subscription.current = Arc::new(self.store.list_todos(user).await?);

        Ok(subscription)
    }

    // ===== Todos =====

    pub async fn create_todo(&self, user: &UserId, title: Option<String>) -> Result<Todo> {
        let title = require_title(title)?;
        tracing::info!("Creating todo for user {}: {}", user, title);

        let todo = self.store.create_todo(user, &title).await?;
        self.notify(user).await;

        tracing::info!("Todo created successfully: {}", todo.id);
        Ok(todo)
    }

    /// Rename a todo. A blank title leaves the current one in place.
    pub async fn rename_todo(
        &self,
        user: &UserId,
        todo_id: &str,
        title: Option<String>,
    ) -> Result<Todo> {
        let title = check_edit_title(title)?.unwrap_or_default();
        tracing::debug!("Renaming todo: {}", todo_id);

        let todo = self.store.rename_todo(user, todo_id, &title).await?;
        self.notify(user).await;

        Ok(todo)
    }

    pub async fn delete_todo(&self, user: &UserId, todo_id: &str) -> Result<()> {
        tracing::info!("Deleting todo: {}", todo_id);

        self.store.delete_todo(user, todo_id).await?;
        self.notify(user).await;

        tracing::info!("Todo deleted successfully: {}", todo_id);
        Ok(())
    }

    // ===== Tasks =====

    pub async fn create_task(
        &self,
        user: &UserId,
        todo_id: &str,
        title: Option<String>,
    ) -> Result<Task> {
        let title = require_title(title)?;
        tracing::debug!("Creating task in todo {}: {}", todo_id, title);

        let task = self.store.create_task(user, todo_id, &title).await?;
        self.notify(user).await;

        Ok(task)
    }

    pub async fn update_task(&self, user: &UserId, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validated()?;
        tracing::debug!("Updating task: {}", task_id);

        let task = self.store.update_task(user, task_id, patch).await?;
        self.notify(user).await;

        Ok(task)
    }

    pub async fn delete_task(&self, user: &UserId, task_id: &str) -> Result<()> {
        tracing::info!("Deleting task: {}", task_id);

        self.store.delete_task(user, task_id).await?;
        self.notify(user).await;

        Ok(())
    }

    // ===== Subtasks =====

    pub async fn create_subtask(
        &self,
        user: &UserId,
        task_id: &str,
        title: Option<String>,
    ) -> Result<Subtask> {
        let title = require_title(title)?;
        tracing::debug!("Creating subtask in task {}: {}", task_id, title);

        let subtask = self.store.create_subtask(user, task_id, &title).await?;
        self.notify(user).await;

        Ok(subtask)
    }

    pub async fn update_subtask(
        &self,
        user: &UserId,
        subtask_id: &str,
        patch: SubtaskPatch,
    ) -> Result<Subtask> {
        let patch = patch.validated()?;
        tracing::debug!("Updating subtask: {}", subtask_id);

        let subtask = self.store.update_subtask(user, subtask_id, patch).await?;
        self.notify(user).await;

        Ok(subtask)
    }

    pub async fn delete_subtask(&self, user: &UserId, subtask_id: &str) -> Result<()> {
        tracing::debug!("Deleting subtask: {}", subtask_id);

        self.store.delete_subtask(user, subtask_id).await?;
        self.notify(user).await;

        Ok(())
    }
}
