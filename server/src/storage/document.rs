//! Whole-tree document backend
//!
//! Each user's tree is one document. Mutations read the document, apply a
//! single change to an owned copy and write the whole tree back, so a
//! failed step never leaves a partially applied change behind.

use super::TodoStore;
use crate::error::{AppError, Result};
use crate::models::{Subtask, SubtaskPatch, Task, TaskPatch, Todo, UserId};
use crate::tree::TodoTree;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key-value capability holding one tree document per user
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stored tree for the user, `None` if nothing was ever written
    async fn get(&self, user: &UserId) -> Result<Option<Vec<Todo>>>;

    /// Replace the user's tree
    async fn set(&self, user: &UserId, todos: &[Todo]) -> Result<()>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn get(&self, user: &UserId) -> Result<Option<Vec<Todo>>> {
        (**self).get(user).await
    }

    async fn set(&self, user: &UserId, todos: &[Todo]) -> Result<()> {
        (**self).set(user, todos).await
    }
}

/// `TodoStore` over a `DocumentStore`.
///
/// Mutations for the same user are serialized inside this process. Writers
/// in other processes sharing the documents still race last-write-wins.
pub struct DocumentTodoStore<D> {
    documents: D,
    user_locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<D: DocumentStore> DocumentTodoStore<D> {
    pub fn new(documents: D) -> Self {
        Self {
            documents,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    fn user_lock(&self, user: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(user.clone()).or_default().clone()
    }

    async fn load(&self, user: &UserId) -> Result<TodoTree> {
        let todos = self.documents.get(user).await?.unwrap_or_default();
        Ok(TodoTree::new(todos))
    }

    /// Drop the user's lock entry once nobody else holds or waits on it
    fn release_user_lock(&self, user: &UserId) {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if locks.get(user).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(user);
        }
    }

    /// Apply one change to the user's tree and write it back whole
    async fn mutate<T, F>(&self, user: &UserId, change: F) -> Result<T>
    where
        F: FnOnce(&mut TodoTree) -> Result<T>,
    {
        let lock = self.user_lock(user);

        let result = async {
            let _guard = lock.lock().await;

            let mut tree = self.load(user).await?;
            let value = change(&mut tree)?;
            self.documents.set(user, tree.todos()).await?;

            Ok::<T, AppError>(value)
        }
        .await;

        drop(lock);
        self.release_user_lock(user);

        result
    }
}

#[async_trait]
impl<D: DocumentStore> TodoStore for DocumentTodoStore<D> {
    async fn list_todos(&self, user: &UserId) -> Result<Vec<Todo>> {
        Ok(self.load(user).await?.into_todos())
    }

    async fn get_todo(&self, user: &UserId, todo_id: &str) -> Result<Todo> {
        let tree = self.load(user).await?;
        tree.todo(todo_id).cloned()
    }

    async fn create_todo(&self, user: &UserId, title: &str) -> Result<Todo> {
        let owner = user.as_str();
        self.mutate(user, |tree| {
            Ok(tree.create_todo(owner, title.to_string(), Utc::now()))
        })
        .await
    }

    async fn rename_todo(&self, user: &UserId, todo_id: &str, title: &str) -> Result<Todo> {
        self.mutate(user, |tree| tree.rename_todo(todo_id, title, Utc::now()))
            .await
    }

    async fn delete_todo(&self, user: &UserId, todo_id: &str) -> Result<()> {
        self.mutate(user, |tree| tree.remove_todo(todo_id).map(|_| ()))
            .await
    }

    async fn create_task(&self, user: &UserId, todo_id: &str, title: &str) -> Result<Task> {
        self.mutate(user, |tree| {
            tree.add_task(todo_id, title.to_string(), Utc::now())
        })
        .await
    }

    async fn update_task(&self, user: &UserId, task_id: &str, patch: TaskPatch) -> Result<Task> {
        self.mutate(user, |tree| tree.update_task(task_id, patch, Utc::now()))
            .await
    }

    async fn delete_task(&self, user: &UserId, task_id: &str) -> Result<()> {
        self.mutate(user, |tree| tree.remove_task(task_id, Utc::now()).map(|_| ()))
            .await
    }

    async fn create_subtask(&self, user: &UserId, task_id: &str, title: &str) -> Result<Subtask> {
        self.mutate(user, |tree| {
            tree.add_subtask(task_id, title.to_string(), Utc::now())
        })
        .await
    }

    async fn update_subtask(
        &self,
        user: &UserId,
        subtask_id: &str,
        patch: SubtaskPatch,
    ) -> Result<Subtask> {
        self.mutate(user, |tree| {
            tree.update_subtask(subtask_id, patch, Utc::now())
        })
        .await
    }

    async fn delete_subtask(&self, user: &UserId, subtask_id: &str) -> Result<()> {
        self.mutate(user, |tree| {
            tree.remove_subtask(subtask_id, Utc::now()).map(|_| ())
        })
        .await
    }
}
