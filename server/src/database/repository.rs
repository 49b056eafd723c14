//! Repository layer for database operations
//!
//! Implements the todo tree store over one row per entity.
//! Every mutation runs in a single transaction; cascade deletes remove
//! subtasks before their task and tasks before their todo.

use super::models::*;
use crate::error::{AppError, Result};
use crate::models::{non_blank, Subtask, SubtaskPatch, Task, TaskPatch, Todo, UserId};
use crate::storage::TodoStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a transaction holding the write lock from its first statement.
    /// Mutations read before they write, and a deferred transaction would
    /// fail with SQLITE_BUSY there instead of waiting on the busy timeout.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

/// Nest flat rows into trees, keeping each level in row order
fn assemble(todos: Vec<TodoRow>, tasks: Vec<TaskRow>, subtasks: Vec<SubtaskRow>) -> Vec<Todo> {
    let mut subtasks_by_task: HashMap<String, Vec<Subtask>> = HashMap::new();
    for row in subtasks {
        subtasks_by_task
            .entry(row.task_id.clone())
            .or_default()
            .push(row.into());
    }

    let mut tasks_by_todo: HashMap<String, Vec<Task>> = HashMap::new();
    for row in tasks {
        let subtasks = subtasks_by_task.remove(&row.id).unwrap_or_default();
        tasks_by_todo
            .entry(row.todo_id.clone())
            .or_default()
            .push(row.into_task(subtasks));
    }

    todos
        .into_iter()
        .map(|row| {
            let tasks = tasks_by_todo.remove(&row.id).unwrap_or_default();
            row.into_todo(tasks)
        })
        .collect()
}

async fn fetch_todo(conn: &mut SqliteConnection, user: &UserId, todo_id: &str) -> Result<Todo> {
    let todo = sqlx::query_as::<_, TodoRow>("SELECT * FROM todos WHERE id = ? AND user_id = ?")
        .bind(todo_id)
        .bind(user.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::TodoNotFound(todo_id.to_string()))?;

    let tasks = sqlx::query_as::<_, TaskRow>(
        "SELECT * FROM tasks WHERE todo_id = ? AND user_id = ? ORDER BY rowid",
    )
    .bind(todo_id)
    .bind(user.as_str())
    .fetch_all(&mut *conn)
    .await?;

    let subtasks = sqlx::query_as::<_, SubtaskRow>(
        r#"
        SELECT s.* FROM subtasks s
        JOIN tasks t ON t.id = s.task_id
        WHERE t.todo_id = ? AND s.user_id = ?
        ORDER BY s.rowid
        "#,
    )
    .bind(todo_id)
    .bind(user.as_str())
    .fetch_all(&mut *conn)
    .await?;

    assemble(vec![todo], tasks, subtasks)
        .pop()
        .ok_or_else(|| AppError::TodoNotFound(todo_id.to_string()))
}

async fn fetch_task(conn: &mut SqliteConnection, task_id: &str) -> Result<Task> {
    let task = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))?;

    let subtasks =
        sqlx::query_as::<_, SubtaskRow>("SELECT * FROM subtasks WHERE task_id = ? ORDER BY rowid")
            .bind(task_id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(task.into_task(subtasks.into_iter().map(Subtask::from).collect()))
}

/// Id of the todo owning the user's task
async fn task_parent(conn: &mut SqliteConnection, user: &UserId, task_id: &str) -> Result<String> {
    sqlx::query_scalar::<_, String>("SELECT todo_id FROM tasks WHERE id = ? AND user_id = ?")
        .bind(task_id)
        .bind(user.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))
}

/// Ids of the task and todo owning the user's subtask
async fn subtask_parents(
    conn: &mut SqliteConnection,
    user: &UserId,
    subtask_id: &str,
) -> Result<(String, String)> {
    sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT s.task_id, t.todo_id FROM subtasks s
        JOIN tasks t ON t.id = s.task_id
        WHERE s.id = ? AND s.user_id = ?
        "#,
    )
    .bind(subtask_id)
    .bind(user.as_str())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::SubtaskNotFound(subtask_id.to_string()))
}

async fn touch_todo(conn: &mut SqliteConnection, todo_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE todos SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(todo_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn touch_task(conn: &mut SqliteConnection, task_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE tasks SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(task_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl TodoStore for Repository {
    async fn list_todos(&self, user: &UserId) -> Result<Vec<Todo>> {
        // One read transaction so all three levels come from the same snapshot
        let mut tx = self.pool.begin().await?;

        let todos =
            sqlx::query_as::<_, TodoRow>("SELECT * FROM todos WHERE user_id = ? ORDER BY rowid")
                .bind(user.as_str())
                .fetch_all(&mut *tx)
                .await?;

        let tasks =
            sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE user_id = ? ORDER BY rowid")
                .bind(user.as_str())
                .fetch_all(&mut *tx)
                .await?;

        let subtasks = sqlx::query_as::<_, SubtaskRow>(
            "SELECT * FROM subtasks WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user.as_str())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(assemble(todos, tasks, subtasks))
    }

    async fn get_todo(&self, user: &UserId, todo_id: &str) -> Result<Todo> {
        let mut tx = self.pool.begin().await?;
        let todo = fetch_todo(&mut tx, user, todo_id).await?;
        tx.commit().await?;

        Ok(todo)
    }

    async fn create_todo(&self, user: &UserId, title: &str) -> Result<Todo> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            INSERT INTO todos (id, user_id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user.as_str())
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created todo row: {}", id);
        Ok(row.into_todo(Vec::new()))
    }

    async fn rename_todo(&self, user: &UserId, todo_id: &str, title: &str) -> Result<Todo> {
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let rows = sqlx::query(
            r#"
            UPDATE todos SET title = COALESCE(?, title), updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(non_blank(Some(title.to_string())))
        .bind(now)
        .bind(todo_id)
        .bind(user.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::TodoNotFound(todo_id.to_string()));
        }

        let todo = fetch_todo(&mut tx, user, todo_id).await?;
        tx.commit().await?;

        Ok(todo)
    }

    async fn delete_todo(&self, user: &UserId, todo_id: &str) -> Result<()> {
        let mut tx = self.begin_write().await?;

        let exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM todos WHERE id = ? AND user_id = ?")
                .bind(todo_id)
                .bind(user.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        if exists.is_none() {
            return Err(AppError::TodoNotFound(todo_id.to_string()));
        }

        let subtasks = sqlx::query(
            "DELETE FROM subtasks WHERE task_id IN (SELECT id FROM tasks WHERE todo_id = ?)",
        )
        .bind(todo_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let tasks = sqlx::query("DELETE FROM tasks WHERE todo_id = ?")
            .bind(todo_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(todo_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            "Deleted todo row {} with {} tasks and {} subtasks",
            todo_id,
            tasks,
            subtasks
        );
        Ok(())
    }

    async fn create_task(&self, user: &UserId, todo_id: &str, title: &str) -> Result<Task> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let rows = sqlx::query("UPDATE todos SET updated_at = ? WHERE id = ? AND user_id = ?")
            .bind(now)
            .bind(todo_id)
            .bind(user.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TodoNotFound(todo_id.to_string()));
        }

        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (id, todo_id, user_id, title, completed, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(todo_id)
        .bind(user.as_str())
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Created task row: {} in todo: {}", id, todo_id);
        Ok(row.into_task(Vec::new()))
    }

    async fn update_task(&self, user: &UserId, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let todo_id = task_parent(&mut tx, user, task_id).await?;

        sqlx::query(
            r#"
            UPDATE tasks
            SET title = COALESCE(?, title), completed = COALESCE(?, completed), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(non_blank(patch.title))
        .bind(patch.completed)
        .bind(now)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        touch_todo(&mut tx, &todo_id, now).await?;

        let task = fetch_task(&mut tx, task_id).await?;
        tx.commit().await?;

        Ok(task)
    }

    async fn delete_task(&self, user: &UserId, task_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let todo_id = task_parent(&mut tx, user, task_id).await?;

        sqlx::query("DELETE FROM subtasks WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        touch_todo(&mut tx, &todo_id, now).await?;
        tx.commit().await?;

        tracing::debug!("Deleted task row: {}", task_id);
        Ok(())
    }

    async fn create_subtask(&self, user: &UserId, task_id: &str, title: &str) -> Result<Subtask> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let todo_id = task_parent(&mut tx, user, task_id).await?;

        let row = sqlx::query_as::<_, SubtaskRow>(
            r#"
            INSERT INTO subtasks (id, task_id, user_id, title, completed, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(task_id)
        .bind(user.as_str())
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        touch_task(&mut tx, task_id, now).await?;
        touch_todo(&mut tx, &todo_id, now).await?;
        tx.commit().await?;

        tracing::debug!("Created subtask row: {} in task: {}", id, task_id);
        Ok(row.into())
    }

    async fn update_subtask(
        &self,
        user: &UserId,
        subtask_id: &str,
        patch: SubtaskPatch,
    ) -> Result<Subtask> {
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let (task_id, todo_id) = subtask_parents(&mut tx, user, subtask_id).await?;

        let row = sqlx::query_as::<_, SubtaskRow>(
            r#"
            UPDATE subtasks
            SET title = COALESCE(?, title), completed = COALESCE(?, completed), updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(non_blank(patch.title))
        .bind(patch.completed)
        .bind(now)
        .bind(subtask_id)
        .fetch_one(&mut *tx)
        .await?;

        touch_task(&mut tx, &task_id, now).await?;
        touch_todo(&mut tx, &todo_id, now).await?;
        tx.commit().await?;

        Ok(row.into())
    }

    async fn delete_subtask(&self, user: &UserId, subtask_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let (task_id, todo_id) = subtask_parents(&mut tx, user, subtask_id).await?;

        sqlx::query("DELETE FROM subtasks WHERE id = ?")
            .bind(subtask_id)
            .execute(&mut *tx)
            .await?;

        touch_task(&mut tx, &task_id, now).await?;
        touch_todo(&mut tx, &todo_id, now).await?;
        tx.commit().await?;

        tracing::debug!("Deleted subtask row: {}", subtask_id);
        Ok(())
    }
}
