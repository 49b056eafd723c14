//! In-memory todo tree operations
//!
//! Mutations over one user's owned tree. Lookup is a linear scan of the
//! tree; every mutation stamps the touched entity and each of its
//! ancestors with the same timestamp, so a parent's `updated_at` is never
//! older than its most recently modified descendant.

use crate::error::{AppError, Result};
use crate::models::{non_blank, Subtask, SubtaskPatch, Task, TaskPatch, Todo};
use chrono::{DateTime, Utc};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// One user's todo lists, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoTree {
    todos: Vec<Todo>,
}

impl TodoTree {
    pub fn new(todos: Vec<Todo>) -> Self {
        Self { todos }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn into_todos(self) -> Vec<Todo> {
        self.todos
    }

    pub fn todo(&self, todo_id: &str) -> Result<&Todo> {
        self.todos
            .iter()
            .find(|t| t.id == todo_id)
            .ok_or_else(|| AppError::TodoNotFound(todo_id.to_string()))
    }

    fn todo_mut(&mut self, todo_id: &str) -> Result<&mut Todo> {
        self.todos
            .iter_mut()
            .find(|t| t.id == todo_id)
            .ok_or_else(|| AppError::TodoNotFound(todo_id.to_string()))
    }

    /// Find the todo owning `task_id` along with the task's index in it
    fn task_location(&mut self, task_id: &str) -> Result<(&mut Todo, usize)> {
        self.todos
            .iter_mut()
            .find_map(|todo| {
                let index = todo.tasks.iter().position(|t| t.id == task_id)?;
                Some((todo, index))
            })
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))
    }

    /// Find the todo and task owning `subtask_id` with their indices
    fn subtask_location(&mut self, subtask_id: &str) -> Result<(&mut Todo, usize, usize)> {
        self.todos
            .iter_mut()
            .find_map(|todo| {
                let (task_index, subtask_index) =
                    todo.tasks.iter().enumerate().find_map(|(i, task)| {
                        let j = task.subtasks.iter().position(|s| s.id == subtask_id)?;
                        Some((i, j))
                    })?;
                Some((todo, task_index, subtask_index))
            })
            .ok_or_else(|| AppError::SubtaskNotFound(subtask_id.to_string()))
    }

    // ===== Todos =====

    pub fn create_todo(&mut self, user_id: &str, title: String, now: DateTime<Utc>) -> Todo {
        let todo = Todo {
            id: new_id(),
            user_id: user_id.to_string(),
            title,
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
        };

        self.todos.push(todo.clone());
        todo
    }

    pub fn rename_todo(&mut self, todo_id: &str, title: &str, now: DateTime<Utc>) -> Result<Todo> {
        let todo = self.todo_mut(todo_id)?;

        if let Some(title) = non_blank(Some(title.to_string())) {
            todo.title = title;
        }
        todo.updated_at = now;

        Ok(todo.clone())
    }

    /// Remove a todo together with all of its tasks and subtasks
    pub fn remove_todo(&mut self, todo_id: &str) -> Result<Todo> {
        let index = self
            .todos
            .iter()
            .position(|t| t.id == todo_id)
            .ok_or_else(|| AppError::TodoNotFound(todo_id.to_string()))?;

        Ok(self.todos.remove(index))
    }

    // ===== Tasks =====

    pub fn add_task(&mut self, todo_id: &str, title: String, now: DateTime<Utc>) -> Result<Task> {
        let todo = self.todo_mut(todo_id)?;

        let task = Task {
            id: new_id(),
            title,
            completed: false,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        };

        todo.tasks.push(task.clone());
        todo.updated_at = now;

        Ok(task)
    }

    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch, now: DateTime<Utc>) -> Result<Task> {
        let (todo, index) = self.task_location(task_id)?;
        let task = &mut todo.tasks[index];

        apply_patch(&mut task.title, &mut task.completed, patch.title, patch.completed);
        task.updated_at = now;
        let task = task.clone();

        todo.updated_at = now;

        Ok(task)
    }

    /// Remove a task together with its subtasks
    pub fn remove_task(&mut self, task_id: &str, now: DateTime<Utc>) -> Result<Task> {
        let (todo, index) = self.task_location(task_id)?;

        let task = todo.tasks.remove(index);
        todo.updated_at = now;

        Ok(task)
    }

    // ===== Subtasks =====

    pub fn add_subtask(&mut self, task_id: &str, title: String, now: DateTime<Utc>) -> Result<Subtask> {
        let (todo, index) = self.task_location(task_id)?;
        let task = &mut todo.tasks[index];

        let subtask = Subtask {
            id: new_id(),
            title,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        task.subtasks.push(subtask.clone());
        task.updated_at = now;
        todo.updated_at = now;

        Ok(subtask)
    }

    pub fn update_subtask(
        &mut self,
        subtask_id: &str,
        patch: SubtaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Subtask> {
        let (todo, task_index, subtask_index) = self.subtask_location(subtask_id)?;
        let task = &mut todo.tasks[task_index];
        let subtask = &mut task.subtasks[subtask_index];

        apply_patch(
            &mut subtask.title,
            &mut subtask.completed,
            patch.title,
            patch.completed,
        );
        subtask.updated_at = now;
        let subtask = subtask.clone();

        task.updated_at = now;
        todo.updated_at = now;

        Ok(subtask)
    }

    pub fn remove_subtask(&mut self, subtask_id: &str, now: DateTime<Utc>) -> Result<Subtask> {
        let (todo, task_index, subtask_index) = self.subtask_location(subtask_id)?;
        let task = &mut todo.tasks[task_index];

        let subtask = task.subtasks.remove(subtask_index);
        task.updated_at = now;
        todo.updated_at = now;

        Ok(subtask)
    }
}

fn apply_patch(
    title: &mut String,
    completed: &mut bool,
    new_title: Option<String>,
    new_completed: Option<bool>,
) {
    if let Some(new_title) = non_blank(new_title) {
        *title = new_title;
    }
    if let Some(done) = new_completed {
        *completed = done;
    }
}
