//! Domain models
//!
//! The three-level tree owned by each user: Todo -> Task -> Subtask.
//! All models serialize to camelCase JSON for clients and the JSON store.

use crate::config;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Resolve the identity supplied by the identity provider.
    ///
    /// A missing or blank identity means the caller is unauthenticated.
    pub fn from_identity(identity: Option<&str>) -> Result<Self> {
        match identity.map(str::trim) {
            Some(id) if !id.is_empty() && id.len() <= config::MAX_USER_ID_LENGTH => {
                Ok(Self(id.to_string()))
            }
            _ => Err(AppError::Unauthenticated),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A todo list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A task within a todo list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

/// A subtask within a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

impl Task {
    pub fn find_subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }
}

/// Partial update for a task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

/// Partial update for a subtask. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// Reject a patch with no fields and drop a blank title so it cannot
    /// overwrite the stored one
    pub fn validated(self) -> Result<Self> {
        if self.is_empty() {
            return Err(AppError::InvalidInput(
                "Provide a title or completed value".to_string(),
            ));
        }

        Ok(Self {
            title: check_edit_title(self.title)?,
            completed: self.completed,
        })
    }
}

impl SubtaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// Reject a patch with no fields and drop a blank title so it cannot
    /// overwrite the stored one
    pub fn validated(self) -> Result<Self> {
        if self.is_empty() {
            return Err(AppError::InvalidInput(
                "Provide a title or completed value".to_string(),
            ));
        }

        Ok(Self {
            title: check_edit_title(self.title)?,
            completed: self.completed,
        })
    }
}

/// `None` for missing, empty or whitespace-only titles
pub fn non_blank(title: Option<String>) -> Option<String> {
    title.filter(|t| !t.trim().is_empty())
}

/// Validate a title required for creating an entity
pub fn require_title(title: Option<String>) -> Result<String> {
    let title = non_blank(title)
        .ok_or_else(|| AppError::InvalidInput("Title is required".to_string()))?;

    if title.chars().count() > config::MAX_TITLE_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Title exceeds {} characters",
            config::MAX_TITLE_LENGTH
        )));
    }

    Ok(title)
}

/// Validate a title supplied for an edit; blank means "leave unchanged"
pub fn check_edit_title(title: Option<String>) -> Result<Option<String>> {
    match non_blank(title) {
        Some(title) => require_title(Some(title)).map(Some),
        None => Ok(None),
    }
}
