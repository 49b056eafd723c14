//! HTTP request surface
//!
//! REST resources for todos, tasks and subtasks plus a live event stream.
//! Every route requires an authenticated caller:
//! - `todos`: todo list CRUD
//! - `tasks`: task CRUD nested under a todo
//! - `subtasks`: subtask CRUD nested under a task
//! - `events`: Server-Sent Events carrying the caller's tree

pub mod auth;
pub mod events;
pub mod subtasks;
pub mod tasks;
pub mod todos;

pub use auth::AuthenticatedUser;

use crate::error::ErrorBody;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, routes, Catcher, Route};
use serde::{Deserialize, Serialize};

/// Body of create and rename requests
#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: Option<String>,
}

/// Confirmation body for deletions
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Service information
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn routes() -> Vec<Route> {
    routes![
        health,
        todos::list_todos,
        todos::create_todo,
        todos::get_todo,
        todos::rename_todo,
        todos::delete_todo,
        tasks::list_tasks,
        tasks::create_task,
        tasks::get_task,
        tasks::update_task,
        tasks::delete_task,
        subtasks::list_subtasks,
        subtasks::create_subtask,
        subtasks::update_subtask,
        subtasks::delete_subtask,
        events::tree_events,
    ]
}

// ===== Catchers =====
// Framework-level failures (guards, malformed bodies, unknown routes)
// get the same JSON error shape as handler errors.

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("Bad request"))
}

#[catch(401)]
fn unauthorized() -> Json<ErrorBody> {
    Json(ErrorBody::new("Unauthorized"))
}

#[catch(404)]
fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody::new("Not found"))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    Json(ErrorBody::new("Invalid request body"))
}

#[catch(500)]
fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new("Internal server error"))
}

pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, not_found, unprocessable, internal_error]
}
