//! Task endpoints, nested under their todo

use super::auth::AuthenticatedUser;
use super::{MessageResponse, TitleRequest};
use crate::app::AppState;
use crate::error::Result;
use crate::models::{Task, TaskPatch};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, State};

#[get("/todos/<todo_id>/tasks")]
pub async fn list_tasks(
    user: AuthenticatedUser,
    todo_id: &str,
    state: &State<AppState>,
) -> Result<Json<Vec<Task>>> {
    state.todos.list_tasks(&user, todo_id).await.map(Json)
}

#[post("/todos/<todo_id>/tasks", format = "json", data = "<request>")]
pub async fn create_task(
    user: AuthenticatedUser,
    todo_id: &str,
    request: Json<TitleRequest>,
    state: &State<AppState>,
) -> Result<Custom<Json<Task>>> {
    let task = state
        .todos
        .create_task(&user, todo_id, request.into_inner().title)
        .await?;

    Ok(Custom(Status::Created, Json(task)))
}

#[get("/todos/<todo_id>/tasks/<task_id>")]
pub async fn get_task(
    user: AuthenticatedUser,
    todo_id: &str,
    task_id: &str,
    state: &State<AppState>,
) -> Result<Json<Task>> {
    state.todos.get_task(&user, todo_id, task_id).await.map(Json)
}

#[put("/todos/<todo_id>/tasks/<task_id>", format = "json", data = "<patch>")]
pub async fn update_task(
    user: AuthenticatedUser,
    todo_id: &str,
    task_id: &str,
    patch: Json<TaskPatch>,
    state: &State<AppState>,
) -> Result<Json<Task>> {
    state.todos.get_task(&user, todo_id, task_id).await?;

    state
        .todos
        .update_task(&user, task_id, patch.into_inner())
        .await
        .map(Json)
}

/// Delete a task with its subtasks
#[delete("/todos/<todo_id>/tasks/<task_id>")]
pub async fn delete_task(
    user: AuthenticatedUser,
    todo_id: &str,
    task_id: &str,
    state: &State<AppState>,
) -> Result<Json<MessageResponse>> {
    state.todos.get_task(&user, todo_id, task_id).await?;
    state.todos.delete_task(&user, task_id).await?;

    Ok(Json(MessageResponse::new("Task deleted")))
}
