//! Subtask endpoints, nested under their todo and task

use super::auth::AuthenticatedUser;
use super::{MessageResponse, TitleRequest};
use crate::app::AppState;
use crate::error::Result;
use crate::models::{Subtask, SubtaskPatch};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, State};

#[get("/todos/<todo_id>/tasks/<task_id>/subtasks")]
pub async fn list_subtasks(
    user: AuthenticatedUser,
    todo_id: &str,
    task_id: &str,
    state: &State<AppState>,
) -> Result<Json<Vec<Subtask>>> {
    state
        .todos
        .list_subtasks(&user, todo_id, task_id)
        .await
        .map(Json)
}

#[post("/todos/<todo_id>/tasks/<task_id>/subtasks", format = "json", data = "<request>")]
pub async fn create_subtask(
    user: AuthenticatedUser,
    todo_id: &str,
    task_id: &str,
    request: Json<TitleRequest>,
    state: &State<AppState>,
) -> Result<Custom<Json<Subtask>>> {
    state.todos.get_task(&user, todo_id, task_id).await?;

    let subtask = state
        .todos
        .create_subtask(&user, task_id, request.into_inner().title)
        .await?;

    Ok(Custom(Status::Created, Json(subtask)))
}

#[put(
    "/todos/<todo_id>/tasks/<task_id>/subtasks/<subtask_id>",
    format = "json",
    data = "<patch>"
)]
pub async fn update_subtask(
    user: AuthenticatedUser,
    todo_id: &str,
    task_id: &str,
    subtask_id: &str,
    patch: Json<SubtaskPatch>,
    state: &State<AppState>,
) -> Result<Json<Subtask>> {
    state
        .todos
        .ensure_subtask(&user, todo_id, task_id, subtask_id)
        .await?;

    state
        .todos
        .update_subtask(&user, subtask_id, patch.into_inner())
        .await
        .map(Json)
}

#[delete("/todos/<todo_id>/tasks/<task_id>/subtasks/<subtask_id>")]
pub async fn delete_subtask(
    user: AuthenticatedUser,
    todo_id: &str,
    task_id: &str,
    subtask_id: &str,
    state: &State<AppState>,
) -> Result<Json<MessageResponse>> {
    state
        .todos
        .ensure_subtask(&user, todo_id, task_id, subtask_id)
        .await?;
    state.todos.delete_subtask(&user, subtask_id).await?;

    Ok(Json(MessageResponse::new("Subtask deleted")))
}
