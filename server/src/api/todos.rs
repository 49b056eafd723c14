//! Todo list endpoints

use super::auth::AuthenticatedUser;
use super::{MessageResponse, TitleRequest};
use crate::app::AppState;
use crate::error::Result;
use crate::models::Todo;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, State};

/// List the caller's todos with all tasks and subtasks
#[get("/todos")]
pub async fn list_todos(user: AuthenticatedUser, state: &State<AppState>) -> Result<Json<Vec<Todo>>> {
    state.todos.list_todos(&user).await.map(Json)
}

#[post("/todos", format = "json", data = "<request>")]
pub async fn create_todo(
    user: AuthenticatedUser,
    request: Json<TitleRequest>,
    state: &State<AppState>,
) -> Result<Custom<Json<Todo>>> {
    let todo = state.todos.create_todo(&user, request.into_inner().title).await?;

    Ok(Custom(Status::Created, Json(todo)))
}

#[get("/todos/<todo_id>")]
pub async fn get_todo(
    user: AuthenticatedUser,
    todo_id: &str,
    state: &State<AppState>,
) -> Result<Json<Todo>> {
    state.todos.get_todo(&user, todo_id).await.map(Json)
}

#[put("/todos/<todo_id>", format = "json", data = "<request>")]
pub async fn rename_todo(
    user: AuthenticatedUser,
    todo_id: &str,
    request: Json<TitleRequest>,
    state: &State<AppState>,
) -> Result<Json<Todo>> {
    state
        .todos
        .rename_todo(&user, todo_id, request.into_inner().title)
        .await
        .map(Json)
}

/// Delete a todo with all of its tasks and subtasks
#[delete("/todos/<todo_id>")]
pub async fn delete_todo(
    user: AuthenticatedUser,
    todo_id: &str,
    state: &State<AppState>,
) -> Result<Json<MessageResponse>> {
    state.todos.delete_todo(&user, todo_id).await?;

    Ok(Json(MessageResponse::new("Todo deleted")))
}
