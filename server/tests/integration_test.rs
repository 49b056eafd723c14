//! Integration tests for Todotree
//!
//! These tests drive the HTTP surface end to end:
//! - Todo, task and subtask CRUD over every route
//! - Authentication and error responses
//! - Cascading deletes and ancestor timestamps
//! - Live tree events
//! - Each storage backend behind the same routes

use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use rocket::tokio::io::AsyncReadExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use todotree::app::{self, AppState};
use todotree::config::{ServerConfig, StorageBackend};
use todotree::models::{Subtask, Task, Todo};
use todotree::storage::{DocumentTodoStore, MemoryDocumentStore};

/// Helper to create a client over an in-memory store, returning the
/// shared document store for inspection
async fn create_test_client() -> (Client, Arc<MemoryDocumentStore>) {
    let documents = Arc::new(MemoryDocumentStore::new());
    let state = AppState::new(Arc::new(DocumentTodoStore::new(documents.clone())));

    let client = Client::tracked(app::build(rocket::build(), state))
        .await
        .unwrap();

    (client, documents)
}

/// Helper to create a client over a configured on-disk backend
async fn create_client_with(storage: StorageBackend) -> (Client, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = ServerConfig {
        storage,
        data_dir: temp_dir.path().to_path_buf(),
    };

    let state = app::setup(&config).await.unwrap();
    let client = Client::tracked(app::build(rocket::build(), state))
        .await
        .unwrap();

    (client, temp_dir)
}

fn as_user(id: &str) -> Header<'static> {
    Header::new("X-User-Id", id.to_string())
}

async fn create_todo(client: &Client, user: &str, title: &str) -> Todo {
    let response = client
        .post("/api/todos")
        .header(as_user(user))
        .json(&json!({ "title": title }))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Created);
    response.into_json().await.unwrap()
}

async fn create_task(client: &Client, user: &str, todo_id: &str, title: &str) -> Task {
    let response = client
        .post(format!("/api/todos/{}/tasks", todo_id))
        .header(as_user(user))
        .json(&json!({ "title": title }))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Created);
    response.into_json().await.unwrap()
}

async fn create_subtask(
    client: &Client,
    user: &str,
    todo_id: &str,
    task_id: &str,
    title: &str,
) -> Subtask {
    let response = client
        .post(format!("/api/todos/{}/tasks/{}/subtasks", todo_id, task_id))
        .header(as_user(user))
        .json(&json!({ "title": title }))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Created);
    response.into_json().await.unwrap()
}

async fn get_todo(client: &Client, user: &str, todo_id: &str) -> Todo {
    let response = client
        .get(format!("/api/todos/{}", todo_id))
        .header(as_user(user))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    response.into_json().await.unwrap()
}

async fn error_message(response: LocalResponse<'_>) -> String {
    let body: Value = response.into_json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

/// Read from an event stream until one complete event has arrived
async fn next_event(response: &mut LocalResponse<'_>) -> String {
    let mut event = Vec::new();
    let mut buf = [0u8; 4096];

    while !String::from_utf8_lossy(&event).contains("\n\n") {
        let read = rocket::tokio::time::timeout(Duration::from_secs(5), response.read(&mut buf))
            .await
            .expect("timed out waiting for event")
            .unwrap();
        assert!(read > 0, "event stream ended");
        event.extend_from_slice(&buf[..read]);
    }

    String::from_utf8(event).unwrap()
}

#[tokio::test]
async fn test_todo_crud_operations() {
    let (client, _documents) = create_test_client().await;

    // Create todo
    let todo = create_todo(&client, "alice", "Groceries").await;
    assert_eq!(todo.title, "Groceries");
    assert_eq!(todo.user_id, "alice");
    assert!(!todo.id.is_empty());
    assert!(todo.tasks.is_empty());
    assert_eq!(todo.created_at, todo.updated_at);

    // Read todo
    let retrieved = get_todo(&client, "alice", &todo.id).await;
    assert_eq!(retrieved, todo);

    // Rename todo
    let response = client
        .put(format!("/api/todos/{}", todo.id))
        .header(as_user("alice"))
        .json(&json!({ "title": "Weekly groceries" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let renamed: Todo = response.into_json().await.unwrap();
    assert_eq!(renamed.title, "Weekly groceries");
    assert_eq!(renamed.created_at, todo.created_at);
    assert!(renamed.updated_at >= todo.updated_at);

    // List todos
    let response = client
        .get("/api/todos")
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let todos: Vec<Todo> = response.into_json().await.unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].title, "Weekly groceries");

    // Delete todo
    let response = client
        .delete(format!("/api/todos/{}", todo.id))
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["message"], "Todo deleted");

    // Gone
    let response = client
        .get(format!("/api/todos/{}", todo.id))
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[tokio::test]
async fn test_task_and_subtask_operations() {
    let (client, _documents) = create_test_client().await;

    let todo = create_todo(&client, "alice", "Groceries").await;
    let task = create_task(&client, "alice", &todo.id, "Buy milk").await;
    assert!(!task.completed);
    assert!(task.subtasks.is_empty());

    let subtask = create_subtask(&client, "alice", &todo.id, &task.id, "2%").await;
    assert!(!subtask.completed);

    // Toggle the subtask only
    let response = client
        .put(format!(
            "/api/todos/{}/tasks/{}/subtasks/{}",
            todo.id, task.id, subtask.id
        ))
        .header(as_user("alice"))
        .json(&json!({ "completed": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let toggled: Subtask = response.into_json().await.unwrap();
    assert!(toggled.completed);
    assert_eq!(toggled.title, "2%");

    // Parent completion is independent of its children
    let response = client
        .get(format!("/api/todos/{}/tasks/{}", todo.id, task.id))
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let fetched: Task = response.into_json().await.unwrap();
    assert!(!fetched.completed);
    assert!(fetched.subtasks[0].completed);

    // Ancestors carry the subtask's modification time
    let fetched_todo = get_todo(&client, "alice", &todo.id).await;
    assert_eq!(fetched_todo.updated_at, toggled.updated_at);
    assert_eq!(fetched_todo.tasks[0].updated_at, toggled.updated_at);

    // Update task title and completion together
    let response = client
        .put(format!("/api/todos/{}/tasks/{}", todo.id, task.id))
        .header(as_user("alice"))
        .json(&json!({ "title": "Buy oat milk", "completed": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let updated: Task = response.into_json().await.unwrap();
    assert_eq!(updated.title, "Buy oat milk");
    assert!(updated.completed);
    assert_eq!(updated.subtasks.len(), 1);

    // Listings
    let response = client
        .get(format!("/api/todos/{}/tasks", todo.id))
        .header(as_user("alice"))
        .dispatch()
        .await;
    let tasks: Vec<Task> = response.into_json().await.unwrap();
    assert_eq!(tasks.len(), 1);

    let response = client
        .get(format!("/api/todos/{}/tasks/{}/subtasks", todo.id, task.id))
        .header(as_user("alice"))
        .dispatch()
        .await;
    let subtasks: Vec<Subtask> = response.into_json().await.unwrap();
    assert_eq!(subtasks.len(), 1);
    assert_eq!(subtasks[0].id, subtask.id);

    // Delete subtask
    let response = client
        .delete(format!(
            "/api/todos/{}/tasks/{}/subtasks/{}",
            todo.id, task.id, subtask.id
        ))
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let fetched_todo = get_todo(&client, "alice", &todo.id).await;
    assert!(fetched_todo.tasks[0].subtasks.is_empty());
    assert!(fetched_todo.updated_at >= toggled.updated_at);
}

#[tokio::test]
async fn test_cascade_delete() {
    let (client, _documents) = create_test_client().await;

    let groceries = create_todo(&client, "alice", "Groceries").await;
    let chores = create_todo(&client, "alice", "Chores").await;
    let milk = create_task(&client, "alice", &groceries.id, "Buy milk").await;
    let eggs = create_task(&client, "alice", &groceries.id, "Buy eggs").await;
    let subtask = create_subtask(&client, "alice", &groceries.id, &milk.id, "2%").await;

    // Deleting a task removes its subtasks but keeps the todo
    let response = client
        .delete(format!("/api/todos/{}/tasks/{}", groceries.id, milk.id))
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let fetched = get_todo(&client, "alice", &groceries.id).await;
    assert_eq!(fetched.tasks.len(), 1);
    assert_eq!(fetched.tasks[0].id, eggs.id);

    let response = client
        .put(format!(
            "/api/todos/{}/tasks/{}/subtasks/{}",
            groceries.id, milk.id, subtask.id
        ))
        .header(as_user("alice"))
        .json(&json!({ "completed": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    // Deleting a todo removes everything beneath it and nothing else
    client
        .delete(format!("/api/todos/{}", groceries.id))
        .header(as_user("alice"))
        .dispatch()
        .await;

    let response = client
        .get("/api/todos")
        .header(as_user("alice"))
        .dispatch()
        .await;
    let todos: Vec<Todo> = response.into_json().await.unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].id, chores.id);
}

#[tokio::test]
async fn test_requests_without_identity_are_rejected() {
    let (client, documents) = create_test_client().await;

    let response = client.get("/api/todos").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(error_message(response).await, "Unauthorized");

    let response = client
        .post("/api/todos")
        .json(&json!({ "title": "Groceries" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/api/todos")
        .header(as_user("   "))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // The store is never consulted
    assert_eq!(documents.read_count(), 0);
    assert_eq!(documents.write_count(), 0);
}

#[tokio::test]
async fn test_missing_title_is_rejected() {
    let (client, documents) = create_test_client().await;

    let response = client
        .post("/api/todos")
        .header(as_user("alice"))
        .json(&json!({}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(error_message(response).await, "Title is required");

    let response = client
        .post("/api/todos")
        .header(as_user("alice"))
        .json(&json!({ "title": "  " }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    assert_eq!(documents.write_count(), 0);

    // Malformed bodies get the same error shape
    let response = client
        .post("/api/todos")
        .header(as_user("alice"))
        .header(ContentType::JSON)
        .body("{ not json")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    assert!(!error_message(response).await.is_empty());
}

#[tokio::test]
async fn test_empty_update_is_rejected() {
    let (client, _documents) = create_test_client().await;

    let todo = create_todo(&client, "alice", "Groceries").await;
    let task = create_task(&client, "alice", &todo.id, "Buy milk").await;

    let response = client
        .put(format!("/api/todos/{}/tasks/{}", todo.id, task.id))
        .header(as_user("alice"))
        .json(&json!({}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    // A blank title keeps the current one
    let response = client
        .put(format!("/api/todos/{}", todo.id))
        .header(as_user("alice"))
        .json(&json!({ "title": "" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let renamed: Todo = response.into_json().await.unwrap();
    assert_eq!(renamed.title, "Groceries");
}

#[tokio::test]
async fn test_not_found_responses() {
    let (client, _documents) = create_test_client().await;

    let groceries = create_todo(&client, "alice", "Groceries").await;
    let chores = create_todo(&client, "alice", "Chores").await;
    let task = create_task(&client, "alice", &groceries.id, "Buy milk").await;

    let response = client
        .put("/api/todos/does-not-exist")
        .header(as_user("alice"))
        .json(&json!({ "title": "x" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    assert!(error_message(response).await.contains("Todo not found"));

    let response = client
        .post("/api/todos/does-not-exist/tasks")
        .header(as_user("alice"))
        .json(&json!({ "title": "x" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    // A task addressed through the wrong todo does not exist there
    let response = client
        .put(format!("/api/todos/{}/tasks/{}", chores.id, task.id))
        .header(as_user("alice"))
        .json(&json!({ "completed": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    assert!(error_message(response).await.contains("Task not found"));

    let fetched = get_todo(&client, "alice", &groceries.id).await;
    assert!(!fetched.tasks[0].completed);

    // Unknown routes use the JSON error shape too
    let response = client
        .get("/api/nothing-here")
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(error_message(response).await, "Not found");
}

#[tokio::test]
async fn test_users_are_isolated() {
    let (client, _documents) = create_test_client().await;

    let todo = create_todo(&client, "alice", "Groceries").await;

    let response = client
        .get("/api/todos")
        .header(as_user("bob"))
        .dispatch()
        .await;
    let todos: Vec<Todo> = response.into_json().await.unwrap();
    assert!(todos.is_empty());

    let response = client
        .delete(format!("/api/todos/{}", todo.id))
        .header(as_user("bob"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let fetched = get_todo(&client, "alice", &todo.id).await;
    assert_eq!(fetched.title, "Groceries");
}

#[tokio::test]
async fn test_live_tree_events() {
    let (client, _documents) = create_test_client().await;

    let mut events = client
        .get("/api/events")
        .header(as_user("alice"))
        .dispatch()
        .await;
    assert_eq!(events.status(), Status::Ok);

    // Current tree on connect
    let initial = next_event(&mut events).await;
    assert!(initial.contains("todos"));
    assert!(initial.contains("[]"));

    create_todo(&client, "alice", "Groceries").await;

    let update = next_event(&mut events).await;
    assert!(update.contains("Groceries"));

    // Other users' changes are not delivered
    create_todo(&client, "bob", "Bob's list").await;
    create_todo(&client, "alice", "Chores").await;

    let update = next_event(&mut events).await;
    assert!(update.contains("Chores"));
    assert!(!update.contains("Bob's list"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let (client, _documents) = create_test_client().await;

    let response = client.get("/api/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

/// Same scenario through a configured backend
async fn persisted_backend_scenario(storage: StorageBackend) {
    let (client, temp_dir) = create_client_with(storage).await;

    let todo = create_todo(&client, "alice", "Groceries").await;
    let task = create_task(&client, "alice", &todo.id, "Buy milk").await;
    create_subtask(&client, "alice", &todo.id, &task.id, "2%").await;

    let fetched = get_todo(&client, "alice", &todo.id).await;
    assert_eq!(fetched.tasks.len(), 1);
    assert_eq!(fetched.tasks[0].subtasks.len(), 1);

    // A fresh server over the same data directory sees the same tree
    drop(client);
    let config = ServerConfig {
        storage,
        data_dir: temp_dir.path().to_path_buf(),
    };
    let state = app::setup(&config).await.unwrap();
    let client = Client::tracked(app::build(rocket::build(), state))
        .await
        .unwrap();

    let reloaded = get_todo(&client, "alice", &todo.id).await;
    assert_eq!(reloaded, fetched);

    client
        .delete(format!("/api/todos/{}", todo.id))
        .header(as_user("alice"))
        .dispatch()
        .await;

    let response = client
        .get("/api/todos")
        .header(as_user("alice"))
        .dispatch()
        .await;
    let todos: Vec<Todo> = response.into_json().await.unwrap();
    assert!(todos.is_empty());
}

#[tokio::test]
async fn test_json_file_backend() {
    persisted_backend_scenario(StorageBackend::Json).await;
}

#[tokio::test]
async fn test_sqlite_backend() {
    persisted_backend_scenario(StorageBackend::Sqlite).await;
}
