//! Application state and initialization
//!
//! Builds the configured todo tree store, wraps it in the service layer
//! and attaches routes, catchers and state to a Rocket instance.

use crate::api;
use crate::config::{ServerConfig, StorageBackend};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::TodoService;
use crate::storage::{DocumentTodoStore, JsonFileStore, MemoryDocumentStore, TodoStore};
use rocket::{Build, Rocket};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub todos: TodoService,
}

impl AppState {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self {
            todos: TodoService::new(store),
        }
    }
}

/// Application setup - called once on startup
pub async fn setup(config: &ServerConfig) -> Result<AppState> {
    tracing::info!("Initializing application with {:?} storage", config.storage);

    let store: Arc<dyn TodoStore> = match config.storage {
        StorageBackend::Json => {
            let documents = JsonFileStore::new(config.documents_dir());
            documents.initialize().await?;
            tracing::info!("Todo documents directory: {:?}", documents.root());
            Arc::new(DocumentTodoStore::new(documents))
        }
        StorageBackend::Sqlite => {
            let pool = create_pool(&config.database_path()).await?;
            Arc::new(Repository::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(DocumentTodoStore::new(MemoryDocumentStore::new()))
        }
    };

    tracing::info!("Application initialized successfully");

    Ok(AppState::new(store))
}

/// Attach state, routes and catchers
pub fn build(rocket: Rocket<Build>, state: AppState) -> Rocket<Build> {
    rocket
        .manage(state)
        .mount("/api", api::routes())
        .register("/", api::catchers())
}
