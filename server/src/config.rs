//! Application configuration
//!
//! Central location for configuration constants, resource limits,
//! and validation boundaries, plus the runtime server configuration
//! extracted from Rocket's figment (`Rocket.toml` / `ROCKET_*` env).

use serde::Deserialize;
use std::path::PathBuf;

// ===== Identity =====

/// Header carrying the opaque user identifier set by the identity provider
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Maximum accepted length of a user identifier
pub const MAX_USER_ID_LENGTH: usize = 256;

// ===== Validation Limits =====

/// Maximum length for a todo, task or subtask title in characters.
/// Prevents unbounded values from being stored.
pub const MAX_TITLE_LENGTH: usize = 1_000;

// ===== Change Notifications =====

/// Snapshots buffered per user before slow subscribers start lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

// ===== Storage =====

/// Default data directory for the JSON and SQLite backends
pub const DEFAULT_DATA_DIR: &str = "data";

/// SQLite database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "todotree.db";

/// Subdirectory holding per-user JSON documents
pub const DOCUMENTS_DIR_NAME: &str = "todos";

/// Persistence technology backing the todo tree store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON document per user
    Json,
    /// One row per entity with parent references
    Sqlite,
    /// Process-local, lost on restart
    Memory,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Json
    }
}

/// Runtime server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl ServerConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_DIR_NAME)
    }
}
