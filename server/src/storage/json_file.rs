//! Flat-file JSON document store
//!
//! Stores each user's tree as one pretty-printed JSON file. Identity
//! strings are not filesystem-safe, so files are named by the SHA-256
//! hash of the user id.
//!
//! Example: user "user_2abc" is stored at "todos/<sha256(user_2abc)>.json"

use super::DocumentStore;
use crate::error::{AppError, Result};
use crate::models::{Todo, UserId};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory of per-user JSON documents
#[derive(Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create a new store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("JSON document store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Get file path for a user
    fn get_path(&self, user: &UserId) -> PathBuf {
        self.root.join(format!("{}.json", self.file_key(user)))
    }

    /// SHA-256 hex of the user id
    fn file_key(&self, user: &UserId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(user.as_str().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, user: &UserId) -> Result<Option<Vec<Todo>>> {
        let path = self.get_path(user);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let todos: Vec<Todo> = serde_json::from_slice(&data).map_err(|e| {
            AppError::StoreUnavailable(format!("Corrupt document {:?}: {}", path, e))
        })?;

        tracing::debug!("Read {} todos for user {}", todos.len(), user);

        Ok(Some(todos))
    }

    async fn set(&self, user: &UserId, todos: &[Todo]) -> Result<()> {
        let path = self.get_path(user);
        let data = serde_json::to_vec_pretty(todos)?;

        // Write to temp file first (atomic write)
        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        // Rename to final location
        fs::rename(&temp_path, &path).await?;

        tracing::debug!("Wrote {} todos for user {} ({} bytes)", todos.len(), user, data.len());

        Ok(())
    }
}
