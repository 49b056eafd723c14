//! Process-local document store
//!
//! Keeps each user's tree in memory. Used by tests and the `memory`
//! storage backend; contents are lost on restart.

use super::DocumentStore;
use crate::error::Result;
use crate::models::{Todo, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<UserId, Vec<Todo>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `set` calls served
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, user: &UserId) -> Result<Option<Vec<Todo>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.documents.read().await.get(user).cloned())
    }

    async fn set(&self, user: &UserId, todos: &[Todo]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.documents
            .write()
            .await
            .insert(user.clone(), todos.to_vec());
        Ok(())
    }
}
