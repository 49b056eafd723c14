//! Change notifications
//!
//! Per-user broadcast of full tree snapshots, published after every
//! successful mutation. Subscribers see the current tree first and then
//! later snapshots. Each snapshot is the whole tree, so a subscriber
//! that falls behind skips the pending ones and gets only the newest.
//!
//! Publishers take a ticket before reading the tree. A snapshot whose
//! ticket is older than one already published is dropped, so a slow
//! reader cannot overwrite a newer tree with a stale one.

use crate::config;
use crate::models::{Todo, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

pub type TreeSnapshot = Arc<Vec<Todo>>;

/// Live view of one user's tree
pub struct TreeSubscription {
    pub current: TreeSnapshot,
    receiver: broadcast::Receiver<TreeSnapshot>,
}

impl TreeSubscription {
    /// Wait for the newest snapshot; `None` once the notifier is gone
    pub async fn next(&mut self) -> Option<TreeSnapshot> {
        let mut latest = loop {
            match self.receiver.recv().await {
                Ok(snapshot) => break snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        };

        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => latest = snapshot,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        self.current = latest.clone();
        Some(latest)
    }
}

/// Position of a snapshot in the user's publish order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PublishTicket(u64);

struct UserChannel {
    sender: broadcast::Sender<TreeSnapshot>,
    published: u64,
}

/// Registry of per-user snapshot channels
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    channels: Arc<Mutex<HashMap<UserId, UserChannel>>>,
    tickets: Arc<AtomicU64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, user: &UserId, current: Vec<Todo>) -> TreeSubscription {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Tickets issued before the channel existed predate this subscriber's read
        let channel = channels.entry(user.clone()).or_insert_with(|| UserChannel {
            sender: broadcast::channel(config::EVENT_CHANNEL_CAPACITY).0,
            published: self.tickets.load(Ordering::SeqCst),
        });

        TreeSubscription {
            current: Arc::new(current),
            receiver: channel.sender.subscribe(),
        }
    }

    /// Reserve the next publish slot for the user, `None` if nobody watches.
    ///
    /// Must be taken after the mutation is stored and before the tree is read.
    pub fn ticket(&self, user: &UserId) -> Option<PublishTicket> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let channel = channels.get(user)?;
        if channel.sender.receiver_count() == 0 {
            return None;
        }

        Some(PublishTicket(self.tickets.fetch_add(1, Ordering::SeqCst) + 1))
    }

    /// Deliver a snapshot unless a newer ticket was already published
    pub fn publish(&self, user: &UserId, ticket: PublishTicket, todos: Vec<Todo>) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(channel) = channels.get_mut(user) else {
            return;
        };

        if ticket.0 <= channel.published {
            tracing::debug!("Dropped stale snapshot for user {}", user);
            return;
        }
        channel.published = ticket.0;

        if channel.sender.send(Arc::new(todos)).is_err() {
            // Last subscriber went away
            channels.remove(user);
            tracing::debug!("Dropped change channel for user {}", user);
        }
    }
}
