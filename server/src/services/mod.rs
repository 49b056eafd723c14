//! Services module
//!
//! Business logic services that coordinate between the HTTP surface and
//! the todo tree store.

pub mod events;
pub mod todos;

pub use events::{ChangeNotifier, PublishTicket, TreeSnapshot, TreeSubscription};
pub use todos::TodoService;
