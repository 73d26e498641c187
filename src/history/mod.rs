//! Per-user conversation history.
//!
//! This module provides the in-memory store that holds every user's
//! conversation for the lifetime of the process. Conversations are keyed by
//! an opaque, non-empty user identifier and only ever grow.
//!
//! # Architecture
//!
//! - [`ConversationTurn`]: one role-tagged message
//! - [`UserId`]: validated conversation key
//! - [`HistoryStore`]: thread-safe store for all conversations
//!
//! # Example
//!
//! ```rust
//! use chat_assistant::history::{ConversationTurn, HistoryStore, UserId};
//!
//! let store = HistoryStore::new();
//! let alice = UserId::new("alice").unwrap();
//! store.append(&alice, ConversationTurn::user("Hello!"));
//!
//! assert_eq!(store.read("alice").len(), 1);
//! assert!(store.read("bob").is_empty());
//! ```

mod store;
mod turn;

pub use store::HistoryStore;
pub use turn::{ConversationTurn, HistoryError, Role, UserId};
