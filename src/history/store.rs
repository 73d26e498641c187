//! Conversation storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use super::{ConversationTurn, UserId};

/// One user's turns, guarded independently of every other conversation.
type Conversation = Arc<Mutex<Vec<ConversationTurn>>>;

/// Thread-safe store for per-user conversations.
///
/// Cloning is cheap and every clone refers to the same conversations. The
/// key map sits behind a `RwLock`; each conversation has its own `Mutex`, so
/// appends on one key are serialized while other keys proceed.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    inner: Arc<HistoryStoreInner>,
}

#[derive(Debug)]
struct HistoryStoreInner {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HistoryStoreInner {
                conversations: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Append a turn to a user's conversation, creating it on first use.
    pub fn append(&self, user_id: &UserId, turn: ConversationTurn) {
        self.push(user_id, turn, |_| ());
    }

    /// Append a turn and return the conversation as it stands right after.
    ///
    /// The snapshot is taken under the same lock as the append, so it always
    /// ends with `turn`.
    pub fn append_and_snapshot(
        &self,
        user_id: &UserId,
        turn: ConversationTurn,
    ) -> Vec<ConversationTurn> {
        self.push(user_id, turn, |turns| turns.to_vec())
    }

    /// Get a copy of a user's conversation. Unknown users have none.
    #[must_use]
    pub fn read(&self, user_id: &str) -> Vec<ConversationTurn> {
        self.conversation(user_id)
            .map_or_else(Vec::new, |conversation| {
                let turns = lock(&conversation);
                turns.clone()
            })
    }

    /// Number of turns recorded for a user.
    #[must_use]
    pub fn message_count(&self, user_id: &str) -> usize {
        self.conversation(user_id).map_or(0, |conversation| {
            let turns = lock(&conversation);
            turns.len()
        })
    }

    /// Number of users with at least one recorded turn.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.inner
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_count() == 0
    }

    /// List all user IDs with a conversation.
    #[must_use]
    pub fn user_ids(&self) -> Vec<String> {
        self.inner
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn conversation(&self, user_id: &str) -> Option<Conversation> {
        let guard = self
            .inner
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(user_id).map(Arc::clone)
    }

    fn push<R>(
        &self,
        user_id: &UserId,
        turn: ConversationTurn,
        after: impl FnOnce(&[ConversationTurn]) -> R,
    ) -> R {
        // Existing conversation: only the per-user lock is held while pushing.
        if let Some(conversation) = self.conversation(user_id.as_str()) {
            let mut turns = lock(&conversation);
            turns.push(turn);
            return after(turns.as_slice());
        }

        // First turn for this user. The turn is pushed before the map lock is
        // released so a key never becomes visible with an empty conversation.
        let mut guard = self
            .inner
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let conversation = guard.entry(user_id.as_str().to_owned()).or_default();
        let mut turns = lock(conversation);
        turns.push(turn);
        after(turns.as_slice())
    }
}

fn lock(conversation: &Mutex<Vec<ConversationTurn>>) -> MutexGuard<'_, Vec<ConversationTurn>> {
    conversation.lock().unwrap_or_else(PoisonError::into_inner)
}
