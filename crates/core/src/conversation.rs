//! Conversation-related types.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use relay_agent_model::ModelMessage;
use tokio::sync::{Mutex, MutexGuard};

/// Represents a conversation.
///
/// Messages are append-only. Turns on the same conversation are
/// serialized by the turn lock, so only one turn loop appends at a time.
#[derive(Debug)]
pub struct Conversation {
    id: String,
    messages: RwLock<Vec<ModelMessage>>,
    turn_lock: Mutex<()>,
}

impl Conversation {
    fn new(id: String) -> Self {
        Self {
            id,
            messages: Default::default(),
            turn_lock: Default::default(),
        }
    }

    /// Returns the identifier of this conversation.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a snapshot of the messages.
    pub fn messages(&self) -> Vec<ModelMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the conversation has no messages yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push(&self, msg: ModelMessage) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(msg);
    }

    pub(crate) async fn lock_turn(&self) -> MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }
}

/// All conversations of an agent, kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Conversation>>>,
}

impl ConversationStore {
    /// Returns the conversation with `id`, creating it on first reference.
    ///
    /// A missing or empty `id` creates a conversation with a fresh id.
    pub fn get_or_create(&self, id: Option<&str>) -> Arc<Conversation> {
        let id = match id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_owned(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        if let Some(conversation) = self.get(&id) {
            return conversation;
        }

        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            conversations
                .entry(id)
                .or_insert_with_key(|id| Arc::new(Conversation::new(id.clone()))),
        )
    }

    /// Looks up an existing conversation.
    pub fn get(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Returns the number of conversations.
    pub fn len(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if there are no conversations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
