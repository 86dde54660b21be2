//! # Conversation Directory
//!
//! One thread per unordered pair of users per service. Use
//! [`Conversations::get_or_create_conversation`] to open a thread: it
//! looks for an existing one and creates it only if absent, inside one
//! store transaction, so repeated or reversed calls land on the same
//! thread. [`Conversations::create_conversation`] is the raw primitive
//! and does not deduplicate.

use std::cmp::Reverse;

use dormdash_core::{ConversationId, ServiceId, UserId};
use dormdash_store::{EntityStore, StoreError, Txn};

use crate::error::MarketError;
use crate::model::{Conversation, Message, NewConversation, NewMessage};

/// A conversation with its most recent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    pub conversation: Conversation,
    pub last_message: Option<Message>,
}

/// The conversation directory over an [`EntityStore`].
#[derive(Debug, Clone, Copy)]
pub struct Conversations<'a> {
    store: &'a EntityStore,
}

impl<'a> Conversations<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    /// The thread of `a` and `b` about `service`, in either participant order.
    pub fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
        service: &ServiceId,
    ) -> Result<Option<Conversation>, StoreError> {
        self.store.find(|c: &Conversation| c.is_thread(a, b, service))
    }

    /// Create a thread unconditionally.
    pub fn create_conversation(
        &self,
        a: &UserId,
        b: &UserId,
        service: &ServiceId,
    ) -> Result<Conversation, MarketError> {
        self.store.transaction(|txn| open_thread(txn, a, b, service))
    }

    /// The existing thread for `(a, b, service)`, or a new one.
    pub fn get_or_create_conversation(
        &self,
        a: &UserId,
        b: &UserId,
        service: &ServiceId,
    ) -> Result<Conversation, MarketError> {
        self.store.transaction(|txn| {
            if let Some(existing) = txn.find(|c: &Conversation| c.is_thread(a, b, service))? {
                return Ok(existing);
            }
            open_thread(txn, a, b, service)
        })
    }

    pub fn conversation(&self, id: &ConversationId) -> Result<Option<Conversation>, StoreError> {
        self.store.get(id)
    }

    /// Threads `user` takes part in, in creation order.
    pub fn conversations_by_user(&self, user: &UserId) -> Result<Vec<Conversation>, StoreError> {
        self.store.filter(|c: &Conversation| c.involves(user))
    }

    /// Append a message. `Ok(None)` if the conversation does not exist.
    ///
    /// The text is trimmed and must not be empty; the sender must be a
    /// participant.
    pub fn post_message(
        &self,
        conversation: &ConversationId,
        sender: &UserId,
        text: &str,
    ) -> Result<Option<Message>, MarketError> {
        self.store.transaction(|txn| {
            let Some(convo) = txn.get::<Conversation>(conversation)? else {
                return Ok(None);
            };
            if !convo.involves(sender) {
                return Err(MarketError::NotAParticipant {
                    user: sender.to_string(),
                    conversation: conversation.to_string(),
                });
            }
            let message = txn.create(NewMessage {
                conversation_id: convo.id,
                sender_id: sender.clone(),
                text: text.to_string(),
            })?;
            tracing::debug!(conversation = %message.conversation_id, message = %message.id, "message posted");
            Ok(Some(message))
        })
    }

    /// The full history of a conversation, oldest first.
    ///
    /// Messages with equal timestamps keep the order they were posted in.
    pub fn list_messages(&self, conversation: &ConversationId) -> Result<Vec<Message>, StoreError> {
        let mut messages = self.store.filter(|m: &Message| &m.conversation_id == conversation)?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    /// `user`'s conversations, newest first, each with its last message.
    pub fn inbox(&self, user: &UserId) -> Result<Vec<InboxEntry>, StoreError> {
        let mut threads = self.conversations_by_user(user)?;
        threads.sort_by_key(|c| Reverse(c.created_at));
        threads
            .into_iter()
            .map(|conversation| {
                let last_message = self.list_messages(&conversation.id)?.pop();
                Ok(InboxEntry {
                    conversation,
                    last_message,
                })
            })
            .collect()
    }
}

fn open_thread(
    txn: &mut Txn<'_>,
    a: &UserId,
    b: &UserId,
    service: &ServiceId,
) -> Result<Conversation, MarketError> {
    let convo = txn.create(NewConversation {
        participants: [a.clone(), b.clone()],
        service_id: service.clone(),
    })?;
    tracing::info!(conversation = %convo.id, service = %convo.service_id, "conversation opened");
    Ok(convo)
}
