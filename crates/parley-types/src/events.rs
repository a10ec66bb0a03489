use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Reaction};

/// Notifications emitted by the chat store after each successful mutation.
/// Consumers subscribe to these to re-read or patch their view of the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// A chat room was created
    ChatCreated { chat_id: Uuid, participants: Vec<Uuid> },

    /// A chat room and all of its dependent rows were removed
    ChatDeleted { chat_id: Uuid },

    /// A participant left a chat; their membership history is retained
    ParticipantLeft {
        chat_id: Uuid,
        user_id: Uuid,
        left_at: DateTime<Utc>,
    },

    /// A new message was stored (send or forward)
    MessageCreated { chat_id: Uuid, message: Message },

    /// An existing message's text was changed in place
    MessageEdited {
        chat_id: Uuid,
        message_id: Uuid,
        new_text: String,
        edited_at: DateTime<Utc>,
    },

    /// A message was tombstoned
    MessageDeleted { chat_id: Uuid, message_id: Uuid },

    /// A reaction was added to a message
    ReactionAdded { message_id: Uuid, reaction: Reaction },

    /// A reaction was removed from a message
    ReactionRemoved { message_id: Uuid, reaction_id: Uuid },

    /// Unread messages in a chat were marked read for a user
    MessagesRead {
        chat_id: Uuid,
        user_id: Uuid,
        count: usize,
    },
}

impl ChatEvent {
    /// Returns the chat_id if this event is scoped to a specific chat.
    /// Reaction events are keyed by message and return `None`; consumers
    /// filtering to one room should resolve those through their own view.
    pub fn chat_id(&self) -> Option<Uuid> {
        match self {
            Self::ChatCreated { chat_id, .. } => Some(*chat_id),
            Self::ChatDeleted { chat_id } => Some(*chat_id),
            Self::ParticipantLeft { chat_id, .. } => Some(*chat_id),
            Self::MessageCreated { chat_id, .. } => Some(*chat_id),
            Self::MessageEdited { chat_id, .. } => Some(*chat_id),
            Self::MessageDeleted { chat_id, .. } => Some(*chat_id),
            Self::MessagesRead { chat_id, .. } => Some(*chat_id),
            Self::ReactionAdded { .. } | Self::ReactionRemoved { .. } => None,
        }
    }
}
