use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use parley_store::{ChatStore, Result};
use parley_types::{Message, User};

/// Stable sort by timestamp. Storage return order is never trusted;
/// equal-timestamp messages keep their relative order.
pub fn sort_for_display(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.timestamp);
}

/// One open conversation: the composer draft, the at-most-one message being
/// edited, and the display-ordered view of the chat's messages.
pub struct ChatRoomSession {
    store: Arc<ChatStore>,
    chat_id: Uuid,
    current_user_id: Uuid,
    draft: String,
    editing: Option<Uuid>,
}

impl ChatRoomSession {
    /// Opens the room, marking its unread messages read for this user.
    pub async fn open(store: Arc<ChatStore>, chat_id: Uuid, current_user_id: Uuid) -> Result<Self> {
        store.mark_messages_as_read(chat_id, current_user_id).await?;
        Ok(Self {
            store,
            chat_id,
            current_user_id,
            draft: String::new(),
            editing: None,
        })
    }

    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Pre-fills the composer and redirects the next send to an edit.
    pub fn begin_edit(&mut self, message: &Message) {
        self.editing = Some(message.id);
        self.draft = message.text.clone().unwrap_or_default();
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.draft.clear();
    }

    /// Sends the draft (or applies the pending edit). On failure the draft
    /// and edit mode are kept so the user can simply press send again.
    pub async fn send(&mut self, image_uri: Option<&str>) {
        if self.draft.trim().is_empty() && image_uri.is_none() {
            return;
        }

        let result = match self.editing {
            Some(message_id) => self
                .store
                .edit_message(message_id, self.draft.trim())
                .await
                .map(|_| ()),
            None => self
                .store
                .send_message(self.chat_id, &self.draft, self.current_user_id, image_uri)
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => {
                self.draft.clear();
                self.editing = None;
            }
            Err(e) => warn!("Error sending message: {}", e),
        }
    }

    /// The chat's visible messages in display order.
    pub async fn messages(&self) -> Result<Vec<Message>> {
        let mut messages = self.store.messages_for_chat(self.chat_id).await?;
        sort_for_display(&mut messages);
        Ok(messages)
    }

    /// Header title: up to two non-self participant names plus an overflow
    /// count, e.g. "Bob, Carol +2".
    pub fn display_name(&self, participants: &[User]) -> String {
        let others: Vec<&User> = participants
            .iter()
            .filter(|u| u.id != self.current_user_id)
            .collect();

        let names: Vec<&str> = others.iter().take(2).map(|u| u.name.as_str()).collect();
        if names.is_empty() {
            return "Chat".to_string();
        }

        let extra = others.len() - names.len();
        if extra > 0 {
            format!("{} +{}", names.join(", "), extra)
        } else {
            names.join(", ")
        }
    }
}
