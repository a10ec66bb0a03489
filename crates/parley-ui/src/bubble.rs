use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use parley_store::ChatStore;
use parley_types::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleState {
    Idle,
    OptionsMenuOpen,
    EmojiSelectorOpen,
    ChatSelectorOpen,
}

/// Per-message interaction controller: routes the long-press menu, the
/// emoji selector and the forwarding flow into store mutations. Store
/// failures never escape a handler — they are logged and the bubble simply
/// stays as it was.
pub struct BubbleController {
    store: Arc<ChatStore>,
    message: Message,
    current_user_id: Uuid,
    state: BubbleState,
}

impl BubbleController {
    pub fn new(store: Arc<ChatStore>, message: Message, current_user_id: Uuid) -> Self {
        Self {
            store,
            message,
            current_user_id,
            state: BubbleState::Idle,
        }
    }

    pub fn state(&self) -> BubbleState {
        self.state
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn is_own(&self) -> bool {
        self.message.sender_id == self.current_user_id
    }

    /// Own messages get the options menu, everyone else's the emoji selector.
    pub fn long_press(&mut self) {
        self.state = if self.is_own() {
            BubbleState::OptionsMenuOpen
        } else {
            BubbleState::EmojiSelectorOpen
        };
    }

    pub fn dismiss(&mut self) {
        self.state = BubbleState::Idle;
    }

    /// Replace semantics: the user's existing reaction is removed first,
    /// then the new one added — even when the emoji is the same.
    pub async fn select_emoji(&mut self, emoji: &str) {
        if let Some(existing) = self.message.reaction_by(self.current_user_id).map(|r| r.id) {
            match self.store.remove_reaction(existing, self.message.id).await {
                Ok(()) => self.message.reactions.retain(|r| r.id != existing),
                Err(e) => warn!("Error removing previous reaction: {}", e),
            }
        }

        match self
            .store
            .add_reaction(self.message.id, self.current_user_id, emoji)
            .await
        {
            Ok(reaction) => self.message.reactions.push(reaction),
            Err(e) => warn!("Error adding reaction: {}", e),
        }

        self.state = BubbleState::Idle;
    }

    /// Tapping an existing reaction chip removes it.
    pub async fn remove_reaction(&mut self, reaction_id: Uuid) {
        match self
            .store
            .remove_reaction(reaction_id, self.message.id)
            .await
        {
            Ok(()) => self.message.reactions.retain(|r| r.id != reaction_id),
            Err(e) => warn!("Error removing reaction: {}", e),
        }
    }

    /// From the options menu into the chat selector.
    pub fn select_forward(&mut self) {
        self.state = BubbleState::ChatSelectorOpen;
    }

    /// Forwards to the chosen chat. The selector stays open on failure so
    /// the user can pick again.
    pub async fn forward_to(&mut self, target_chat_id: Uuid) {
        match self
            .store
            .forward_message(self.message.id, target_chat_id, self.current_user_id)
            .await
        {
            Ok(_) => self.state = BubbleState::Idle,
            Err(e) => warn!("Error forwarding message: {}", e),
        }
    }

    pub async fn select_delete(&mut self) {
        if let Err(e) = self
            .store
            .delete_message(self.message.id, self.message.chat_id, self.current_user_id)
            .await
        {
            warn!("Error deleting message: {}", e);
        }
        self.state = BubbleState::Idle;
    }

    /// Closes the menu and hands back (id, current text) for the room's
    /// composer to take over.
    pub fn select_edit(&mut self) -> (Uuid, String) {
        self.state = BubbleState::Idle;
        (
            self.message.id,
            self.message.text.clone().unwrap_or_default(),
        )
    }
}
