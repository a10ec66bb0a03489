use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::error;
use uuid::Uuid;

use parley_db::Database;
use parley_db::models::MessageRow;
use parley_types::{
    Chat, ChatEvent, Message, Multimedia, MultimediaKind, Reaction, ThemeMode, User,
};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::hydrate;

const THEME_KEY: &str = "theme";

/// Current time truncated to the store's millisecond resolution, so values
/// round-trip unchanged through SQLite.
fn now() -> chrono::DateTime<Utc> {
    chrono::DateTime::<Utc>::from_timestamp_millis(Utc::now().timestamp_millis())
        .unwrap_or_default()
}

/// The application's chat state: every read and mutation the UI performs
/// goes through here. Holds the database plus a broadcast channel that
/// notifies subscribers after each successful mutation — consumers keep an
/// `Arc<ChatStore>` instead of reaching into ambient globals.
pub struct ChatStore {
    db: Arc<Database>,
    events_tx: broadcast::Sender<ChatEvent>,
}

impl ChatStore {
    pub fn new(db: Database) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            db: Arc::new(db),
            events_tx,
        }
    }

    pub fn open(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(Database::open(&config.db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Subscribe to mutation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events_tx.subscribe()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Run blocking DB work off the async runtime.
    async fn run_db<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        match tokio::task::spawn_blocking(move || f(&db)).await {
            Ok(result) => result,
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                Err(StoreError::Db(anyhow::anyhow!("blocking task failed: {e}")))
            }
        }
    }

    // -- Messages --

    /// Stores a new message. Rejects a payload with neither text nor an
    /// attachment; whitespace-only text counts as empty.
    pub async fn send_message(
        &self,
        chat_id: Uuid,
        text: &str,
        sender_id: Uuid,
        image_uri: Option<&str>,
    ) -> Result<Message> {
        let trimmed = text.trim().to_string();
        if trimmed.is_empty() && image_uri.is_none() {
            return Err(StoreError::Validation(
                "message needs text or an attachment".into(),
            ));
        }

        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            text: (!trimmed.is_empty()).then_some(trimmed),
            timestamp: now(),
            edited_at: None,
            multimedia: image_uri.map(|uri| Multimedia {
                kind: MultimediaKind::Image,
                url: uri.to_string(),
                thumbnail_url: None,
                duration: None,
                size: None,
            }),
            is_read: false,
            read_at: None,
            forwarded_from: None,
            reactions: vec![],
        };

        let row = hydrate::row_from_message(&message);
        self.run_db(move |db| {
            db.insert_message(&row)?;
            Ok(())
        })
        .await?;

        self.emit(ChatEvent::MessageCreated {
            chat_id,
            message: message.clone(),
        });
        Ok(message)
    }

    /// Changes a message's text in place. The id and timestamp never move,
    /// so the message keeps its position in the conversation.
    pub async fn edit_message(&self, message_id: Uuid, new_text: &str) -> Result<()> {
        let id = message_id.to_string();
        let text = new_text.trim().to_string();
        let new_text = text.clone();
        let edited_at = now();
        let millis = edited_at.timestamp_millis();

        let chat_id = self
            .run_db(move |db| {
                let row = db
                    .get_message(&id)?
                    .ok_or_else(|| StoreError::not_found("message", &id))?;
                if db.is_message_deleted(&id)? {
                    return Err(StoreError::not_found("message", &id));
                }
                db.update_message_text(&id, &text, millis)?;
                Ok(hydrate::parse_id(&row.chat_id, "chat_id"))
            })
            .await?;

        self.emit(ChatEvent::MessageEdited {
            chat_id,
            message_id,
            new_text,
            edited_at,
        });
        Ok(())
    }

    /// Tombstones a message. Idempotent: repeat calls (and calls for ids
    /// that never existed) are no-ops, never errors.
    pub async fn delete_message(&self, message_id: Uuid, chat_id: Uuid, user_id: Uuid) -> Result<()> {
        let tombstone_id = Uuid::new_v4().to_string();
        let mid = message_id.to_string();
        let uid = user_id.to_string();
        let cid = chat_id.to_string();
        let deleted_at = now().timestamp_millis();

        let inserted = self
            .run_db(move |db| {
                if db.get_message(&mid)?.is_none() {
                    return Ok(false);
                }
                Ok(db.insert_tombstone(&tombstone_id, &mid, &uid, &cid, deleted_at)?)
            })
            .await?;

        if inserted {
            self.emit(ChatEvent::MessageDeleted { chat_id, message_id });
        }
        Ok(())
    }

    /// Unconditional insert; replace semantics live in the caller
    /// (remove the user's previous reaction first). A racing double-add
    /// trips the store's uniqueness constraint instead of leaving two rows.
    pub async fn add_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Reaction> {
        let reaction = Reaction {
            id: Uuid::new_v4(),
            message_id,
            user_id,
            emoji: emoji.to_string(),
            created_at: now(),
        };

        let row = hydrate::row_from_reaction(&reaction);
        self.run_db(move |db| {
            db.insert_reaction(&row)?;
            Ok(())
        })
        .await?;

        self.emit(ChatEvent::ReactionAdded {
            message_id,
            reaction: reaction.clone(),
        });
        Ok(reaction)
    }

    pub async fn remove_reaction(&self, reaction_id: Uuid, message_id: Uuid) -> Result<()> {
        let id = reaction_id.to_string();
        let removed = self.run_db(move |db| Ok(db.delete_reaction(&id)?)).await?;

        if removed == 0 {
            return Err(StoreError::not_found("reaction", reaction_id));
        }

        self.emit(ChatEvent::ReactionRemoved {
            message_id,
            reaction_id,
        });
        Ok(())
    }

    /// Copies a message into another chat with a fresh identity and
    /// timestamp, back-referencing the source for display attribution.
    pub async fn forward_message(
        &self,
        message_id: Uuid,
        target_chat_id: Uuid,
        forwarder_id: Uuid,
    ) -> Result<Message> {
        let source_id = message_id.to_string();
        let forwarded_at = now();

        let forwarded = self
            .run_db(move |db| {
                let source = db
                    .get_message(&source_id)?
                    .ok_or_else(|| StoreError::not_found("message", &source_id))?;

                let row = MessageRow {
                    id: Uuid::new_v4().to_string(),
                    chat_id: target_chat_id.to_string(),
                    sender_id: forwarder_id.to_string(),
                    text: source.text.clone(),
                    timestamp: forwarded_at.timestamp_millis(),
                    edited_at: None,
                    has_multimedia: source.multimedia_url.is_some(),
                    multimedia_type: source.multimedia_type.clone(),
                    multimedia_url: source.multimedia_url.clone(),
                    thumbnail_url: source.thumbnail_url.clone(),
                    duration: source.duration,
                    size: source.size,
                    is_read: false,
                    read_at: None,
                    forwarded_from: Some(source.id.clone()),
                };
                db.insert_message(&row)?;
                Ok(hydrate::message_from_row(row, vec![]))
            })
            .await?;

        self.emit(ChatEvent::MessageCreated {
            chat_id: target_chat_id,
            message: forwarded.clone(),
        });
        Ok(forwarded)
    }

    /// Marks every unread message in the chat not sent by `user_id` as read.
    pub async fn mark_messages_as_read(&self, chat_id: Uuid, user_id: Uuid) -> Result<()> {
        let cid = chat_id.to_string();
        let uid = user_id.to_string();
        let read_at = now().timestamp_millis();

        let count = self
            .run_db(move |db| Ok(db.mark_messages_read(&cid, &uid, read_at)?))
            .await?;

        if count > 0 {
            self.emit(ChatEvent::MessagesRead {
                chat_id,
                user_id,
                count,
            });
        }
        Ok(())
    }

    // -- Chats --

    pub async fn create_chat(&self, participant_ids: &[Uuid]) -> Result<Chat> {
        if participant_ids.is_empty() {
            return Err(StoreError::Validation("chat needs participants".into()));
        }

        let chat_id = Uuid::new_v4();
        let participants = participant_ids.to_vec();
        let cid = chat_id.to_string();
        let ids: Vec<String> = participants.iter().map(|id| id.to_string()).collect();

        self.run_db(move |db| {
            db.create_chat(&cid, &ids)?;
            Ok(())
        })
        .await?;

        self.emit(ChatEvent::ChatCreated {
            chat_id,
            participants: participants.clone(),
        });
        Ok(Chat {
            id: chat_id,
            participants,
            messages: vec![],
        })
    }

    pub async fn delete_chat(&self, chat_id: Uuid) -> Result<()> {
        let id = chat_id.to_string();
        let removed = self.run_db(move |db| Ok(db.delete_chat(&id)?)).await?;

        if !removed {
            return Err(StoreError::not_found("chat", chat_id));
        }

        self.emit(ChatEvent::ChatDeleted { chat_id });
        Ok(())
    }

    /// Removes the user from the chat's participant set; their past
    /// membership stays on record.
    pub async fn leave_chat(&self, chat_id: Uuid, user_id: Uuid) -> Result<()> {
        let cid = chat_id.to_string();
        let uid = user_id.to_string();
        let left_at = now();
        let millis = left_at.timestamp_millis();

        let removed = self
            .run_db(move |db| Ok(db.remove_participant(&cid, &uid, millis)?))
            .await?;

        if !removed {
            return Err(StoreError::not_found("participant", user_id));
        }

        self.emit(ChatEvent::ParticipantLeft {
            chat_id,
            user_id,
            left_at,
        });
        Ok(())
    }

    /// Deletes every chat the user participates in. Returns how many went.
    pub async fn clear_chats(&self, user_id: Uuid) -> Result<usize> {
        let uid = user_id.to_string();
        let deleted = self
            .run_db(move |db| {
                let chat_ids = db.chat_ids_for_user(&uid)?;
                for chat_id in &chat_ids {
                    db.delete_chat(chat_id)?;
                }
                Ok(chat_ids)
            })
            .await?;

        for chat_id in &deleted {
            self.emit(ChatEvent::ChatDeleted {
                chat_id: hydrate::parse_id(chat_id, "chat id"),
            });
        }
        Ok(deleted.len())
    }

    // -- Reads --

    /// Hydrated snapshot of every chat the user participates in:
    /// participants plus non-tombstoned messages with their reactions
    /// (batch-fetched, no per-message query).
    pub async fn chats_for_user(&self, user_id: Uuid) -> Result<Vec<Chat>> {
        let uid = user_id.to_string();
        self.run_db(move |db| {
            let chat_ids = db.chat_ids_for_user(&uid)?;
            let mut chats = Vec::with_capacity(chat_ids.len());

            for chat_id in chat_ids {
                let participants = db
                    .get_participants(&chat_id)?
                    .iter()
                    .map(|id| hydrate::parse_id(id, "user id"))
                    .collect();
                let messages = hydrate_messages(db, db.get_chat_messages(&chat_id)?)?;
                chats.push(Chat {
                    id: hydrate::parse_id(&chat_id, "chat id"),
                    participants,
                    messages,
                });
            }

            Ok(chats)
        })
        .await
    }

    /// All visible messages in one chat, reactions included. No ordering
    /// promise; display layers sort by timestamp themselves.
    pub async fn messages_for_chat(&self, chat_id: Uuid) -> Result<Vec<Message>> {
        let cid = chat_id.to_string();
        self.run_db(move |db| hydrate_messages(db, db.get_chat_messages(&cid)?))
            .await
    }

    /// Cursor-paged read: up to `limit` messages older than `before`
    /// (or the newest ones when `before` is None), oldest first within
    /// the page.
    pub async fn messages_page(
        &self,
        chat_id: Uuid,
        limit: u32,
        before: Option<chrono::DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        let cid = chat_id.to_string();
        let cursor = before.map(|t| t.timestamp_millis());
        self.run_db(move |db| {
            let mut rows = db.get_messages_page(&cid, limit, cursor)?;
            rows.reverse();
            hydrate_messages(db, rows)
        })
        .await
    }

    // -- Users --

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let id = user_id.to_string();
        self.run_db(move |db| Ok(db.get_user_by_id(&id)?.map(hydrate::user_from_row)))
            .await
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.run_db(|db| {
            Ok(db
                .get_users()?
                .into_iter()
                .map(hydrate::user_from_row)
                .collect())
        })
        .await
    }

    // -- Settings --

    /// Persisted theme preference; defaults to light when unset.
    pub async fn theme(&self) -> Result<ThemeMode> {
        self.run_db(|db| {
            Ok(db
                .get_setting(THEME_KEY)?
                .as_deref()
                .and_then(ThemeMode::parse)
                .unwrap_or_default())
        })
        .await
    }

    pub async fn set_theme(&self, mode: ThemeMode) -> Result<()> {
        self.run_db(move |db| {
            db.set_setting(THEME_KEY, mode.as_str())?;
            Ok(())
        })
        .await
    }
}

fn hydrate_messages(db: &Database, rows: Vec<MessageRow>) -> Result<Vec<Message>> {
    let message_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let reaction_rows = db.get_reactions_for_messages(&message_ids)?;

    let mut reaction_map: HashMap<String, Vec<Reaction>> = HashMap::new();
    for row in reaction_rows {
        reaction_map
            .entry(row.message_id.clone())
            .or_default()
            .push(hydrate::reaction_from_row(row));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let reactions = reaction_map.remove(&row.id).unwrap_or_default();
            hydrate::message_from_row(row, reactions)
        })
        .collect())
}
