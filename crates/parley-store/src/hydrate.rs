//! Row-to-domain conversion. SQLite hands back strings and unix millis;
//! corrupt values degrade to defaults with a warning rather than failing a
//! whole read.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use parley_db::models::{MessageRow, ReactionRow, UserRow};
use parley_types::{Message, Multimedia, MultimediaKind, Reaction, User, UserStatus};

pub(crate) fn parse_id(value: &str, field: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, value, e);
        Uuid::default()
    })
}

pub(crate) fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(|| {
        warn!("Out-of-range timestamp {}", millis);
        DateTime::default()
    })
}

pub(crate) fn user_from_row(row: UserRow) -> User {
    let status = UserStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Corrupt status '{}' on user '{}'", row.status, row.id);
        UserStatus::Offline
    });
    User {
        id: parse_id(&row.id, "user id"),
        name: row.name,
        avatar: row.avatar,
        status,
    }
}

pub(crate) fn reaction_from_row(row: ReactionRow) -> Reaction {
    Reaction {
        id: parse_id(&row.id, "reaction id"),
        message_id: parse_id(&row.message_id, "message_id"),
        user_id: parse_id(&row.user_id, "user_id"),
        emoji: row.emoji,
        created_at: millis_to_utc(row.created_at),
    }
}

pub(crate) fn message_from_row(row: MessageRow, reactions: Vec<Reaction>) -> Message {
    let multimedia = row.multimedia_url.map(|url| Multimedia {
        kind: row
            .multimedia_type
            .as_deref()
            .and_then(MultimediaKind::parse)
            .unwrap_or(MultimediaKind::Image),
        url,
        thumbnail_url: row.thumbnail_url,
        duration: row.duration,
        size: row.size,
    });

    Message {
        id: parse_id(&row.id, "message id"),
        chat_id: parse_id(&row.chat_id, "chat_id"),
        sender_id: parse_id(&row.sender_id, "sender_id"),
        text: row.text,
        timestamp: millis_to_utc(row.timestamp),
        edited_at: row.edited_at.map(millis_to_utc),
        multimedia,
        is_read: row.is_read,
        read_at: row.read_at.map(millis_to_utc),
        forwarded_from: row.forwarded_from.map(|id| parse_id(&id, "forwarded_from")),
        reactions,
    }
}

pub(crate) fn row_from_message(message: &Message) -> MessageRow {
    MessageRow {
        id: message.id.to_string(),
        chat_id: message.chat_id.to_string(),
        sender_id: message.sender_id.to_string(),
        text: message.text.clone(),
        timestamp: message.timestamp.timestamp_millis(),
        edited_at: message.edited_at.map(|t| t.timestamp_millis()),
        has_multimedia: message.multimedia.is_some(),
        multimedia_type: message.multimedia.as_ref().map(|m| m.kind.as_str().to_string()),
        multimedia_url: message.multimedia.as_ref().map(|m| m.url.clone()),
        thumbnail_url: message.multimedia.as_ref().and_then(|m| m.thumbnail_url.clone()),
        duration: message.multimedia.as_ref().and_then(|m| m.duration),
        size: message.multimedia.as_ref().and_then(|m| m.size),
        is_read: message.is_read,
        read_at: message.read_at.map(|t| t.timestamp_millis()),
        forwarded_from: message.forwarded_from.map(|id| id.to_string()),
    }
}

pub(crate) fn row_from_reaction(reaction: &Reaction) -> ReactionRow {
    ReactionRow {
        id: reaction.id.to_string(),
        message_id: reaction.message_id.to_string(),
        user_id: reaction.user_id.to_string(),
        emoji: reaction.emoji.clone(),
        created_at: reaction.created_at.timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multimedia_present_iff_url() {
        let row = MessageRow {
            id: Uuid::new_v4().to_string(),
            chat_id: Uuid::new_v4().to_string(),
            sender_id: Uuid::new_v4().to_string(),
            text: None,
            timestamp: 1_700_000_000_000,
            edited_at: None,
            has_multimedia: true,
            multimedia_type: Some("image".into()),
            multimedia_url: Some("file:///photo.jpg".into()),
            thumbnail_url: None,
            duration: None,
            size: Some(2048),
            is_read: false,
            read_at: None,
            forwarded_from: None,
        };

        let message = message_from_row(row, vec![]);
        let media = message.multimedia.as_ref().expect("descriptor present");
        assert_eq!(media.kind, MultimediaKind::Image);
        assert_eq!(media.url, "file:///photo.jpg");
        assert!(message.has_multimedia());
    }

    #[test]
    fn corrupt_ids_degrade_to_nil() {
        let row = ReactionRow {
            id: "not-a-uuid".into(),
            message_id: Uuid::new_v4().to_string(),
            user_id: Uuid::new_v4().to_string(),
            emoji: "👍".into(),
            created_at: 0,
        };
        let reaction = reaction_from_row(row);
        assert_eq!(reaction.id, Uuid::default());
        assert_eq!(reaction.emoji, "👍");
    }
}
