use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
    Away,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Away => "away",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            "away" => Some(Self::Away),
            _ => None,
        }
    }
}

/// Users are created by the registration flow and read-only to this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub status: UserStatus,
}

/// A chat room: a set of current participants plus its visible message
/// history. Former participants are tracked separately in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub participants: Vec<Uuid>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultimediaKind {
    Image,
    Video,
    Audio,
}

impl MultimediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// Attachment descriptor. A message has multimedia iff it carries one of
/// these, so the fields stay mutually consistent by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multimedia {
    pub kind: MultimediaKind,
    pub url: String,
    pub thumbnail_url: Option<String>,
    /// Playback length in seconds, for audio/video.
    pub duration: Option<i64>,
    /// Payload size in bytes.
    pub size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// A message as consumed by the UI layer: the stored row hydrated with its
/// reactions. Identity never changes; edits touch text/edited_at only, and
/// deletion tombstones the row instead of removing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub text: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub multimedia: Option<Multimedia>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    /// Weak back-reference to the origin message when forwarded, for display
    /// attribution only.
    pub forwarded_from: Option<Uuid>,
    pub reactions: Vec<Reaction>,
}

impl Message {
    pub fn has_multimedia(&self) -> bool {
        self.multimedia.is_some()
    }

    /// The given user's reaction on this message, if any.
    pub fn reaction_by(&self, user_id: Uuid) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.user_id == user_id)
    }

    pub fn has_reaction_by(&self, user_id: Uuid) -> bool {
        self.reaction_by(user_id).is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_reactions(reactions: Vec<Reaction>) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            text: Some("hello".into()),
            timestamp: Utc::now(),
            edited_at: None,
            multimedia: None,
            is_read: false,
            read_at: None,
            forwarded_from: None,
            reactions,
        }
    }

    #[test]
    fn reaction_lookup_by_user() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let message_id = Uuid::new_v4();

        let message = message_with_reactions(vec![Reaction {
            id: Uuid::new_v4(),
            message_id,
            user_id: alice,
            emoji: "👍".into(),
            created_at: Utc::now(),
        }]);

        assert!(message.has_reaction_by(alice));
        assert_eq!(message.reaction_by(alice).unwrap().emoji, "👍");
        assert!(!message.has_reaction_by(bob));
    }

    #[test]
    fn theme_round_trips_through_str() {
        assert_eq!(ThemeMode::parse("dark"), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::parse("light"), Some(ThemeMode::Light));
        assert_eq!(ThemeMode::parse("solarized"), None);
        assert_eq!(ThemeMode::Dark.toggled(), ThemeMode::Light);
        assert_eq!(ThemeMode::default(), ThemeMode::Light);
    }
}
