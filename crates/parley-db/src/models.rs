/// Database row types — these map directly to SQLite rows.
/// Distinct from the parley-types domain models to keep the DB layer
/// independent; timestamps are unix milliseconds, ids their string form.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub status: String,
}

pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub text: Option<String>,
    pub timestamp: i64,
    pub edited_at: Option<i64>,
    pub has_multimedia: bool,
    pub multimedia_type: Option<String>,
    pub multimedia_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i64>,
    pub size: Option<i64>,
    pub is_read: bool,
    pub read_at: Option<i64>,
    pub forwarded_from: Option<String>,
}

pub struct ReactionRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: i64,
}

pub struct ParticipantHistoryRow {
    pub id: String,
    pub chat_id: String,
    pub user_id: String,
    pub left_at: i64,
}
