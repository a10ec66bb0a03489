use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            avatar      TEXT NOT NULL,
            status      TEXT NOT NULL CHECK (status IN ('online', 'offline', 'away'))
        );

        CREATE TABLE IF NOT EXISTS chats (
            id          TEXT PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS chat_participants (
            id          TEXT PRIMARY KEY,
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            UNIQUE(chat_id, user_id)
        );

        -- Timestamps are unix milliseconds throughout.
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            chat_id         TEXT NOT NULL REFERENCES chats(id),
            sender_id       TEXT NOT NULL REFERENCES users(id),
            text            TEXT,
            timestamp       INTEGER NOT NULL,
            edited_at       INTEGER,
            has_multimedia  INTEGER NOT NULL DEFAULT 0,
            multimedia_type TEXT,
            multimedia_url  TEXT,
            thumbnail_url   TEXT,
            duration        INTEGER,
            size            INTEGER,
            is_read         INTEGER NOT NULL DEFAULT 0,
            read_at         INTEGER,
            forwarded_from  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, timestamp);

        -- Membership history for participants who left a chat.
        CREATE TABLE IF NOT EXISTS chat_participants_history (
            id          TEXT PRIMARY KEY,
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            left_at     INTEGER NOT NULL
        );

        -- Deletion tombstones; message rows are never physically removed.
        -- UNIQUE(message_id) makes repeated deletes a no-op.
        CREATE TABLE IF NOT EXISTS deleted_messages (
            id          TEXT PRIMARY KEY,
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            deleted_at  INTEGER NOT NULL,
            UNIQUE(message_id)
        );

        CREATE TABLE IF NOT EXISTS message_reactions (
            id          TEXT PRIMARY KEY,
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            emoji       TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            UNIQUE(message_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON message_reactions(message_id);

        CREATE TABLE IF NOT EXISTS settings (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
