use anyhow::Result;
use rusqlite::Connection;

use super::OptionalExt;
use crate::Database;
use crate::models::MessageRow;

const MESSAGE_COLUMNS: &str = "id, chat_id, sender_id, text, timestamp, edited_at, \
     has_multimedia, multimedia_type, multimedia_url, thumbnail_url, duration, size, \
     is_read, read_at, forwarded_from";

fn map_message_row(row: &rusqlite::Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        sender_id: row.get(2)?,
        text: row.get(3)?,
        timestamp: row.get(4)?,
        edited_at: row.get(5)?,
        has_multimedia: row.get(6)?,
        multimedia_type: row.get(7)?,
        multimedia_url: row.get(8)?,
        thumbnail_url: row.get(9)?,
        duration: row.get(10)?,
        size: row.get(11)?,
        is_read: row.get(12)?,
        read_at: row.get(13)?,
        forwarded_from: row.get(14)?,
    })
}

impl Database {
    pub fn insert_message(&self, msg: &MessageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, chat_id, sender_id, text, timestamp, edited_at,
                     has_multimedia, multimedia_type, multimedia_url, thumbnail_url, duration, size,
                     is_read, read_at, forwarded_from)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                rusqlite::params![
                    msg.id,
                    msg.chat_id,
                    msg.sender_id,
                    msg.text,
                    msg.timestamp,
                    msg.edited_at,
                    msg.has_multimedia,
                    msg.multimedia_type,
                    msg.multimedia_url,
                    msg.thumbnail_url,
                    msg.duration,
                    msg.size,
                    msg.is_read,
                    msg.read_at,
                    msg.forwarded_from,
                ],
            )?;
            Ok(())
        })
    }

    /// Raw lookup by id. Returns the row even when tombstoned so callers can
    /// tell "missing" apart from "deleted".
    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row([id], map_message_row).optional()
        })
    }

    /// Returns the number of rows changed (0 when the id does not exist).
    pub fn update_message_text(&self, id: &str, text: &str, edited_at: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET text = ?2, edited_at = ?3 WHERE id = ?1",
                rusqlite::params![id, text, edited_at],
            )?;
            Ok(changed)
        })
    }

    /// Inserts a deletion tombstone. Returns false when one already exists
    /// for the message, which makes repeated deletes a no-op.
    pub fn insert_tombstone(
        &self,
        id: &str,
        message_id: &str,
        user_id: &str,
        chat_id: &str,
        deleted_at: i64,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO deleted_messages (id, message_id, user_id, chat_id, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, message_id, user_id, chat_id, deleted_at],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn is_message_deleted(&self, message_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM deleted_messages WHERE message_id = ?1",
                [message_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn tombstone_count(&self, message_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM deleted_messages WHERE message_id = ?1",
                [message_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// All non-tombstoned messages in a chat. Return order is an SQLite
    /// detail; display layers re-sort by timestamp themselves.
    pub fn get_chat_messages(&self, chat_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_chat_messages(conn, chat_id))
    }

    /// Cursor-paged read: the newest `limit` non-tombstoned messages older
    /// than `before` (unix millis), newest first.
    pub fn get_messages_page(
        &self,
        chat_id: &str,
        limit: u32,
        before: Option<i64>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 WHERE m.chat_id = ?1
                   AND (?3 IS NULL OR m.timestamp < ?3)
                   AND NOT EXISTS (SELECT 1 FROM deleted_messages d WHERE d.message_id = m.id)
                 ORDER BY m.timestamp DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![chat_id, limit, before], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks every unread message in the chat not sent by `user_id` as read.
    /// Returns how many rows changed.
    pub fn mark_messages_read(&self, chat_id: &str, user_id: &str, read_at: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1, read_at = ?3
                 WHERE chat_id = ?1 AND sender_id != ?2 AND is_read = 0",
                rusqlite::params![chat_id, user_id, read_at],
            )?;
            Ok(changed)
        })
    }
}

fn query_chat_messages(conn: &Connection, chat_id: &str) -> Result<Vec<MessageRow>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m
         WHERE m.chat_id = ?1
           AND NOT EXISTS (SELECT 1 FROM deleted_messages d WHERE d.message_id = m.id)
         ORDER BY m.timestamp"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([chat_id], map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::models::MessageRow;
    use parley_types::UserStatus;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "Alice", "alice.png", UserStatus::Online)
            .unwrap();
        db.create_user("u2", "Bob", "bob.png", UserStatus::Offline)
            .unwrap();
        db.create_chat("c1", &["u1".into(), "u2".into()]).unwrap();
        db
    }

    fn text_message(id: &str, chat_id: &str, sender_id: &str, text: &str, ts: i64) -> MessageRow {
        MessageRow {
            id: id.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            text: Some(text.into()),
            timestamp: ts,
            edited_at: None,
            has_multimedia: false,
            multimedia_type: None,
            multimedia_url: None,
            thumbnail_url: None,
            duration: None,
            size: None,
            is_read: false,
            read_at: None,
            forwarded_from: None,
        }
    }

    #[test]
    fn tombstone_insert_is_idempotent() {
        let db = seeded_db();
        db.insert_message(&text_message("m1", "c1", "u1", "hi", 100))
            .unwrap();

        assert!(db.insert_tombstone("t1", "m1", "u1", "c1", 200).unwrap());
        assert!(!db.insert_tombstone("t2", "m1", "u1", "c1", 300).unwrap());
        assert_eq!(db.tombstone_count("m1").unwrap(), 1);
        assert!(db.is_message_deleted("m1").unwrap());

        // The row itself survives for auditability
        assert!(db.get_message("m1").unwrap().is_some());
        // but hydrated reads skip it
        assert!(db.get_chat_messages("c1").unwrap().is_empty());
    }

    #[test]
    fn edit_changes_text_only() {
        let db = seeded_db();
        db.insert_message(&text_message("m1", "c1", "u1", "draft", 100))
            .unwrap();

        assert_eq!(db.update_message_text("m1", "final", 500).unwrap(), 1);
        let row = db.get_message("m1").unwrap().unwrap();
        assert_eq!(row.text.as_deref(), Some("final"));
        assert_eq!(row.edited_at, Some(500));
        assert_eq!(row.timestamp, 100);

        assert_eq!(db.update_message_text("missing", "x", 600).unwrap(), 0);
    }

    #[test]
    fn page_respects_cursor_and_limit() {
        let db = seeded_db();
        for i in 0..5 {
            db.insert_message(&text_message(
                &format!("m{i}"),
                "c1",
                "u1",
                &format!("msg {i}"),
                100 + i,
            ))
            .unwrap();
        }

        let page = db.get_messages_page("c1", 2, None).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "m4");
        assert_eq!(page[1].id, "m3");

        let older = db.get_messages_page("c1", 10, Some(103)).unwrap();
        let ids: Vec<&str> = older.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1", "m0"]);
    }

    #[test]
    fn mark_read_skips_own_messages() {
        let db = seeded_db();
        db.insert_message(&text_message("m1", "c1", "u1", "from alice", 100))
            .unwrap();
        db.insert_message(&text_message("m2", "c1", "u2", "from bob", 101))
            .unwrap();

        // Alice opens the chat: only Bob's message flips
        assert_eq!(db.mark_messages_read("c1", "u1", 500).unwrap(), 1);
        let m2 = db.get_message("m2").unwrap().unwrap();
        assert!(m2.is_read);
        assert_eq!(m2.read_at, Some(500));
        let m1 = db.get_message("m1").unwrap().unwrap();
        assert!(!m1.is_read);

        // Second pass finds nothing unread
        assert_eq!(db.mark_messages_read("c1", "u1", 600).unwrap(), 0);
    }
}
