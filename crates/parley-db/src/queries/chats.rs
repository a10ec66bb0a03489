use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use super::OptionalExt;
use crate::Database;
use crate::models::{ParticipantHistoryRow, UserRow};
use parley_types::UserStatus;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, name: &str, avatar: &str, status: UserStatus) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, avatar, status) VALUES (?1, ?2, ?3, ?4)",
                (id, name, avatar, status.as_str()),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, avatar, status FROM users")?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Chats --

    pub fn create_chat(&self, id: &str, participant_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("INSERT INTO chats (id) VALUES (?1)", [id])?;
            for user_id in participant_ids {
                tx.execute(
                    "INSERT INTO chat_participants (id, chat_id, user_id) VALUES (?1, ?2, ?3)",
                    (Uuid::new_v4().to_string(), id, user_id),
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn chat_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM chats WHERE id = ?1", [id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Removes a chat and every dependent row in one transaction.
    /// Returns false when the chat does not exist.
    pub fn delete_chat(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM message_reactions WHERE message_id IN
                     (SELECT id FROM messages WHERE chat_id = ?1)",
                [id],
            )?;
            tx.execute("DELETE FROM deleted_messages WHERE chat_id = ?1", [id])?;
            tx.execute("DELETE FROM messages WHERE chat_id = ?1", [id])?;
            tx.execute("DELETE FROM chat_participants WHERE chat_id = ?1", [id])?;
            tx.execute("DELETE FROM chat_participants_history WHERE chat_id = ?1", [id])?;
            let removed = tx.execute("DELETE FROM chats WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    pub fn chat_ids_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT chat_id FROM chat_participants WHERE user_id = ?1")?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_participants(&self, chat_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id FROM chat_participants WHERE chat_id = ?1")?;
            let rows = stmt
                .query_map([chat_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Drops the participant row and records the departure in the history
    /// table. Returns false when the user was not a participant.
    pub fn remove_participant(&self, chat_id: &str, user_id: &str, left_at: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM chat_participants WHERE chat_id = ?1 AND user_id = ?2",
                (chat_id, user_id),
            )?;
            if removed > 0 {
                tx.execute(
                    "INSERT INTO chat_participants_history (id, chat_id, user_id, left_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    (Uuid::new_v4().to_string(), chat_id, user_id, left_at),
                )?;
            }
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    pub fn get_participant_history(&self, chat_id: &str) -> Result<Vec<ParticipantHistoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, user_id, left_at FROM chat_participants_history
                 WHERE chat_id = ?1 ORDER BY left_at",
            )?;
            let rows = stmt
                .query_map([chat_id], |row| {
                    Ok(ParticipantHistoryRow {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        user_id: row.get(2)?,
                        left_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        avatar: row.get(2)?,
        status: row.get(3)?,
    })
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare("SELECT id, name, avatar, status FROM users WHERE id = ?1")?;
    let row = stmt.query_row([id], map_user_row).optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use parley_types::UserStatus;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, name) in [("u1", "Alice"), ("u2", "Bob"), ("u3", "Carol")] {
            db.create_user(id, name, &format!("{name}.png"), UserStatus::Online)
                .unwrap();
        }
        db
    }

    #[test]
    fn create_and_list_participants() {
        let db = db_with_users();
        db.create_chat("c1", &["u1".into(), "u2".into(), "u3".into()])
            .unwrap();

        assert!(db.chat_exists("c1").unwrap());
        let mut participants = db.get_participants("c1").unwrap();
        participants.sort();
        assert_eq!(participants, vec!["u1", "u2", "u3"]);
        assert_eq!(db.chat_ids_for_user("u2").unwrap(), vec!["c1"]);
    }

    #[test]
    fn leaving_records_history() {
        let db = db_with_users();
        db.create_chat("c1", &["u1".into(), "u2".into()]).unwrap();

        assert!(db.remove_participant("c1", "u2", 500).unwrap());
        assert_eq!(db.get_participants("c1").unwrap(), vec!["u1"]);

        let history = db.get_participant_history("c1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_id, "u2");
        assert_eq!(history[0].left_at, 500);

        // Leaving twice records nothing new
        assert!(!db.remove_participant("c1", "u2", 600).unwrap());
        assert_eq!(db.get_participant_history("c1").unwrap().len(), 1);
    }

    #[test]
    fn delete_chat_cascades() {
        let db = db_with_users();
        db.create_chat("c1", &["u1".into(), "u2".into()]).unwrap();

        assert!(db.delete_chat("c1").unwrap());
        assert!(!db.chat_exists("c1").unwrap());
        assert!(db.get_participants("c1").unwrap().is_empty());
        assert!(!db.delete_chat("c1").unwrap());
    }
}
