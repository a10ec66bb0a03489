use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::ReactionRow;

impl Database {
    /// Plain insert. The UNIQUE(message_id, user_id) index rejects a second
    /// reaction from the same user; callers replace by remove-then-add.
    pub fn insert_reaction(&self, reaction: &ReactionRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_reactions (id, message_id, user_id, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    reaction.id,
                    reaction.message_id,
                    reaction.user_id,
                    reaction.emoji,
                    reaction.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Hard delete (reactions are not tombstoned). Returns rows removed.
    pub fn delete_reaction(&self, id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM message_reactions WHERE id = ?1", [id])?;
            Ok(removed)
        })
    }

    pub fn get_reaction(&self, id: &str) -> Result<Option<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message_id, user_id, emoji, created_at
                 FROM message_reactions WHERE id = ?1",
            )?;
            stmt.query_row([id], |row| {
                Ok(ReactionRow {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    user_id: row.get(2)?,
                    emoji: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .optional()
        })
    }

    /// Batch-fetch reactions for a set of message IDs.
    pub fn get_reactions_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, message_id, user_id, emoji, created_at
                 FROM message_reactions WHERE message_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ReactionRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        user_id: row.get(2)?,
                        emoji: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::models::{MessageRow, ReactionRow};
    use parley_types::UserStatus;

    fn reaction(id: &str, message_id: &str, user_id: &str, emoji: &str) -> ReactionRow {
        ReactionRow {
            id: id.into(),
            message_id: message_id.into(),
            user_id: user_id.into(),
            emoji: emoji.into(),
            created_at: 100,
        }
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "Alice", "alice.png", UserStatus::Online)
            .unwrap();
        db.create_user("u2", "Bob", "bob.png", UserStatus::Away)
            .unwrap();
        db.create_chat("c1", &["u1".into(), "u2".into()]).unwrap();
        db.insert_message(&MessageRow {
            id: "m1".into(),
            chat_id: "c1".into(),
            sender_id: "u1".into(),
            text: Some("hi".into()),
            timestamp: 100,
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
        })
        .unwrap();
        db
    }

    #[test]
    fn second_reaction_from_same_user_is_rejected() {
        let db = seeded_db();
        db.insert_reaction(&reaction("r1", "m1", "u2", "👍")).unwrap();
        assert!(db.insert_reaction(&reaction("r2", "m1", "u2", "❤️")).is_err());

        // A different user is fine
        db.insert_reaction(&reaction("r3", "m1", "u1", "❤️")).unwrap();
        assert_eq!(db.get_reactions_for_messages(&["m1".into()]).unwrap().len(), 2);
    }

    #[test]
    fn remove_then_add_replaces() {
        let db = seeded_db();
        db.insert_reaction(&reaction("r1", "m1", "u2", "👍")).unwrap();
        assert_eq!(db.delete_reaction("r1").unwrap(), 1);
        db.insert_reaction(&reaction("r2", "m1", "u2", "👍")).unwrap();

        let rows = db.get_reactions_for_messages(&["m1".into()]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "r2");

        // Deleting an absent row is visible to the caller as zero changes
        assert_eq!(db.delete_reaction("r1").unwrap(), 0);
    }
}
