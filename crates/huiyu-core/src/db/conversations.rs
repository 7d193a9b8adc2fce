//! Conversation records for multi-turn dialogue

use super::Database;
use crate::error::Result;
use chrono::Utc;
use rusqlite::params;

/// Row of the `conversations` table; the snapshot is opaque JSON at this layer
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredConversation {
    pub thread_id: String,
    pub snapshot: String,
    pub turn_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl Database {
    pub fn get_conversation(&self, thread_id: &str) -> Result<Option<StoredConversation>> {
        let result = self.conn.query_row(
            "SELECT thread_id, snapshot, turn_count, created_at, updated_at
             FROM conversations WHERE thread_id = ?1",
            params![thread_id],
            |row| {
                Ok(StoredConversation {
                    thread_id: row.get(0)?,
                    snapshot: row.get(1)?,
                    turn_count: row.get::<_, i64>(2)? as u64,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        );
        match result {
            Ok(conv) => Ok(Some(conv)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or replace the snapshot for a thread, bumping its turn count
    pub fn upsert_conversation(&self, thread_id: &str, snapshot: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO conversations (thread_id, snapshot, turn_count, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)
             ON CONFLICT(thread_id) DO UPDATE SET
                snapshot = excluded.snapshot,
                turn_count = conversations.turn_count + 1,
                updated_at = excluded.updated_at",
            params![thread_id, snapshot, now],
        )?;
        Ok(())
    }

    /// Returns true if a record was removed
    pub fn delete_conversation(&self, thread_id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM conversations WHERE thread_id = ?1",
            params![thread_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_conversations(&self) -> Result<Vec<StoredConversation>> {
        let mut stmt = self.conn.prepare(
            "SELECT thread_id, snapshot, turn_count, created_at, updated_at
             FROM conversations ORDER BY updated_at DESC, thread_id",
        )?;

        let results = stmt
            .query_map([], |row| {
                Ok(StoredConversation {
                    thread_id: row.get(0)?,
                    snapshot: row.get(1)?,
                    turn_count: row.get::<_, i64>(2)? as u64,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }
}
