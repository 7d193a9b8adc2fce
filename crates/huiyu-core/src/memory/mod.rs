//! Per-thread conversation memory
//!
//! Each thread identifier maps to the snapshot of its latest turn. Stores do
//! not coordinate writers; the orchestrator serializes turns per thread.

use crate::db::{Database, StoredConversation};
use crate::error::{HuiyuError, Result};
use crate::graph::TurnState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Latest persisted state of one conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationRecord {
    pub thread_id: String,
    pub snapshot: TurnState,
    pub turn_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// Durable mapping from thread identifier to conversation record
pub trait MemoryStore: Send + Sync {
    fn load(&self, thread_id: &str) -> Result<Option<ConversationRecord>>;

    /// Replace the snapshot for a thread and bump its turn count
    fn save(&self, thread_id: &str, snapshot: &TurnState) -> Result<()>;

    /// Returns true if the thread existed
    fn delete(&self, thread_id: &str) -> Result<bool>;

    /// All records, most recently updated first
    fn list(&self) -> Result<Vec<ConversationRecord>>;
}

fn poisoned<T>(_: T) -> HuiyuError {
    HuiyuError::Memory("Memory store lock poisoned".to_string())
}

/// Process-local store, lost on exit
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, ConversationRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryStore {
    fn load(&self, thread_id: &str) -> Result<Option<ConversationRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(thread_id).cloned())
    }

    fn save(&self, thread_id: &str, snapshot: &TurnState) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        let turn_count = records.get(thread_id).map_or(0, |r| r.turn_count) + 1;
        records.insert(
            thread_id.to_string(),
            ConversationRecord {
                thread_id: thread_id.to_string(),
                snapshot: snapshot.clone(),
                turn_count,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn delete(&self, thread_id: &str) -> Result<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.remove(thread_id).is_some())
    }

    fn list(&self) -> Result<Vec<ConversationRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut list: Vec<_> = records.values().cloned().collect();
        list.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.thread_id.cmp(&b.thread_id))
        });
        Ok(list)
    }
}

/// Store backed by the `conversations` table; snapshots are JSON
pub struct SqliteMemoryStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteMemoryStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn decode(row: StoredConversation) -> Result<ConversationRecord> {
        let snapshot: TurnState = serde_json::from_str(&row.snapshot)?;
        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| HuiyuError::Memory(format!("Bad timestamp for {}: {}", row.thread_id, e)))?;
        Ok(ConversationRecord {
            thread_id: row.thread_id,
            snapshot,
            turn_count: row.turn_count,
            updated_at,
        })
    }
}

impl MemoryStore for SqliteMemoryStore {
    fn load(&self, thread_id: &str) -> Result<Option<ConversationRecord>> {
        let row = self.db.lock().map_err(poisoned)?.get_conversation(thread_id)?;
        row.map(Self::decode).transpose()
    }

    fn save(&self, thread_id: &str, snapshot: &TurnState) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.db
            .lock()
            .map_err(poisoned)?
            .upsert_conversation(thread_id, &json)
    }

    fn delete(&self, thread_id: &str) -> Result<bool> {
        self.db.lock().map_err(poisoned)?.delete_conversation(thread_id)
    }

    fn list(&self) -> Result<Vec<ConversationRecord>> {
        let rows = self.db.lock().map_err(poisoned)?.list_conversations()?;
        rows.into_iter().map(Self::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Utterance;

    fn turn(query: &str, answer: &str) -> TurnState {
        let mut state = TurnState::new_turn(query, vec![]);
        state.chat_history = vec![Utterance::user(query), Utterance::assistant(answer)];
        state.final_answer = Some(answer.to_string());
        state
    }

    fn exercise(store: &dyn MemoryStore) {
        assert!(store.load("u1").unwrap().is_none());

        store.save("u1", &turn("问", "答")).unwrap();
        store.save("u2", &turn("别的", "另答")).unwrap();
        store.save("u1", &turn("再问", "再答")).unwrap();

        let u1 = store.load("u1").unwrap().unwrap();
        assert_eq!(u1.turn_count, 2);
        assert_eq!(u1.snapshot.query, "再问");
        assert_eq!(u1.snapshot.chat_history.len(), 2);

        let u2 = store.load("u2").unwrap().unwrap();
        assert_eq!(u2.turn_count, 1);
        assert_eq!(u2.snapshot.chat_history[0].content, "别的");

        assert_eq!(store.list().unwrap().len(), 2);
        assert!(store.delete("u1").unwrap());
        assert!(!store.delete("u1").unwrap());
        assert!(store.load("u1").unwrap().is_none());
        assert!(store.load("u2").unwrap().is_some());
    }

    #[test]
    fn test_in_memory_store() {
        exercise(&InMemoryStore::new());
    }

    #[test]
    fn test_sqlite_store() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        exercise(&SqliteMemoryStore::new(Arc::new(Mutex::new(db))));
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("huiyu.sqlite");

        {
            let db = Database::open(&path).unwrap();
            db.initialize().unwrap();
            let store = SqliteMemoryStore::new(Arc::new(Mutex::new(db)));
            store.save("u1", &turn("问", "答")).unwrap();
        }

        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        let store = SqliteMemoryStore::new(Arc::new(Mutex::new(db)));
        let record = store.load("u1").unwrap().unwrap();
        assert_eq!(record.snapshot.final_answer.as_deref(), Some("答"));
    }
}
