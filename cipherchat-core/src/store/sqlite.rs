// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! SQLite-backed message store.
//!
//! Records are persisted with their base64 ciphertext untouched; this store
//! never sees plaintext. Realtime delivery covers inserts made through the
//! same store instance.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use super::{
    check_new_record, next_timestamp, MessageStore, PersistenceError, RealtimeChannel,
    SubscriberRegistry, Subscription, SubscriptionError,
};
use crate::message::{ConversationId, MessageId, MessageRecord, NewMessageRecord, Timestamp};

/// Schema migrations in version order. Append only.
const MIGRATIONS: &[(u32, &str, &str)] = &[(
    1,
    "create_messages",
    "CREATE TABLE messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        conversation_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        encrypted_content TEXT NOT NULL,
        iv TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX idx_messages_conversation
        ON messages(conversation_id, created_at, seq);",
)];

struct SqliteState {
    conn: Connection,
    last_timestamp: Timestamp,
}

/// Message store persisted in a local SQLite database.
pub struct SqliteMessageStore {
    state: Mutex<SqliteState>,
    registry: Arc<SubscriberRegistry>,
}

impl SqliteMessageStore {
    /// Opens or creates a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Creates an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        run_migrations(&conn)?;
        let last_timestamp: i64 = conn.query_row(
            "SELECT COALESCE(MAX(created_at), 0) FROM messages",
            [],
            |row| row.get(0),
        )?;

        Ok(SqliteMessageStore {
            state: Mutex::new(SqliteState {
                conn,
                last_timestamp: last_timestamp as Timestamp,
            }),
            registry: SubscriberRegistry::new(),
        })
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, PersistenceError> {
        current_version(&self.state.lock().conn)
    }
}

impl MessageStore for SqliteMessageStore {
    fn insert(&self, record: NewMessageRecord) -> Result<MessageId, PersistenceError> {
        check_new_record(&record)?;
        let mut state = self.state.lock();
        let created_at = next_timestamp(state.last_timestamp);
        let record = record.into_record(Uuid::new_v4().to_string(), created_at);

        state.conn.execute(
            "INSERT INTO messages
             (id, conversation_id, sender_id, encrypted_content, iv, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.conversation_id.as_str(),
                record.sender_id,
                record.encrypted_content,
                record.iv,
                record.created_at as i64,
            ],
        )?;
        state.last_timestamp = created_at;

        self.registry.publish(&record);
        Ok(record.id)
    }

    fn query(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<MessageRecord>, PersistenceError> {
        let state = self.state.lock();
        let mut stmt = state.conn.prepare(
            "SELECT id, conversation_id, sender_id, encrypted_content, iv, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY created_at, seq",
        )?;

        let rows = stmt.query_map(params![conversation_id.as_str()], |row| {
            Ok(MessageRecord {
                id: row.get(0)?,
                conversation_id: ConversationId::new(row.get::<_, String>(1)?),
                sender_id: row.get(2)?,
                encrypted_content: row.get(3)?,
                iv: row.get(4)?,
                created_at: row.get::<_, i64>(5)? as Timestamp,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(PersistenceError::Database)
    }
}

impl RealtimeChannel for SqliteMessageStore {
    fn subscribe(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Subscription, SubscriptionError> {
        Ok(self.registry.subscribe(conversation_id))
    }
}

/// Applies pending migrations in one transaction.
fn run_migrations(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let current = current_version(conn)?;
    let pending: Vec<_> = MIGRATIONS.iter().filter(|(v, _, _)| *v > current).collect();
    if pending.is_empty() {
        return Ok(());
    }

    conn.execute_batch("BEGIN EXCLUSIVE TRANSACTION;")?;
    for (version, name, sql) in pending {
        let applied = conn.execute_batch(sql).and_then(|()| {
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![version, super::now_millis() as i64],
            )
        });
        if let Err(e) = applied {
            conn.execute_batch("ROLLBACK;")?;
            return Err(PersistenceError::Migration(format!(
                "Migration v{version} '{name}' failed: {e}"
            )));
        }
        debug!(version, name, "applied migration");
    }
    conn.execute_batch("COMMIT;")?;
    Ok(())
}

fn current_version(conn: &Connection) -> Result<u32, PersistenceError> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}
