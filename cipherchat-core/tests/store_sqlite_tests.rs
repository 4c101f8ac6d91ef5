// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! SQLite Store Tests

#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use cipherchat_core::{
    ConversationId, ConversationSession, MessageStore, NewMessageRecord, RealtimeChannel,
    SessionConfig, SqliteMessageStore,
};
use common::{fast_config, key_for};
use tempfile::TempDir;

fn encrypted_record(conversation_id: &str, sender_id: &str, text: &str) -> NewMessageRecord {
    let payload = cipherchat_core::encrypt(&key_for(conversation_id), text.as_bytes()).unwrap();
    NewMessageRecord::from_payload(conversation_id.into(), sender_id.into(), &payload)
}

#[test]
fn test_schema_is_migrated() {
    let store = SqliteMessageStore::in_memory().unwrap();
    assert_eq!(store.schema_version().unwrap(), 1);
}

#[test]
fn test_insert_and_query_in_order() {
    let store = SqliteMessageStore::in_memory().unwrap();
    let first = store.insert(encrypted_record("conv-1", "alice", "one")).unwrap();
    let second = store.insert(encrypted_record("conv-1", "bob", "two")).unwrap();
    store.insert(encrypted_record("conv-2", "bob", "elsewhere")).unwrap();

    let records = store.query(&"conv-1".into()).unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(records[0].created_at < records[1].created_at);
    assert_eq!(records[1].sender_id, "bob");
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("messages.db");

    let (id, created_at) = {
        let store = SqliteMessageStore::open(&path).unwrap();
        let id = store.insert(encrypted_record("conv-1", "alice", "persisted")).unwrap();
        let created_at = store.query(&"conv-1".into()).unwrap()[0].created_at;
        (id, created_at)
    };

    let store = SqliteMessageStore::open(&path).unwrap();
    assert_eq!(store.schema_version().unwrap(), 1);
    let records = store.query(&"conv-1".into()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);

    // Timestamps keep increasing across reopen
    store.insert(encrypted_record("conv-1", "alice", "later")).unwrap();
    let records = store.query(&"conv-1".into()).unwrap();
    assert!(records[1].created_at > created_at);
}

#[test]
fn test_insert_is_pushed_to_subscribers() {
    let store = SqliteMessageStore::in_memory().unwrap();
    let conv = ConversationId::from("conv-1");
    let subscription = store.subscribe(&conv).unwrap();

    let id = store.insert(encrypted_record("conv-1", "alice", "push")).unwrap();
    assert_eq!(subscription.try_next().unwrap().unwrap().id, id);
}

#[test]
fn test_session_over_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("messages.db");
    let config = fast_config();

    {
        let store = Arc::new(SqliteMessageStore::open(&path).unwrap());
        let mut session = ConversationSession::new(
            "conv-1".into(),
            "alice".into(),
            store,
            config.key_provider(),
            SessionConfig::default(),
        );
        session.open().unwrap();
        session.send("stored hello").unwrap();
        assert_eq!(session.pump().unwrap(), 1);
    }

    let store = Arc::new(SqliteMessageStore::open(&path).unwrap());
    let mut session = ConversationSession::new(
        "conv-1".into(),
        "bob".into(),
        store,
        config.key_provider(),
        SessionConfig::default(),
    );
    session.open().unwrap();
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].text(), "stored hello");
    assert!(session.messages()[0].is_from("alice"));
}
