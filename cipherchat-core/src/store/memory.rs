// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory store and realtime channel.
//!
//! Behaves like the remote data store: ids and timestamps are assigned on
//! insert and every insert is pushed to all subscribers of the conversation,
//! the inserter included. Fault injection hooks let tests drive the failure
//! paths of a session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    check_new_record, next_timestamp, MessageStore, PersistenceError, RealtimeChannel,
    SubscriberRegistry, Subscription, SubscriptionError,
};
use crate::message::{ConversationId, MessageId, MessageRecord, NewMessageRecord, Timestamp};

#[derive(Default)]
struct MemoryState {
    records: Vec<MessageRecord>,
    last_timestamp: Timestamp,
}

/// In-process message store with push delivery.
pub struct MemoryMessageStore {
    state: Mutex<MemoryState>,
    registry: Arc<SubscriberRegistry>,
    fail_inserts: AtomicBool,
    fail_queries: AtomicBool,
    fail_subscribes: AtomicBool,
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        MemoryMessageStore::new()
    }
}

impl MemoryMessageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryMessageStore {
            state: Mutex::new(MemoryState::default()),
            registry: SubscriberRegistry::new(),
            fail_inserts: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            fail_subscribes: AtomicBool::new(false),
        }
    }

    /// Makes subsequent inserts fail (or succeed again).
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent queries fail (or succeed again).
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent subscribe calls fail (or succeed again).
    pub fn set_fail_subscribes(&self, fail: bool) {
        self.fail_subscribes.store(fail, Ordering::SeqCst);
    }

    /// Severs every subscription to `conversation_id`, as a dropped
    /// realtime connection would.
    pub fn drop_subscribers(&self, conversation_id: &ConversationId) -> usize {
        self.registry.disconnect(conversation_id)
    }

    /// Pushes `record` to the subscribers of `conversation_id` without
    /// storing it. Simulates reordered, duplicated, or misrouted delivery.
    pub fn publish_raw(&self, conversation_id: &ConversationId, record: &MessageRecord) -> usize {
        self.registry.publish_to(conversation_id, record)
    }

    /// Stores a prebuilt record as-is, without notifying subscribers.
    pub fn import(&self, record: MessageRecord) {
        let mut state = self.state.lock();
        state.last_timestamp = state.last_timestamp.max(record.created_at);
        state.records.push(record);
    }

    /// Returns a stored record by id.
    pub fn get(&self, id: &str) -> Option<MessageRecord> {
        self.state
            .lock()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Number of records stored for `conversation_id`.
    pub fn count(&self, conversation_id: &ConversationId) -> usize {
        self.state
            .lock()
            .records
            .iter()
            .filter(|record| &record.conversation_id == conversation_id)
            .count()
    }

    /// Number of live subscribers for `conversation_id`.
    pub fn subscriber_count(&self, conversation_id: &ConversationId) -> usize {
        self.registry.subscriber_count(conversation_id)
    }
}

impl MessageStore for MemoryMessageStore {
    fn insert(&self, record: NewMessageRecord) -> Result<MessageId, PersistenceError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "insert rejected by fault injection".into(),
            ));
        }
        check_new_record(&record)?;

        let mut state = self.state.lock();
        let created_at = next_timestamp(state.last_timestamp);
        state.last_timestamp = created_at;

        let record = record.into_record(Uuid::new_v4().to_string(), created_at);
        let id = record.id.clone();
        state.records.push(record.clone());

        // Publish under the lock so subscribers see inserts in timestamp order
        self.registry.publish(&record);
        Ok(id)
    }

    fn query(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<MessageRecord>, PersistenceError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "query rejected by fault injection".into(),
            ));
        }

        let mut records: Vec<MessageRecord> = self
            .state
            .lock()
            .records
            .iter()
            .filter(|record| &record.conversation_id == conversation_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }
}

impl RealtimeChannel for MemoryMessageStore {
    fn subscribe(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Subscription, SubscriptionError> {
        if self.fail_subscribes.load(Ordering::SeqCst) {
            return Err(SubscriptionError::Rejected(
                "subscribe rejected by fault injection".into(),
            ));
        }
        Ok(self.registry.subscribe(conversation_id))
    }
}
