// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared fixtures for session and store tests. Key derivation runs with a
//! low iteration count so suites stay fast.

#![allow(dead_code)]

pub mod strategies;

use std::sync::{Arc, Mutex};

use cipherchat_core::{
    derive_conversation_key, encrypt, CallbackHandler, ChatConfig, ChatEvent, ConversationId,
    ConversationKey, ConversationSession, EventDispatcher, KdfConfig, KeyProvider,
    MemoryMessageStore, MessageRecord, NewMessageRecord, SessionConfig,
};

/// Iteration count used by every test derivation.
pub const TEST_ITERATIONS: u32 = 1_000;

/// KDF parameters with the production salt and a low iteration count.
pub fn fast_kdf() -> KdfConfig {
    KdfConfig::default().with_iterations(TEST_ITERATIONS)
}

/// Full configuration using [`fast_kdf`].
pub fn fast_config() -> ChatConfig {
    ChatConfig::default().with_kdf(fast_kdf())
}

/// Key the session derives for `conversation_id`.
pub fn key_for(conversation_id: &str) -> ConversationKey {
    derive_conversation_key(conversation_id, &fast_kdf()).unwrap()
}

/// Builds an unopened session over `store`.
pub fn session_with(
    store: &Arc<MemoryMessageStore>,
    conversation_id: &str,
    sender_id: &str,
    config: SessionConfig,
) -> ConversationSession {
    let config_full = fast_config().with_session(config);
    ConversationSession::new(
        conversation_id.into(),
        sender_id.into(),
        store.clone(),
        config_full.key_provider(),
        config_full.session,
    )
}

/// Builds an unopened session with default tuning.
pub fn session(
    store: &Arc<MemoryMessageStore>,
    conversation_id: &str,
    sender_id: &str,
) -> ConversationSession {
    session_with(store, conversation_id, sender_id, SessionConfig::default())
}

/// Builds an unopened session with a custom key provider.
pub fn session_with_keys(
    store: &Arc<MemoryMessageStore>,
    conversation_id: &str,
    keys: Arc<dyn KeyProvider>,
) -> ConversationSession {
    ConversationSession::new(
        conversation_id.into(),
        "alice".into(),
        store.clone(),
        keys,
        SessionConfig::default(),
    )
}

/// Encrypts `text` into a complete record with the given id and timestamp.
pub fn record(
    conversation_id: &str,
    id: &str,
    sender_id: &str,
    text: &str,
    created_at: u64,
) -> MessageRecord {
    let key = key_for(conversation_id);
    let payload = encrypt(&key, text.as_bytes()).unwrap();
    NewMessageRecord::from_payload(
        ConversationId::from(conversation_id),
        sender_id.into(),
        &payload,
    )
    .into_record(id.to_string(), created_at)
}

/// A record whose ciphertext was encrypted under a different key.
pub fn foreign_key_record(conversation_id: &str, id: &str, created_at: u64) -> MessageRecord {
    let wrong_key = ConversationKey::generate().unwrap();
    let payload = encrypt(&wrong_key, b"unreadable").unwrap();
    NewMessageRecord::from_payload(
        ConversationId::from(conversation_id),
        "mallory".into(),
        &payload,
    )
    .into_record(id.to_string(), created_at)
}

/// A record whose stored ciphertext is not valid base64.
pub fn garbled_record(conversation_id: &str, id: &str, created_at: u64) -> MessageRecord {
    let mut record = record(conversation_id, id, "bob", "garbled", created_at);
    record.encrypted_content = "!!not base64!!".to_string();
    record
}

/// Collects every dispatched event.
pub fn recording_dispatcher() -> (Arc<EventDispatcher>, Arc<Mutex<Vec<ChatEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_handler(Arc::new(CallbackHandler::new(move |event| {
        sink.lock().unwrap().push(event);
    })));
    (Arc::new(dispatcher), events)
}

/// Visible texts of a session, in order.
pub fn texts(session: &ConversationSession) -> Vec<String> {
    session.messages().iter().map(|m| m.text().to_string()).collect()
}
