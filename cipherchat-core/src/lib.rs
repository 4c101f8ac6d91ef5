// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cipherchat Core Library
//!
//! End-to-end encrypted conversation sessions over a remote record store.
//! All cryptographic operations use the audited `ring` crate.

pub mod config;
pub mod crypto;
pub mod message;
pub mod session;
pub mod store;

pub use config::{ChatConfig, SessionConfig};
pub use crypto::{
    decrypt, derive_conversation_key, encrypt, CachingKeyProvider, ConversationKey, DecryptionError,
    EncryptedPayload, EncryptionError, KdfConfig, KeyDerivationError, KeyProvider,
    Pbkdf2KeyProvider,
};
pub use message::{
    ConversationId, DecryptedMessage, MessageBody, MessageId, MessageRecord, NewMessageRecord,
    SenderId, Timestamp, DECRYPTION_FAILED_PLACEHOLDER,
};
pub use session::{
    CallbackHandler, CancelHandle, ChatContext, ChatEvent, ConversationSession, EventDispatcher,
    EventHandler, SessionError, SessionResult, SessionState,
};
#[cfg(feature = "sqlite")]
pub use store::SqliteMessageStore;
pub use store::{
    ChatBackend, MemoryMessageStore, MessageStore, PersistenceError, RealtimeChannel,
    SubscriberRegistry, Subscription, SubscriptionError,
};
