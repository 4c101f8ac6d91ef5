// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Types
//!
//! Stored ciphertext records and their decrypted, in-memory view.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{DecryptionError, EncryptedPayload};

/// Unique record identifier assigned by the store.
pub type MessageId = String;

/// Identifier of the participant who sent a message.
pub type SenderId = String;

/// Milliseconds since the Unix epoch, assigned by the store.
pub type Timestamp = u64;

/// Text shown in place of a message that could not be decrypted.
pub const DECRYPTION_FAILED_PLACEHOLDER: &str = "[Decryption failed]";

/// Stable identifier grouping every message of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Wraps an identifier. Validation happens at key derivation.
    pub fn new(id: impl Into<String>) -> Self {
        ConversationId(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        ConversationId::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        ConversationId(id)
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A persisted message as it appears on the wire and in storage.
///
/// `encrypted_content` and `iv` are opaque base64 text. On the wire
/// `created_at` is an RFC 3339 timestamp; integer milliseconds are accepted
/// when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub encrypted_content: String,
    pub iv: String,
    #[serde(with = "wire_timestamp")]
    pub created_at: Timestamp,
}

impl MessageRecord {
    /// Decodes the base64 ciphertext and nonce.
    pub fn payload(&self) -> Result<EncryptedPayload, DecryptionError> {
        EncryptedPayload::from_base64(&self.encrypted_content, &self.iv)
    }

    /// Serializes the record to its JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a record from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A record to be inserted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessageRecord {
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub encrypted_content: String,
    pub iv: String,
}

impl NewMessageRecord {
    /// Builds an insert from an encrypted payload.
    pub fn from_payload(
        conversation_id: ConversationId,
        sender_id: SenderId,
        payload: &EncryptedPayload,
    ) -> Self {
        NewMessageRecord {
            conversation_id,
            sender_id,
            encrypted_content: payload.ciphertext_base64(),
            iv: payload.nonce_base64(),
        }
    }

    /// Completes the record with store-assigned fields.
    pub fn into_record(self, id: MessageId, created_at: Timestamp) -> MessageRecord {
        MessageRecord {
            id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            encrypted_content: self.encrypted_content,
            iv: self.iv,
            created_at,
        }
    }
}

/// Decrypted content of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Plaintext(String),
    DecryptionFailed,
}

/// In-memory view of a message after decryption. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub created_at: Timestamp,
    pub body: MessageBody,
}

impl DecryptedMessage {
    /// Builds the view from a record and its decryption outcome.
    pub fn from_record(record: &MessageRecord, body: MessageBody) -> Self {
        DecryptedMessage {
            id: record.id.clone(),
            conversation_id: record.conversation_id.clone(),
            sender_id: record.sender_id.clone(),
            created_at: record.created_at,
            body,
        }
    }

    /// Text to display: the plaintext or the failure placeholder.
    pub fn text(&self) -> &str {
        match &self.body {
            MessageBody::Plaintext(text) => text,
            MessageBody::DecryptionFailed => DECRYPTION_FAILED_PLACEHOLDER,
        }
    }

    /// Returns true if decryption failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.body, MessageBody::DecryptionFailed)
    }

    /// Returns true if `sender_id` sent this message.
    pub fn is_from(&self, sender_id: &str) -> bool {
        self.sender_id == sender_id
    }
}

/// `created_at` as the data store writes it: `2024-05-01T12:00:00.123+00:00`.
mod wire_timestamp {
    use chrono::{DateTime, SecondsFormat};
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireValue {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        timestamp: &Timestamp,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let millis = i64::try_from(*timestamp).map_err(S::Error::custom)?;
        let time = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| S::Error::custom("timestamp out of range"))?;
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        match WireValue::deserialize(deserializer)? {
            WireValue::Millis(millis) => Ok(millis),
            WireValue::Text(text) => {
                let time = DateTime::parse_from_rfc3339(&text).map_err(D::Error::custom)?;
                Timestamp::try_from(time.timestamp_millis())
                    .map_err(|_| D::Error::custom("timestamp before the Unix epoch"))
            }
        }
    }
}
