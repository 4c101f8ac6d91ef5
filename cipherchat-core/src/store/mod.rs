// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Store + Realtime Channel
//!
//! The remote data store is an external collaborator. Sessions only need:
//!
//! - **insert** a ciphertext record, receiving its id
//! - **query** a conversation's records ordered by timestamp ascending
//! - **subscribe** to every insert for a conversation, including their own
//!
//! Two implementations ship here. [`MemoryMessageStore`] is an in-process
//! store with fault injection for tests. [`SqliteMessageStore`] persists
//! records to a local database. Both fan out inserts through
//! [`SubscriberRegistry`].

mod error;
mod memory;
mod registry;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use error::{PersistenceError, SubscriptionError};
pub use memory::MemoryMessageStore;
pub use registry::SubscriberRegistry;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMessageStore;

use crate::message::{ConversationId, MessageId, MessageRecord, NewMessageRecord, Timestamp};

/// Record persistence.
pub trait MessageStore: Send + Sync {
    /// Persists a record and returns the id the store assigned.
    fn insert(&self, record: NewMessageRecord) -> Result<MessageId, PersistenceError>;

    /// Returns a conversation's records ordered by `created_at` ascending.
    fn query(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<MessageRecord>, PersistenceError>;
}

/// Push delivery of newly inserted records.
pub trait RealtimeChannel: Send + Sync {
    /// Opens a subscription scoped to `conversation_id`.
    ///
    /// The subscription receives every record inserted into that
    /// conversation after this call returns, including the caller's own.
    fn subscribe(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Subscription, SubscriptionError>;
}

/// A store that also offers realtime delivery.
pub trait ChatBackend: MessageStore + RealtimeChannel {}

impl<T: MessageStore + RealtimeChannel> ChatBackend for T {}

type Canceller = Box<dyn FnOnce() + Send>;

/// Cancellable, ordered stream of inserted records for one conversation.
///
/// Cancellation is explicit via [`Subscription::cancel`]; dropping the
/// subscription cancels it too. Once cancelled it yields nothing, not even
/// records that were already buffered.
pub struct Subscription {
    conversation_id: ConversationId,
    receiver: Receiver<MessageRecord>,
    canceller: Option<Canceller>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("conversation_id", &self.conversation_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Subscription {
    /// Creates a subscription. `canceller` detaches it from its source.
    pub fn new(
        conversation_id: ConversationId,
        receiver: Receiver<MessageRecord>,
        canceller: impl FnOnce() + Send + 'static,
    ) -> Self {
        Subscription {
            conversation_id,
            receiver,
            canceller: Some(Box::new(canceller)),
        }
    }

    /// The conversation this subscription is scoped to.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Returns the next buffered record without blocking.
    ///
    /// `Ok(None)` means nothing is pending. `Err(Closed)` means the source
    /// went away and no further records will arrive.
    pub fn try_next(&self) -> Result<Option<MessageRecord>, SubscriptionError> {
        if self.is_cancelled() {
            return Ok(None);
        }
        match self.receiver.try_recv() {
            Ok(record) => Ok(Some(record)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Waits up to `timeout` for the next record.
    pub fn next_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<MessageRecord>, SubscriptionError> {
        if self.is_cancelled() {
            return Ok(None);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(record) => Ok(Some(record)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Detaches from the source. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(canceller) = self.canceller.take() {
            canceller();
        }
    }

    /// Returns true once [`Subscription::cancel`] has run.
    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Rejects records the store would not accept.
pub(crate) fn check_new_record(record: &NewMessageRecord) -> Result<(), PersistenceError> {
    if record.encrypted_content.is_empty() || record.iv.is_empty() {
        return Err(PersistenceError::Rejected(
            "encrypted_content and iv are required".into(),
        ));
    }
    Ok(())
}

/// Current time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

/// Next server timestamp: wall clock, but strictly after `last`.
pub(crate) fn next_timestamp(last: Timestamp) -> Timestamp {
    now_millis().max(last.saturating_add(1))
}
