// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversation Session
//!
//! Drives one open conversation from key acquisition to live delivery:
//!
//! ```text
//! Uninitialized -> KeyReady -> Loading -> Live
//!        \______________\__________\_______\___> Closed
//! ```
//!
//! - **KeyReady**: the conversation key was acquired once and is cached for
//!   the session's lifetime.
//! - **Loading**: history is queried in timestamp order and decrypted. A
//!   record that fails to decrypt becomes a placeholder in place.
//! - **Live**: the session is subscribed; pushed inserts are decrypted and
//!   merged into the visible sequence by timestamp.
//! - **Closed**: the subscription is cancelled and the key released.
//!
//! Sending never appends locally. The sender's own insert comes back through
//! the subscription like any other, so the channel is the only source of
//! visible messages.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cipherchat_core::{ChatConfig, ConversationSession, MemoryMessageStore};
//!
//! let config = ChatConfig::default();
//! let store = Arc::new(MemoryMessageStore::new());
//! let mut session = ConversationSession::new(
//!     "conv-1".into(),
//!     "alice".into(),
//!     store,
//!     config.key_provider(),
//!     config.session.clone(),
//! );
//! session.open()?;
//! session.send("hello")?;
//! session.pump()?;
//! assert_eq!(session.messages()[0].text(), "hello");
//! ```

mod context;
mod error;
mod events;
mod timeline;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use zeroize::Zeroize;

pub use context::ChatContext;
pub use error::{SessionError, SessionResult};
pub use events::{CallbackHandler, ChatEvent, EventDispatcher, EventHandler};

use crate::config::SessionConfig;
use crate::crypto::{codec, ConversationKey, KeyProvider};
use crate::message::{
    ConversationId, DecryptedMessage, MessageBody, MessageId, MessageRecord, NewMessageRecord,
    SenderId,
};
use crate::store::{ChatBackend, Subscription, SubscriptionError};
use timeline::Timeline;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no key yet.
    Uninitialized,
    /// Key acquired; history not loaded.
    KeyReady,
    /// History is being loaded.
    Loading,
    /// Subscribed and receiving live inserts.
    Live,
    /// Terminal. Subscription cancelled and key released.
    Closed,
}

/// Cancels a session's pending load from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One open conversation.
pub struct ConversationSession {
    conversation_id: ConversationId,
    sender_id: SenderId,
    backend: Arc<dyn ChatBackend>,
    keys: Arc<dyn KeyProvider>,
    config: SessionConfig,
    events: Arc<EventDispatcher>,
    state: SessionState,
    key: Option<Arc<ConversationKey>>,
    subscription: Option<Subscription>,
    timeline: Timeline,
    live_gap: bool,
    gap_reported: bool,
    cancel: CancelHandle,
}

impl ConversationSession {
    /// Creates a session in the `Uninitialized` state.
    pub fn new(
        conversation_id: ConversationId,
        sender_id: SenderId,
        backend: Arc<dyn ChatBackend>,
        keys: Arc<dyn KeyProvider>,
        config: SessionConfig,
    ) -> Self {
        ConversationSession {
            conversation_id,
            sender_id,
            backend,
            keys,
            config,
            events: Arc::new(EventDispatcher::new()),
            state: SessionState::Uninitialized,
            key: None,
            subscription: None,
            timeline: Timeline::new(),
            live_gap: false,
            gap_reported: false,
            cancel: CancelHandle::default(),
        }
    }

    /// Routes session events to `events`.
    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    /// The conversation this session is bound to.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// The local participant.
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The visible sequence, ordered by timestamp.
    pub fn messages(&self) -> &[DecryptedMessage] {
        self.timeline.entries()
    }

    /// True while live delivery is interrupted and messages may be missing.
    pub fn has_live_gap(&self) -> bool {
        self.live_gap
    }

    /// True while a subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Handle that cancels a pending `open` from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    // === Lifecycle ===

    /// Runs the session from its current state up to `Live`.
    ///
    /// May be called again from `KeyReady` after a failed history load.
    pub fn open(&mut self) -> SessionResult<()> {
        match self.state {
            SessionState::Uninitialized => self.acquire_key()?,
            SessionState::KeyReady => {}
            other => {
                return Err(SessionError::InvalidState(format!(
                    "cannot open a session in state {other:?}"
                )))
            }
        }
        self.load_history()?;
        self.go_live()
    }

    /// `Uninitialized -> KeyReady`: acquires the conversation key.
    pub fn acquire_key(&mut self) -> SessionResult<()> {
        self.require_state(SessionState::Uninitialized, "acquire key")?;
        self.check_cancelled()?;

        match self.keys.conversation_key(&self.conversation_id) {
            Ok(key) => {
                info!(
                    conversation_id = %self.conversation_id,
                    fingerprint = %key.fingerprint(),
                    "conversation key ready"
                );
                self.key = Some(key);
                self.transition(SessionState::KeyReady);
                self.check_cancelled()
            }
            Err(e) => {
                warn!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "cannot open conversation"
                );
                self.close();
                Err(e.into())
            }
        }
    }

    /// `KeyReady -> Loading`: loads and decrypts history.
    ///
    /// On a query failure the session returns to `KeyReady`.
    pub fn load_history(&mut self) -> SessionResult<()> {
        self.require_state(SessionState::KeyReady, "load history")?;
        let key = self.current_key()?;
        self.transition(SessionState::Loading);
        self.check_cancelled()?;

        let records = match self.backend.query(&self.conversation_id) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "failed to load messages"
                );
                self.transition(SessionState::KeyReady);
                return Err(e.into());
            }
        };

        let decrypted = decrypt_in_order(&records, &key, &self.config);
        self.check_cancelled()?;

        let failed = decrypted.iter().filter(|m| m.is_failed()).count();
        let count = decrypted.len();
        for message in decrypted {
            self.append(message);
        }

        info!(conversation_id = %self.conversation_id, count, failed, "history loaded");
        self.events.dispatch(ChatEvent::HistoryLoaded {
            conversation_id: self.conversation_id.clone(),
            count,
            failed,
        });
        Ok(())
    }

    /// `Loading -> Live`: subscribes to the conversation.
    ///
    /// If every subscribe attempt fails the session still goes live, with
    /// the gap flagged; [`ConversationSession::pump`] keeps retrying.
    pub fn go_live(&mut self) -> SessionResult<()> {
        self.require_state(SessionState::Loading, "go live")?;
        self.check_cancelled()?;

        self.live_gap = true;
        self.establish_subscription()?;
        self.transition(SessionState::Live);
        Ok(())
    }

    /// Cancels the subscription, releases the key, and clears the visible
    /// sequence. Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.key = None;
        self.timeline.clear();
        self.live_gap = false;
        self.gap_reported = false;
        self.transition(SessionState::Closed);
    }

    // === Live delivery ===

    /// Applies every pushed insert that is already pending.
    ///
    /// Returns the number of messages that entered the visible sequence.
    pub fn pump(&mut self) -> SessionResult<usize> {
        self.pump_inner(None)
    }

    /// Like [`ConversationSession::pump`], but waits up to `timeout` for the
    /// first insert when none is pending.
    pub fn wait_for_messages(&mut self, timeout: Duration) -> SessionResult<usize> {
        self.pump_inner(Some(timeout))
    }

    fn pump_inner(&mut self, wait: Option<Duration>) -> SessionResult<usize> {
        self.require_state(SessionState::Live, "receive messages")?;

        let mut applied = 0;
        if self.subscription.is_none() || self.live_gap {
            applied += self.establish_subscription()?;
        }

        let mut batch = Vec::new();
        let mut lost = None;
        if let Some(subscription) = &self.subscription {
            if let Some(timeout) = wait {
                match subscription.next_timeout(timeout) {
                    Ok(Some(record)) => batch.push(record),
                    Ok(None) => {}
                    Err(e) => lost = Some(e),
                }
            }
            while lost.is_none() {
                match subscription.try_next() {
                    Ok(Some(record)) => batch.push(record),
                    Ok(None) => break,
                    Err(e) => lost = Some(e),
                }
            }
        }

        // Records received before the loss are still valid
        applied += self.apply_live(batch)?;

        if let Some(error) = lost {
            self.handle_subscription_loss(error);
            applied += self.establish_subscription()?;
        }
        Ok(applied)
    }

    fn apply_live(&mut self, batch: Vec<MessageRecord>) -> SessionResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let key = self.current_key()?;

        let mut accepted: Vec<MessageRecord> = Vec::with_capacity(batch.len());
        for record in batch {
            if record.conversation_id != self.conversation_id {
                warn!(
                    conversation_id = %self.conversation_id,
                    foreign = %record.conversation_id,
                    message_id = %record.id,
                    "dropping event for another conversation"
                );
                self.events.dispatch(ChatEvent::StaleEventDropped {
                    conversation_id: self.conversation_id.clone(),
                    foreign_conversation_id: record.conversation_id,
                    message_id: record.id,
                });
                continue;
            }
            if self.timeline.contains(&record.id) || accepted.iter().any(|r| r.id == record.id) {
                debug!(message_id = %record.id, "ignoring duplicate delivery");
                continue;
            }
            accepted.push(record);
        }

        // Delivery order may differ from timestamp order
        accepted.sort_by_key(|record| record.created_at);

        let mut applied = 0;
        for message in decrypt_in_order(&accepted, &key, &self.config) {
            if self.append(message) {
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn handle_subscription_loss(&mut self, error: SubscriptionError) {
        warn!(
            conversation_id = %self.conversation_id,
            error = %error,
            "live delivery interrupted; messages may be missed until resubscribed"
        );
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.live_gap = true;
        self.report_gap(&error);
    }

    /// Emits `SubscriptionLost` once per gap.
    fn report_gap(&mut self, error: &dyn fmt::Display) {
        if self.gap_reported {
            return;
        }
        self.gap_reported = true;
        self.events.dispatch(ChatEvent::SubscriptionLost {
            conversation_id: self.conversation_id.clone(),
            error: error.to_string(),
        });
    }

    /// Subscribes if needed, then closes any gap with a catch-up query.
    ///
    /// Returns the number of messages recovered. Failures are logged and
    /// leave the gap flagged for the next attempt. A reported gap is
    /// answered with `Resubscribed` once it closes.
    fn establish_subscription(&mut self) -> SessionResult<usize> {
        if self.subscription.is_none() {
            let attempts = self.config.max_resubscribe_attempts.max(1);
            for attempt in 1..=attempts {
                match self.backend.subscribe(&self.conversation_id) {
                    Ok(subscription) => {
                        debug!(conversation_id = %self.conversation_id, attempt, "subscribed");
                        self.subscription = Some(subscription);
                        break;
                    }
                    Err(e) => {
                        warn!(
                            conversation_id = %self.conversation_id,
                            attempt,
                            error = %e,
                            "subscribe failed"
                        );
                        if attempt == attempts {
                            self.report_gap(&e);
                        }
                    }
                }
            }
        }

        if self.subscription.is_none() {
            return Ok(0);
        }

        let recovered = if self.config.catch_up_on_subscribe {
            match self.catch_up() {
                Ok(recovered) => recovered,
                Err(e) => {
                    warn!(
                        conversation_id = %self.conversation_id,
                        error = %e,
                        "catch-up query failed"
                    );
                    self.report_gap(&e);
                    return Ok(0);
                }
            }
        } else {
            0
        };

        self.live_gap = false;
        if std::mem::take(&mut self.gap_reported) {
            info!(conversation_id = %self.conversation_id, recovered, "live delivery resumed");
            self.events.dispatch(ChatEvent::Resubscribed {
                conversation_id: self.conversation_id.clone(),
                recovered,
            });
        }
        Ok(recovered)
    }

    /// Merges stored records the visible sequence does not have yet.
    fn catch_up(&mut self) -> SessionResult<usize> {
        let records = self.backend.query(&self.conversation_id)?;
        self.apply_live(records)
    }

    // === Sending ===

    /// Encrypts and persists a message.
    ///
    /// Nothing is appended locally; the message becomes visible when the
    /// channel delivers the insert back. On failure nothing is appended
    /// either.
    pub fn send(&mut self, text: &str) -> SessionResult<MessageId> {
        self.require_state(SessionState::Live, "send")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let key = self.current_key()?;

        let payload = codec::encrypt(&key, text.as_bytes())?;
        let record = NewMessageRecord::from_payload(
            self.conversation_id.clone(),
            self.sender_id.clone(),
            &payload,
        );

        match self.backend.insert(record) {
            Ok(message_id) => {
                debug!(
                    conversation_id = %self.conversation_id,
                    message_id = %message_id,
                    "message sent"
                );
                self.events.dispatch(ChatEvent::MessageSent {
                    conversation_id: self.conversation_id.clone(),
                    message_id: message_id.clone(),
                });
                Ok(message_id)
            }
            Err(e) => {
                warn!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "failed to send message"
                );
                self.events.dispatch(ChatEvent::SendFailed {
                    conversation_id: self.conversation_id.clone(),
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    // === Internals ===

    fn append(&mut self, message: DecryptedMessage) -> bool {
        let message_id = message.id.clone();
        let failed = message.is_failed();

        let Some(position) = self.timeline.insert(message) else {
            return false;
        };
        if position + 1 < self.timeline.len() {
            debug!(message_id = %message_id, position, "merged late message by timestamp");
        }
        if failed {
            self.events.dispatch(ChatEvent::DecryptionFailed {
                conversation_id: self.conversation_id.clone(),
                message_id: message_id.clone(),
            });
        }
        self.events.dispatch(ChatEvent::MessageAppended {
            conversation_id: self.conversation_id.clone(),
            message_id,
            position,
        });
        true
    }

    fn current_key(&self) -> SessionResult<Arc<ConversationKey>> {
        self.key
            .clone()
            .ok_or_else(|| SessionError::InvalidState("conversation key not acquired".into()))
    }

    fn transition(&mut self, state: SessionState) {
        debug!(
            conversation_id = %self.conversation_id,
            from = ?self.state,
            to = ?state,
            "session state"
        );
        self.state = state;
        self.events.dispatch(ChatEvent::StateChanged {
            conversation_id: self.conversation_id.clone(),
            state,
        });
    }

    fn require_state(&self, expected: SessionState, operation: &str) -> SessionResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState(format!(
                "cannot {operation} in state {:?}",
                self.state
            )))
        }
    }

    fn check_cancelled(&mut self) -> SessionResult<()> {
        if self.cancel.is_cancelled() {
            info!(conversation_id = %self.conversation_id, "pending load cancelled");
            self.close();
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Decrypts `records`, returning results in the same order.
///
/// Large batches are split across scoped worker threads and reassembled by
/// chunk, so completion order never affects output order.
fn decrypt_in_order(
    records: &[MessageRecord],
    key: &ConversationKey,
    config: &SessionConfig,
) -> Vec<DecryptedMessage> {
    if config.decrypt_workers <= 1 || records.len() < config.parallel_threshold.max(2) {
        return records.iter().map(|r| decrypt_record(r, key)).collect();
    }

    let chunk_size = records.len().div_ceil(config.decrypt_workers);
    std::thread::scope(|scope| {
        let workers: Vec<_> = records
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|r| decrypt_record(r, key))
                        .collect::<Vec<_>>()
                });
                (chunk, handle)
            })
            .collect();

        let mut decrypted = Vec::with_capacity(records.len());
        for (chunk, handle) in workers {
            match handle.join() {
                Ok(part) => decrypted.extend(part),
                Err(_) => {
                    warn!("decrypt worker panicked; retrying chunk inline");
                    decrypted.extend(chunk.iter().map(|r| decrypt_record(r, key)));
                }
            }
        }
        decrypted
    })
}

fn decrypt_record(record: &MessageRecord, key: &ConversationKey) -> DecryptedMessage {
    let body = match record
        .payload()
        .and_then(|payload| codec::decrypt_payload(key, &payload))
    {
        Ok(mut bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            bytes.zeroize();
            MessageBody::Plaintext(text)
        }
        Err(e) => {
            debug!(message_id = %record.id, error = %e, "failed to decrypt message");
            MessageBody::DecryptionFailed
        }
    };
    DecryptedMessage::from_record(record, body)
}
