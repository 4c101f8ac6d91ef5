// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Chat Context
//!
//! Holds the single conversation a client is looking at. Switching
//! conversations closes the old session, cancelling its subscription,
//! before the new one loads or subscribes.

use std::sync::Arc;

use tracing::info;

use super::{ConversationSession, EventDispatcher, SessionResult};
use crate::config::{ChatConfig, SessionConfig};
use crate::crypto::KeyProvider;
use crate::message::{ConversationId, SenderId};
use crate::store::ChatBackend;

/// Owner of at most one active [`ConversationSession`].
pub struct ChatContext {
    sender_id: SenderId,
    backend: Arc<dyn ChatBackend>,
    keys: Arc<dyn KeyProvider>,
    config: SessionConfig,
    events: Arc<EventDispatcher>,
    active: Option<ConversationSession>,
}

impl ChatContext {
    /// Creates a context for `sender_id` with no open conversation.
    pub fn new(
        sender_id: impl Into<SenderId>,
        backend: Arc<dyn ChatBackend>,
        keys: Arc<dyn KeyProvider>,
        config: SessionConfig,
    ) -> Self {
        ChatContext {
            sender_id: sender_id.into(),
            backend,
            keys,
            config,
            events: Arc::new(EventDispatcher::new()),
            active: None,
        }
    }

    /// Creates a context with a caching PBKDF2 key provider from `config`.
    pub fn from_config(
        sender_id: impl Into<SenderId>,
        backend: Arc<dyn ChatBackend>,
        config: &ChatConfig,
    ) -> Self {
        Self::new(
            sender_id,
            backend,
            config.key_provider(),
            config.session.clone(),
        )
    }

    /// Routes events of every session opened from now on to `events`.
    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    /// Closes the active conversation, if any, then opens `conversation_id`.
    ///
    /// If opening fails, no conversation is active afterwards.
    pub fn open_conversation(
        &mut self,
        conversation_id: impl Into<ConversationId>,
    ) -> SessionResult<&mut ConversationSession> {
        let conversation_id = conversation_id.into();
        if let Some(previous) = self.close_conversation() {
            info!(from = %previous, to = %conversation_id, "switching conversation");
        }

        let mut session = ConversationSession::new(
            conversation_id,
            self.sender_id.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.keys),
            self.config.clone(),
        )
        .with_events(Arc::clone(&self.events));
        session.open()?;

        Ok(self.active.insert(session))
    }

    /// Closes the active conversation. Returns its identifier.
    pub fn close_conversation(&mut self) -> Option<ConversationId> {
        let mut session = self.active.take()?;
        session.close();
        Some(session.conversation_id().clone())
    }

    /// The active session, if any.
    pub fn active(&self) -> Option<&ConversationSession> {
        self.active.as_ref()
    }

    /// The active session, mutably.
    pub fn active_mut(&mut self) -> Option<&mut ConversationSession> {
        self.active.as_mut()
    }
}
