// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Events
//!
//! Conversation sessions report message and subscription changes
//! as [`ChatEvent`]s. A UI or CLI observes them through an [`EventDispatcher`]
//! shared by every session of a [`crate::ChatContext`].

use std::sync::Arc;

use super::SessionState;
use crate::message::{ConversationId, MessageId};

/// Events emitted by conversation sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The session moved to a new state.
    StateChanged {
        conversation_id: ConversationId,
        state: SessionState,
    },

    /// Historical messages were decrypted and rendered.
    HistoryLoaded {
        conversation_id: ConversationId,
        /// Number of messages rendered.
        count: usize,
        /// How many of them failed to decrypt.
        failed: usize,
    },

    /// A message entered the visible sequence.
    MessageAppended {
        conversation_id: ConversationId,
        message_id: MessageId,
        /// Index the message was placed at.
        position: usize,
    },

    /// A message could not be decrypted and is shown as a placeholder.
    DecryptionFailed {
        conversation_id: ConversationId,
        message_id: MessageId,
    },

    /// A message was persisted. It becomes visible when the channel
    /// redelivers it.
    MessageSent {
        conversation_id: ConversationId,
        message_id: MessageId,
    },

    /// A message could not be persisted.
    SendFailed {
        conversation_id: ConversationId,
        error: String,
    },

    /// Live delivery stopped; messages may be missed until resubscribed.
    /// Emitted once per outage.
    SubscriptionLost {
        conversation_id: ConversationId,
        error: String,
    },

    /// Live delivery resumed after a reported outage.
    Resubscribed {
        conversation_id: ConversationId,
        /// Messages recovered by the catch-up query.
        recovered: usize,
    },

    /// A pushed record named a different conversation and was discarded.
    StaleEventDropped {
        conversation_id: ConversationId,
        foreign_conversation_id: ConversationId,
        message_id: MessageId,
    },
}

/// Observer of conversation sessions.
///
/// Handlers run on the thread that drives the session, so they should hand
/// work off rather than block.
pub trait EventHandler: Send + Sync {
    /// Receives one session event.
    fn on_event(&self, event: ChatEvent);
}

/// Observer backed by a closure, e.g. a UI redraw hook.
pub struct CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    /// Wraps `callback`.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    fn on_event(&self, event: ChatEvent) {
        (self.callback)(event);
    }
}

/// Fans session events out to every registered observer, in registration order.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no observers.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Registers an observer.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Drops every observer.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Number of registered observers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Delivers `event` to each observer.
    pub fn dispatch(&self, event: ChatEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}
