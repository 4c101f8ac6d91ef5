// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Subscriber registry: per-conversation fan-out of inserted records.

use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::Subscription;
use crate::message::{ConversationId, MessageRecord};

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    subscribers: HashMap<ConversationId, Vec<(u64, Sender<MessageRecord>)>>,
}

/// Tracks live subscriptions and delivers records to them.
#[derive(Default)]
pub struct SubscriberRegistry {
    state: Mutex<RegistryState>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(SubscriberRegistry::default())
    }

    /// Registers a new subscription for `conversation_id`.
    pub fn subscribe(self: &Arc<Self>, conversation_id: &ConversationId) -> Subscription {
        let (sender, receiver) = mpsc::channel();

        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state
                .subscribers
                .entry(conversation_id.clone())
                .or_default()
                .push((id, sender));
            id
        };

        let registry: Weak<SubscriberRegistry> = Arc::downgrade(self);
        let scope = conversation_id.clone();
        Subscription::new(conversation_id.clone(), receiver, move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(&scope, id);
            }
        })
    }

    /// Delivers `record` to every subscriber of its conversation.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, record: &MessageRecord) -> usize {
        self.publish_to(&record.conversation_id, record)
    }

    /// Delivers `record` to the subscribers of `conversation_id`, whatever
    /// conversation the record itself names.
    pub fn publish_to(&self, conversation_id: &ConversationId, record: &MessageRecord) -> usize {
        let mut state = self.state.lock();
        let Some(subscribers) = state.subscribers.get_mut(conversation_id) else {
            return 0;
        };

        // Receivers that were dropped without cancelling are pruned here
        subscribers.retain(|(_, sender)| sender.send(record.clone()).is_ok());
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            state.subscribers.remove(conversation_id);
        }

        trace!(conversation_id = %conversation_id, delivered, "published record");
        delivered
    }

    /// Drops every subscriber of `conversation_id`. Their streams report
    /// [`super::SubscriptionError::Closed`].
    pub fn disconnect(&self, conversation_id: &ConversationId) -> usize {
        self.state
            .lock()
            .subscribers
            .remove(conversation_id)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Number of live subscribers for `conversation_id`.
    pub fn subscriber_count(&self, conversation_id: &ConversationId) -> usize {
        self.state
            .lock()
            .subscribers
            .get(conversation_id)
            .map_or(0, Vec::len)
    }

    fn remove(&self, conversation_id: &ConversationId, id: u64) {
        let mut state = self.state.lock();
        if let Some(subscribers) = state.subscribers.get_mut(conversation_id) {
            subscribers.retain(|(sub_id, _)| *sub_id != id);
            if subscribers.is_empty() {
                state.subscribers.remove(conversation_id);
            }
        }
    }
}
