// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Visible message sequence.
//!
//! Kept sorted by `created_at`. Each message id appears at most once.
//! Messages with equal timestamps keep the order they were added in.

use std::collections::HashSet;

use crate::message::{DecryptedMessage, MessageId};

#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<DecryptedMessage>,
    seen: HashSet<MessageId>,
}

impl Timeline {
    pub fn new() -> Self {
        Timeline::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Inserts at the timestamp position. Returns the index, or `None` for
    /// a duplicate.
    pub fn insert(&mut self, message: DecryptedMessage) -> Option<usize> {
        if !self.seen.insert(message.id.clone()) {
            return None;
        }
        let position = self
            .entries
            .partition_point(|existing| existing.created_at <= message.created_at);
        self.entries.insert(position, message);
        Some(position)
    }

    pub fn entries(&self) -> &[DecryptedMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }
}
