// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration types.

use std::sync::Arc;

use crate::crypto::{CachingKeyProvider, KdfConfig, KeyProvider, Pbkdf2KeyProvider};

/// Tuning for conversation sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Worker threads used to decrypt history. `1` decrypts inline.
    pub decrypt_workers: usize,
    /// Minimum batch size before decryption is spread across workers.
    pub parallel_threshold: usize,
    /// Subscribe attempts made each time live delivery is (re)established.
    pub max_resubscribe_attempts: u32,
    /// Re-query the conversation after subscribing so inserts that landed
    /// while unsubscribed are not missed.
    pub catch_up_on_subscribe: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            decrypt_workers: 4,
            parallel_threshold: 32,
            max_resubscribe_attempts: 3,
            catch_up_on_subscribe: true,
        }
    }
}

impl SessionConfig {
    /// Sets the number of history decrypt workers.
    pub fn with_decrypt_workers(mut self, workers: usize) -> Self {
        self.decrypt_workers = workers.max(1);
        self
    }

    /// Sets the batch size at which decryption goes parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Sets the number of subscribe attempts.
    pub fn with_max_resubscribe_attempts(mut self, attempts: u32) -> Self {
        self.max_resubscribe_attempts = attempts.max(1);
        self
    }

    /// Disables the catch-up query after subscribing.
    pub fn without_catch_up(mut self) -> Self {
        self.catch_up_on_subscribe = false;
        self
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatConfig {
    /// Conversation key derivation parameters.
    pub kdf: KdfConfig,
    /// Session tuning.
    pub session: SessionConfig,
}

impl ChatConfig {
    /// Replaces the key derivation parameters.
    pub fn with_kdf(mut self, kdf: KdfConfig) -> Self {
        self.kdf = kdf;
        self
    }

    /// Replaces the session tuning.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Builds the shared, caching key provider for these parameters.
    pub fn key_provider(&self) -> Arc<dyn KeyProvider> {
        Arc::new(CachingKeyProvider::new(Pbkdf2KeyProvider::new(
            self.kdf.clone(),
        )))
    }
}
