// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key Provider
//!
//! Single point through which sessions acquire conversation keys. Sessions
//! and the codec only see [`KeyProvider`], so PBKDF2 derivation can be swapped
//! for key agreement without touching either.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::kdf::{derive_conversation_key, KdfConfig, KeyDerivationError};
use super::key::ConversationKey;
use crate::message::ConversationId;

/// Source of conversation keys.
pub trait KeyProvider: Send + Sync {
    /// Returns the key for `conversation_id`.
    fn conversation_key(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Arc<ConversationKey>, KeyDerivationError>;
}

/// Derives keys from the conversation identifier with PBKDF2.
#[derive(Debug, Clone, Default)]
pub struct Pbkdf2KeyProvider {
    config: KdfConfig,
}

impl Pbkdf2KeyProvider {
    /// Creates a provider using `config`.
    pub fn new(config: KdfConfig) -> Self {
        Pbkdf2KeyProvider { config }
    }

    /// Returns the derivation parameters.
    pub fn config(&self) -> &KdfConfig {
        &self.config
    }
}

impl KeyProvider for Pbkdf2KeyProvider {
    fn conversation_key(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Arc<ConversationKey>, KeyDerivationError> {
        derive_conversation_key(conversation_id.as_str(), &self.config).map(Arc::new)
    }
}

/// Caches keys from an inner provider, keyed by conversation identifier.
///
/// Shared by every session in a process. Derivation is pure, so two threads
/// racing on the same identifier both compute it and the first insert wins.
pub struct CachingKeyProvider<P: KeyProvider> {
    inner: P,
    cache: RwLock<HashMap<ConversationId, Arc<ConversationKey>>>,
}

impl<P: KeyProvider> CachingKeyProvider<P> {
    /// Wraps `inner` with an empty cache.
    pub fn new(inner: P) -> Self {
        CachingKeyProvider {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Removes a cached key. Returns true if one was present.
    pub fn evict(&self, conversation_id: &ConversationId) -> bool {
        self.cache.write().remove(conversation_id).is_some()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

impl<P: KeyProvider> KeyProvider for CachingKeyProvider<P> {
    fn conversation_key(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Arc<ConversationKey>, KeyDerivationError> {
        if let Some(key) = self.cache.read().get(conversation_id) {
            return Ok(Arc::clone(key));
        }

        // Derive outside the lock; PBKDF2 is slow.
        let key = self.inner.conversation_key(conversation_id)?;
        debug!(
            conversation_id = %conversation_id,
            fingerprint = %key.fingerprint(),
            "derived conversation key"
        );

        let mut cache = self.cache.write();
        let entry = cache
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::clone(&key));
        Ok(Arc::clone(entry))
    }
}
