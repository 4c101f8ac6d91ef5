// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversation Key
//!
//! 256-bit symmetric key scoped to one conversation. Held in memory only and
//! wiped when dropped.

use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use super::codec::{EncryptionError, KEY_LEN};

/// Number of digest bytes shown in a key fingerprint.
const FINGERPRINT_LEN: usize = 8;

/// 256-bit AES-GCM key for one conversation.
#[derive(Clone)]
pub struct ConversationKey {
    bytes: [u8; KEY_LEN],
}

impl std::fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        f.debug_struct("ConversationKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for ConversationKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl PartialEq for ConversationKey {
    fn eq(&self, other: &Self) -> bool {
        ring::constant_time::verify_slices_are_equal(&self.bytes, &other.bytes).is_ok()
    }
}

impl Eq for ConversationKey {}

impl ConversationKey {
    /// Generates a random key from the system RNG.
    pub fn generate() -> Result<Self, EncryptionError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill(&mut bytes)
            .map_err(|_| EncryptionError::RandomSourceFailed)?;
        Ok(ConversationKey { bytes })
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        ConversationKey { bytes }
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Short hex fingerprint (truncated SHA-256) safe to log.
    pub fn fingerprint(&self) -> String {
        let hash = digest::digest(&digest::SHA256, &self.bytes);
        hex::encode(&hash.as_ref()[..FINGERPRINT_LEN])
    }
}
