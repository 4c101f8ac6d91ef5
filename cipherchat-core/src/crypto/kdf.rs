// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversation Key Derivation
//!
//! Derives the conversation key from the conversation identifier with
//! PBKDF2-HMAC-SHA256. Identifier hyphens are ignored, so a UUID written with
//! or without them maps to the same key.
//!
//! The identifier is not secret. Anyone who can read it can recompute the
//! key; [`super::KeyProvider`] is the seam for replacing this derivation with
//! real key agreement.

use ring::pbkdf2;
use std::num::NonZeroU32;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroize;

use super::codec::KEY_LEN;
use super::key::ConversationKey;

/// Application-wide PBKDF2 salt.
pub const DEFAULT_SALT: &[u8] = b"cipherchat-v1";

/// Production PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Longest identifier accepted, in bytes.
const MAX_IDENTIFIER_LEN: usize = 256;

/// Key derivation error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyDerivationError {
    #[error("Conversation identifier is empty")]
    EmptyIdentifier,

    #[error("Malformed conversation identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Iteration count must be non-zero")]
    ZeroIterations,

    #[error("Salt must not be empty")]
    EmptySalt,
}

/// PBKDF2 parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfConfig {
    /// Salt shared by every conversation.
    pub salt: Vec<u8>,
    /// PBKDF2 iteration count.
    pub iterations: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        KdfConfig {
            salt: DEFAULT_SALT.to_vec(),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfConfig {
    /// Creates a config with a custom salt and iteration count.
    pub fn new(salt: impl Into<Vec<u8>>, iterations: u32) -> Self {
        KdfConfig {
            salt: salt.into(),
            iterations,
        }
    }

    /// Keeps the default salt and overrides the iteration count.
    ///
    /// Low counts are meant for tests and benchmarks only.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Checks that the parameters can be used for derivation.
    pub fn validate(&self) -> Result<NonZeroU32, KeyDerivationError> {
        if self.salt.is_empty() {
            return Err(KeyDerivationError::EmptySalt);
        }
        let iterations =
            NonZeroU32::new(self.iterations).ok_or(KeyDerivationError::ZeroIterations)?;
        if self.iterations < DEFAULT_ITERATIONS {
            warn!(
                iterations = self.iterations,
                "PBKDF2 iteration count below production default"
            );
        }
        Ok(iterations)
    }
}

/// Derives the 256-bit key for `conversation_id`.
///
/// Identical identifiers and config always produce identical key bytes.
pub fn derive_conversation_key(
    conversation_id: &str,
    config: &KdfConfig,
) -> Result<ConversationKey, KeyDerivationError> {
    let password = normalize_identifier(conversation_id)?;
    let iterations = config.validate()?;

    let mut key_bytes = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &config.salt,
        password.as_bytes(),
        &mut key_bytes,
    );

    let key = ConversationKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Validates an identifier and strips hyphens.
fn normalize_identifier(conversation_id: &str) -> Result<String, KeyDerivationError> {
    if conversation_id.trim().is_empty() {
        return Err(KeyDerivationError::EmptyIdentifier);
    }
    if conversation_id.len() > MAX_IDENTIFIER_LEN {
        return Err(KeyDerivationError::MalformedIdentifier(format!(
            "longer than {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    if conversation_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(KeyDerivationError::MalformedIdentifier(
            "contains whitespace or control characters".into(),
        ));
    }

    let normalized: String = conversation_id.chars().filter(|c| *c != '-').collect();
    if normalized.is_empty() {
        return Err(KeyDerivationError::MalformedIdentifier(
            "contains only separators".into(),
        ));
    }
    Ok(normalized)
}
