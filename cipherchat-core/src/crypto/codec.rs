// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Codec (AES-256-GCM)
//!
//! Authenticated encryption of a single message payload.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the system RNG,
//! so a nonce is never reused under the same key. The nonce travels next to
//! the ciphertext rather than inside it:
//!
//!   - ciphertext: `encrypted bytes || tag (16 bytes)`
//!   - nonce: 12 bytes
//!
//! At the storage boundary both are carried as standard base64 text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

use super::key::ConversationKey;

/// Key size for AES-256-GCM (256 bits).
pub const KEY_LEN: usize = 32;
/// Nonce size for AES-256-GCM (96 bits).
pub const NONCE_LEN: usize = 12;
/// Authentication tag size appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Encryption error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("Secure random source failed")]
    RandomSourceFailed,
    #[error("Encryption failed")]
    EncryptionFailed,
}

/// Decryption error types.
///
/// Always scoped to a single message; never a reason to stop processing
/// the rest of a conversation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("Decryption failed: data may be corrupted or wrong key")]
    AuthenticationFailed,
    #[error("Ciphertext too short")]
    CiphertextTooShort,
    #[error("Invalid nonce length (expected {expected}, got {actual})")]
    InvalidNonceLength { expected: usize, actual: usize },
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Output of a single encryption: ciphertext with tag, plus the nonce used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

impl EncryptedPayload {
    /// Ciphertext as base64 text.
    pub fn ciphertext_base64(&self) -> String {
        STANDARD.encode(&self.ciphertext)
    }

    /// Nonce as base64 text.
    pub fn nonce_base64(&self) -> String {
        STANDARD.encode(self.nonce)
    }

    /// Parses a payload from its base64 storage form.
    pub fn from_base64(ciphertext: &str, nonce: &str) -> Result<Self, DecryptionError> {
        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|e| DecryptionError::InvalidEncoding(e.to_string()))?;
        let nonce_bytes = STANDARD
            .decode(nonce)
            .map_err(|e| DecryptionError::InvalidEncoding(e.to_string()))?;
        let nonce = to_nonce(&nonce_bytes)?;
        Ok(EncryptedPayload { ciphertext, nonce })
    }
}

/// Encrypts a plaintext under `key` with a freshly generated nonce.
pub fn encrypt(
    key: &ConversationKey,
    plaintext: &[u8],
) -> Result<EncryptedPayload, EncryptionError> {
    let rng = SystemRandom::new();

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| EncryptionError::RandomSourceFailed)?;

    let unbound_key = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| EncryptionError::EncryptionFailed)?;
    let sealing_key = LessSafeKey::new(unbound_key);

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    Ok(EncryptedPayload {
        ciphertext: in_out,
        nonce: nonce_bytes,
    })
}

/// Decrypts `ciphertext` (with appended tag) using `key` and `nonce`.
///
/// Fails with [`DecryptionError::AuthenticationFailed`] whenever the tag does
/// not verify: wrong key, tampered bytes, or a nonce that was not the one used
/// to encrypt.
pub fn decrypt(
    key: &ConversationKey,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    let nonce_bytes = to_nonce(nonce)?;
    if ciphertext.len() < TAG_LEN {
        return Err(DecryptionError::CiphertextTooShort);
    }

    let unbound_key = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| DecryptionError::AuthenticationFailed)?;
    let opening_key = LessSafeKey::new(unbound_key);

    let mut buffer = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut buffer,
        )
        .map_err(|_| DecryptionError::AuthenticationFailed)?;

    Ok(plaintext.to_vec())
}

/// Decrypts a parsed payload.
pub fn decrypt_payload(
    key: &ConversationKey,
    payload: &EncryptedPayload,
) -> Result<Vec<u8>, DecryptionError> {
    decrypt(key, &payload.ciphertext, &payload.nonce)
}

fn to_nonce(bytes: &[u8]) -> Result<[u8; NONCE_LEN], DecryptionError> {
    bytes
        .try_into()
        .map_err(|_| DecryptionError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: bytes.len(),
        })
}
