// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod codec;
pub mod kdf;
pub mod key;
pub mod provider;

pub use codec::{
    decrypt, decrypt_payload, encrypt, DecryptionError, EncryptedPayload, EncryptionError, KEY_LEN,
    NONCE_LEN, TAG_LEN,
};
pub use kdf::{
    derive_conversation_key, KdfConfig, KeyDerivationError, DEFAULT_ITERATIONS, DEFAULT_SALT,
};
pub use key::ConversationKey;
pub use provider::{CachingKeyProvider, KeyProvider, Pbkdf2KeyProvider};
