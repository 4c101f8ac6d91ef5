// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies

use proptest::prelude::*;

/// Message bodies, including empty and multi-byte text.
pub fn plaintext_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// Non-empty printable message text.
pub fn message_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?]{1,200}"
        .prop_map(|s| s.trim().to_string())
        .prop_filter("non-empty", |s| !s.is_empty())
}

/// UUID-shaped conversation identifiers.
pub fn conversation_id_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
}

/// Raw 256-bit keys.
pub fn key_bytes_strategy() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}
