// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Codec Tests
//!
//! AES-256-GCM encryption of message bodies and per-message failure modes.

use cipherchat_core::crypto::{NONCE_LEN, TAG_LEN};
use cipherchat_core::{
    decrypt, encrypt, ConversationKey, DecryptionError, EncryptedPayload, MessageRecord,
};

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let key = ConversationKey::generate().unwrap();
    let payload = encrypt(&key, b"hello").unwrap();

    let plaintext = decrypt(&key, &payload.ciphertext, &payload.nonce).unwrap();
    assert_eq!(plaintext, b"hello");
}

// AES-256-GCM reference vectors: zero key, zero nonce, no AAD
const ZERO_KEY_EMPTY_TAG: &str = "530f8afbc74536b9a963b4f1c4cb738b";
const ZERO_KEY_ZERO_BLOCK_SEALED: &str =
    "cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919";

#[test]
fn test_decrypt_reference_vectors() {
    let key = ConversationKey::from_bytes([0; 32]);
    let nonce = [0u8; NONCE_LEN];

    let tag = hex::decode(ZERO_KEY_EMPTY_TAG).unwrap();
    assert!(decrypt(&key, &tag, &nonce).unwrap().is_empty());

    let sealed = hex::decode(ZERO_KEY_ZERO_BLOCK_SEALED).unwrap();
    assert_eq!(decrypt(&key, &sealed, &nonce).unwrap(), vec![0u8; 16]);
}

#[test]
fn test_ciphertext_carries_tag() {
    let key = ConversationKey::generate().unwrap();
    let payload = encrypt(&key, b"hello").unwrap();

    assert_eq!(payload.ciphertext.len(), 5 + TAG_LEN);
    assert_eq!(payload.nonce.len(), NONCE_LEN);
}

#[test]
fn test_empty_plaintext_roundtrip() {
    let key = ConversationKey::generate().unwrap();
    let payload = encrypt(&key, b"").unwrap();

    assert_eq!(payload.ciphertext.len(), TAG_LEN);
    assert!(decrypt(&key, &payload.ciphertext, &payload.nonce)
        .unwrap()
        .is_empty());
}

#[test]
fn test_nonce_is_fresh_per_encryption() {
    let key = ConversationKey::generate().unwrap();
    let first = encrypt(&key, b"same").unwrap();
    let second = encrypt(&key, b"same").unwrap();

    assert_ne!(first.nonce, second.nonce);
    assert_ne!(first.ciphertext, second.ciphertext);
}

#[test]
fn test_wrong_key_fails_authentication() {
    let key = ConversationKey::generate().unwrap();
    let other = ConversationKey::generate().unwrap();
    let payload = encrypt(&key, b"secret").unwrap();

    let result = decrypt(&other, &payload.ciphertext, &payload.nonce);
    assert_eq!(result, Err(DecryptionError::AuthenticationFailed));
}

#[test]
fn test_corrupted_ciphertext_fails() {
    let key = ConversationKey::generate().unwrap();
    let mut payload = encrypt(&key, b"secret").unwrap();
    payload.ciphertext[0] ^= 0x01;

    let result = decrypt(&key, &payload.ciphertext, &payload.nonce);
    assert_eq!(result, Err(DecryptionError::AuthenticationFailed));
}

#[test]
fn test_corrupted_tag_fails() {
    let key = ConversationKey::generate().unwrap();
    let mut payload = encrypt(&key, b"secret").unwrap();
    let last = payload.ciphertext.len() - 1;
    payload.ciphertext[last] ^= 0x80;

    assert!(decrypt(&key, &payload.ciphertext, &payload.nonce).is_err());
}

#[test]
fn test_mismatched_nonce_fails() {
    let key = ConversationKey::generate().unwrap();
    let first = encrypt(&key, b"one").unwrap();
    let second = encrypt(&key, b"two").unwrap();

    let result = decrypt(&key, &first.ciphertext, &second.nonce);
    assert_eq!(result, Err(DecryptionError::AuthenticationFailed));
}

#[test]
fn test_short_ciphertext_rejected() {
    let key = ConversationKey::generate().unwrap();
    let result = decrypt(&key, &[0u8; TAG_LEN - 1], &[0u8; NONCE_LEN]);
    assert_eq!(result, Err(DecryptionError::CiphertextTooShort));
}

#[test]
fn test_bad_nonce_length_rejected() {
    let key = ConversationKey::generate().unwrap();
    let payload = encrypt(&key, b"secret").unwrap();

    let result = decrypt(&key, &payload.ciphertext, &payload.nonce[..8]);
    assert_eq!(
        result,
        Err(DecryptionError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: 8
        })
    );
}

#[test]
fn test_payload_base64_roundtrip() {
    let key = ConversationKey::generate().unwrap();
    let payload = encrypt(&key, b"over the wire").unwrap();

    let parsed =
        EncryptedPayload::from_base64(&payload.ciphertext_base64(), &payload.nonce_base64())
            .unwrap();
    assert_eq!(parsed, payload);
}

#[test]
fn test_payload_rejects_invalid_base64() {
    let result = EncryptedPayload::from_base64("%%%", "AAAAAAAAAAAAAAAA");
    assert!(matches!(result, Err(DecryptionError::InvalidEncoding(_))));
}

#[test]
fn test_payload_rejects_short_nonce() {
    // "AAAA" decodes to 3 bytes
    let result = EncryptedPayload::from_base64("AAAA", "AAAA");
    assert_eq!(
        result,
        Err(DecryptionError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: 3
        })
    );
}

#[test]
fn test_record_json_wire_format() {
    let json = r#"{
        "id": "m1",
        "conversation_id": "conv-1",
        "sender_id": "alice",
        "encrypted_content": "AAAA",
        "iv": "AAAAAAAAAAAAAAAA",
        "created_at": 1700000000000
    }"#;

    let record = MessageRecord::from_json(json).unwrap();
    assert_eq!(record.conversation_id.as_str(), "conv-1");
    assert_eq!(record.created_at, 1_700_000_000_000);

    let back = MessageRecord::from_json(&record.to_json().unwrap()).unwrap();
    assert_eq!(back, record);
}

fn record_json(created_at: &str) -> String {
    format!(
        r#"{{"id":"m1","conversation_id":"conv-1","sender_id":"alice","encrypted_content":"AAAA","iv":"AAAAAAAAAAAAAAAA","created_at":{created_at}}}"#
    )
}

#[test]
fn test_record_json_accepts_rfc3339_timestamps() {
    let cases = [
        (r#""2024-05-01T12:00:00.123+00:00""#, 1_714_564_800_123),
        (r#""2024-05-01T12:00:00.123456+00:00""#, 1_714_564_800_123),
        (r#""2024-05-01T12:00:00.123Z""#, 1_714_564_800_123),
        (r#""2024-05-01T14:00:00.123+02:00""#, 1_714_564_800_123),
    ];
    for (created_at, millis) in cases {
        let record = MessageRecord::from_json(&record_json(created_at)).unwrap();
        assert_eq!(record.created_at, millis, "parsing {created_at}");
    }
}

#[test]
fn test_record_json_writes_rfc3339_timestamp() {
    let record = MessageRecord::from_json(&record_json("1700000000000")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
    assert_eq!(json["created_at"], "2023-11-14T22:13:20.000+00:00");
}

#[test]
fn test_record_json_rejects_bad_timestamps() {
    for created_at in [r#""yesterday""#, r#""1969-12-31T23:59:59+00:00""#, "-5"] {
        assert!(
            MessageRecord::from_json(&record_json(created_at)).is_err(),
            "accepted {created_at}"
        );
    }
}

#[test]
fn test_key_debug_is_redacted() {
    let key = ConversationKey::from_bytes([0xAB; 32]);
    let debug = format!("{key:?}");
    assert!(!debug.contains("ab"), "key bytes leaked: {debug}");
    assert!(debug.contains("REDACTED"));
}

#[test]
fn test_key_fingerprint_is_stable() {
    let a = ConversationKey::from_bytes([7; 32]);
    let b = ConversationKey::from_bytes([7; 32]);
    let c = ConversationKey::from_bytes([8; 32]);

    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
    assert_eq!(a.fingerprint().len(), 16);
}
