// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Error Types

use thiserror::Error;

use crate::crypto::{EncryptionError, KeyDerivationError};
use crate::store::{PersistenceError, SubscriptionError};

/// Unified error type for session operations.
///
/// Per-message decryption failures never surface here; they become
/// placeholders in the visible sequence.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The conversation key could not be acquired; the session cannot open.
    #[error("cannot open conversation: {0}")]
    KeyDerivation(#[from] KeyDerivationError),

    /// Encrypting an outgoing message failed.
    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// The store rejected an insert or query.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The realtime channel failed.
    #[error("subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// Operation not valid in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Message text was empty after trimming.
    #[error("message is empty")]
    EmptyMessage,

    /// The pending load was cancelled.
    #[error("session cancelled")]
    Cancelled,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
