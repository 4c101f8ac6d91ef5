// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fingerprint Command

use anyhow::Result;
use cipherchat_core::derive_conversation_key;

use crate::config::CliConfig;

/// Prints the fingerprint of a conversation's key so participants can
/// compare that they derive the same key.
pub fn run(config: &CliConfig, conversation: &str) -> Result<()> {
    let key = derive_conversation_key(conversation, &config.chat_config().kdf)?;
    println!("{}", key.fingerprint());
    Ok(())
}
