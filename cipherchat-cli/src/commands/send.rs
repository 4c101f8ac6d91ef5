// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Send Command

use anyhow::{bail, Result};

use crate::config::CliConfig;

/// Encrypts and stores a message, then waits for it to come back through
/// the channel before reporting it as sent.
pub fn run(config: &CliConfig, conversation: &str, sender: &str, text: &str) -> Result<()> {
    let mut context = config.chat_context(sender)?;
    let session = context.open_conversation(conversation)?;

    let message_id = session.send(text)?;
    session.pump()?;

    if !session.messages().iter().any(|m| m.id == message_id) {
        bail!("Message {message_id} was stored but not delivered back");
    }

    println!("{message_id}");
    context.close_conversation();
    Ok(())
}
