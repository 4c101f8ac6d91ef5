// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! History Command
//!
//! Prints a conversation's decrypted messages in timestamp order.

use anyhow::Result;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use cipherchat_core::{DecryptedMessage, Timestamp};
use serde_json::json;

use crate::config::CliConfig;

/// Viewer id used when no sender is given; matches nobody.
const ANONYMOUS_VIEWER: &str = "";

pub fn run(
    config: &CliConfig,
    conversation: &str,
    viewer: Option<&str>,
    as_json: bool,
) -> Result<()> {
    let viewer = viewer.unwrap_or(ANONYMOUS_VIEWER);
    let mut context = config.chat_context(viewer)?;
    let session = context.open_conversation(conversation)?;

    if as_json {
        let messages: Vec<_> = session.messages().iter().map(to_json).collect();
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if session.messages().is_empty() {
        println!("No messages yet.");
    } else {
        for message in session.messages() {
            let who = if message.is_from(viewer) {
                "me"
            } else {
                message.sender_id.as_str()
            };
            println!(
                "[{}] {}: {}",
                format_local(message.created_at),
                who,
                message.text()
            );
        }
    }

    context.close_conversation();
    Ok(())
}

fn to_json(message: &DecryptedMessage) -> serde_json::Value {
    json!({
        "id": message.id,
        "sender_id": message.sender_id,
        "created_at": format_rfc3339(message.created_at),
        "text": message.text(),
        "decryption_failed": message.is_failed(),
    })
}

fn to_datetime(timestamp: Timestamp) -> Option<DateTime<Utc>> {
    i64::try_from(timestamp)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// Local wall-clock time, e.g. `May 01, 2024 14:00`.
fn format_local(timestamp: Timestamp) -> String {
    match to_datetime(timestamp) {
        Some(time) => time
            .with_timezone(&Local)
            .format("%b %d, %Y %H:%M")
            .to_string(),
        None => timestamp.to_string(),
    }
}

fn format_rfc3339(timestamp: Timestamp) -> String {
    match to_datetime(timestamp) {
        Some(time) => time.to_rfc3339_opts(SecondsFormat::Millis, false),
        None => timestamp.to_string(),
    }
}
