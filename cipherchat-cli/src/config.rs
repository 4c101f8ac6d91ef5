// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cipherchat_core::{ChatConfig, ChatContext, KdfConfig, SqliteMessageStore};
use tracing::debug;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// SQLite database holding message records.
    pub db_path: PathBuf,
    /// PBKDF2 iteration count for conversation keys.
    pub kdf_iterations: u32,
}

impl CliConfig {
    /// Resolves the database path, falling back to the platform data dir.
    pub fn new(db_path: Option<PathBuf>, kdf_iterations: u32) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => dirs::data_dir()
                .context("Cannot determine a data directory; pass --db")?
                .join("cipherchat")
                .join("messages.db"),
        };
        Ok(CliConfig {
            db_path,
            kdf_iterations,
        })
    }

    /// Core configuration derived from CLI flags.
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig::default().with_kdf(KdfConfig::default().with_iterations(self.kdf_iterations))
    }

    /// Opens the message store, creating parent directories if needed.
    pub fn open_store(&self) -> Result<Arc<SqliteMessageStore>> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        debug!(path = %self.db_path.display(), "opening message store");
        let store = SqliteMessageStore::open(&self.db_path)
            .with_context(|| format!("Cannot open {}", self.db_path.display()))?;
        Ok(Arc::new(store))
    }

    /// Builds a chat context for `sender_id` over the message store.
    pub fn chat_context(&self, sender_id: &str) -> Result<ChatContext> {
        let store = self.open_store()?;
        Ok(ChatContext::from_config(
            sender_id,
            store,
            &self.chat_config(),
        ))
    }
}
