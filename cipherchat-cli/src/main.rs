// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cipherchat CLI
//!
//! Command-line client for end-to-end encrypted conversations.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cipherchat_core::crypto::kdf::DEFAULT_ITERATIONS;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "cipherchat")]
#[command(version, about = "End-to-end encrypted conversations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Message database (default: <data dir>/cipherchat/messages.db)
    #[arg(long, global = true, env = "CIPHERCHAT_DB")]
    db: Option<PathBuf>,

    /// PBKDF2 iteration count for conversation keys
    #[arg(
        long,
        global = true,
        env = "CIPHERCHAT_KDF_ITERATIONS",
        default_value_t = DEFAULT_ITERATIONS
    )]
    kdf_iterations: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt and send a message
    Send {
        /// Conversation identifier
        #[arg(long)]
        conversation: String,

        /// Your participant identifier
        #[arg(long, env = "CIPHERCHAT_SENDER")]
        sender: String,

        /// Message text
        text: String,
    },

    /// Show a conversation's decrypted history
    History {
        /// Conversation identifier
        #[arg(long)]
        conversation: String,

        /// Mark messages from this participant as your own
        #[arg(long, env = "CIPHERCHAT_SENDER")]
        sender: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the conversation key fingerprint
    Fingerprint {
        /// Conversation identifier
        #[arg(long)]
        conversation: String,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("cipherchat=info,cipherchat_core=info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CliConfig::new(cli.db, cli.kdf_iterations)?;

    match cli.command {
        Commands::Send {
            conversation,
            sender,
            text,
        } => commands::send::run(&config, &conversation, &sender, &text)?,
        Commands::History {
            conversation,
            sender,
            json,
        } => commands::history::run(&config, &conversation, sender.as_deref(), json)?,
        Commands::Fingerprint { conversation } => {
            commands::fingerprint::run(&config, &conversation)?
        }
    }

    Ok(())
}
