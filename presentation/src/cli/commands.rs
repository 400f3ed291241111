//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for parley
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about = "Chat with your assistants from the terminal")]
#[command(long_about = r#"
Parley talks to the conversation API on your behalf: it caches reads, spaces
repeated calls, retries when the server asks it to slow down, and remembers
your conversation list between runs.

Credentials come from the environment:
  PARLEY_AUTH__TOKEN      Bearer token
  PARLEY_AUTH__USER_ID    Id of the signed-in user

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./parley.toml       Project-level config
3. ~/.config/parley/config.toml   Global config

Example:
  parley list
  parley new asst_123 --title "Trip planning"
  parley send 42 "Where should we start?"
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration sources and the merged configuration, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Conversation commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List your conversations
    List,

    /// Show a conversation and its messages
    Show {
        /// Conversation id
        id: String,
    },

    /// Start a new conversation with an assistant
    New {
        /// Assistant to talk to
        assistant_id: String,

        /// Conversation title (the server picks one when omitted)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Send a message and print the reply
    Send {
        /// Conversation id
        conversation_id: String,

        /// Message text
        message: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id
        id: String,
    },

    /// Rename a conversation
    Rename {
        /// Conversation id
        id: String,

        /// New title
        title: String,
    },
}
