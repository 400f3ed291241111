//! CLI entrypoint for parley
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use parley_application::{ConversationSession, Outcome, ResilientClient, SnapshotStore};
use parley_domain::{DomainError, SessionError};
use parley_infrastructure::{
    ConfigLoader, CredentialStore, FileConfig, FileOutputFormat, FileSnapshotStore,
    JsonlSessionEventLogger, MemorySnapshotStore, ReqwestTransport,
};
use parley_presentation::{Cli, Command, ConsoleFormatter};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let (config, issues) = if cli.no_config {
        (ConfigLoader::load_defaults(), Vec::new())
    } else {
        ConfigLoader::load_validated(cli.config.as_ref())?
    };

    if cli.show_config {
        if !cli.no_config {
            ConfigLoader::print_config_sources(cli.config.as_ref());
            println!();
        }
        println!("{}", ConsoleFormatter::json(&config.redacted()));
        return Ok(ExitCode::SUCCESS);
    }

    let _log_guard = init_logging(cli.verbose, config.logging.log_file.as_deref())?;
    for issue in &issues {
        warn!("Config: {}", issue);
    }

    let json = cli.json || config.output.format == FileOutputFormat::Json;
    ConsoleFormatter::set_color(config.output.color && !json);

    let Some(command) = cli.command else {
        bail!("No command given. Run `parley --help` for usage.");
    };

    let session = build_session(&config, cli.no_config)?;
    info!("Starting parley against {}", config.api.base_url);

    match run(&session, command, json).await {
        Ok(output) => {
            print!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if json {
                println!("{}", ConsoleFormatter::json(&error));
            } else {
                eprint!("{}", ConsoleFormatter::error(&error));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Initialize logging based on verbosity level, optionally teeing into a file.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(level))
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("logging.log_file must name a file: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Could not create log directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

/// Wire the adapters into a session (dependency injection).
fn build_session(config: &FileConfig, ephemeral: bool) -> Result<ConversationSession> {
    let credentials = Arc::new(CredentialStore::from_parts(
        config.auth.token.clone(),
        config.auth.user_id.clone(),
    ));
    let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);

    let client = ResilientClient::new(transport, credentials.clone(), config.to_client_params())
        .with_invalidation_listener(credentials);

    let store: Arc<dyn SnapshotStore> = match config.storage.resolved_snapshot_dir() {
        Some(dir) if !ephemeral => Arc::new(FileSnapshotStore::new(dir)),
        _ => Arc::new(MemorySnapshotStore::new()),
    };

    let mut session = ConversationSession::new(client)
        .with_snapshot_store(store)
        .with_params(config.to_session_params());

    if let Some(path) = &config.logging.session_log
        && let Some(logger) = JsonlSessionEventLogger::new(path)
    {
        session = session.with_event_logger(Arc::new(logger));
    }

    Ok(session)
}

async fn run(session: &ConversationSession, command: Command, json: bool) -> Result<String, SessionError> {
    match command {
        Command::List => {
            let conversations = session.load_conversations().await?;
            Ok(if json {
                ConsoleFormatter::json(&conversations)
            } else {
                ConsoleFormatter::conversation_list(&conversations)
            })
        }

        Command::Show { id } => {
            session.select_conversation(&id).await?;
            let state = session.state();
            let Some(conversation) = state.current_conversation.as_ref() else {
                return Err(SessionError::generic("Conversation not found"));
            };
            Ok(if json {
                ConsoleFormatter::json(&state)
            } else {
                ConsoleFormatter::conversation(conversation, &state.messages)
            })
        }

        Command::New { assistant_id, title } => {
            let conversation = session
                .create_conversation(&assistant_id, title.as_deref())
                .await?;
            Ok(if json {
                ConsoleFormatter::json(&conversation)
            } else {
                ConsoleFormatter::notice(&format!(
                    "Created conversation {} ({})",
                    conversation.id,
                    conversation.display_title()
                ))
            })
        }

        Command::Send {
            conversation_id,
            message,
        } => {
            if message.trim().is_empty() {
                return Err(SessionError::generic(DomainError::EmptyMessage.to_string()));
            }
            session.select_conversation(&conversation_id).await?;
            match session.send_message(&message).await? {
                Outcome::Completed(messages) => Ok(if json {
                    ConsoleFormatter::json(&messages)
                } else {
                    ConsoleFormatter::messages(&messages)
                }),
                other => Err(SessionError::generic(format!("Message was not sent: {:?}", other))),
            }
        }

        Command::Delete { id } => {
            session.delete_conversation(&id).await?;
            Ok(if json {
                ConsoleFormatter::json(&json!({ "deleted": id }))
            } else {
                ConsoleFormatter::notice(&format!("Deleted conversation {}", id))
            })
        }

        Command::Rename { id, title } => {
            let conversation = session.rename_conversation(&id, &title).await?;
            Ok(if json {
                ConsoleFormatter::json(&conversation)
            } else {
                ConsoleFormatter::notice(&format!(
                    "Renamed conversation {} to {}",
                    conversation.id,
                    conversation.display_title()
                ))
            })
        }
    }
}
