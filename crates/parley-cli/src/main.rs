//! parley - terminal client for the chat widget backend

mod commands;
mod config;
mod render;
mod session_file;

use anyhow::Context;
use clap::Parser;
use commands::Command;
use parley_api::{ApiClient, ErrorKind};
use parley_sync::{
    Session, SyncController, WsChannel, bootstrap_session, start_new_conversation,
};
use session_file::SessionFile;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// parley - chat with a support agent from the terminal
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the chat API
    #[arg(long)]
    api_url: Option<String>,

    /// Push channel URL (defaults to the API URL)
    #[arg(long)]
    socket_url: Option<String>,

    /// Messages per history page
    #[arg(long)]
    page_size: Option<u32>,

    /// Open this conversation instead of the remembered one
    #[arg(long, conflicts_with = "new")]
    conversation: Option<String>,

    /// Start a new conversation
    #[arg(long)]
    new: bool,

    /// Session file (defaults to the user data directory)
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("parley=debug,parley_api=debug,parley_sync=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Merge config with CLI args (CLI takes precedence)
    let cfg = config::Config::load();
    let api_url = args.api_url.unwrap_or_else(|| cfg.api_base_url());
    let socket_url = args
        .socket_url
        .or(cfg.socket_url.clone())
        .unwrap_or_else(|| api_url.clone());
    let mut sync_config = cfg.sync_config();
    if let Some(size) = args.page_size {
        sync_config.page_size = size;
    }

    let api = Arc::new(ApiClient::new(&api_url).context("Invalid API URL")?);

    let session_file = SessionFile::new(args.session_file.unwrap_or_else(SessionFile::default_path));
    let mut persisted = session_file.load();
    if args.new {
        persisted.conversation_id = None;
    } else if let Some(id) = args.conversation {
        persisted.conversation_id = Some(id);
    }

    let session = bootstrap_session(api.as_ref(), &persisted)
        .await
        .context("Failed to start a chat session")?;
    remember(&session_file, &session);

    let channel = Arc::new(
        WsChannel::new(&socket_url, cfg.reconnect_config()).context("Invalid socket URL")?,
    );
    let controller = SyncController::new(sync_config, api.clone(), channel)?;

    open_conversation(&controller, &session.conversation_id).await;
    if let Some(error) = controller.view().error {
        eprintln!("error: {}", error);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("parley conversation: {}", session.conversation_id);
        eprintln!("Type /help for commands.");
    }

    let result = run_interactive(&controller, &api, session, &session_file).await;
    controller.close().await;
    result
}

/// Switch the controller to `conversation_id` and print what was loaded.
/// Failures are left in the view and on the event stream.
async fn open_conversation(controller: &SyncController, conversation_id: &str) {
    if let Err(e) = controller
        .set_conversation(Some(conversation_id.to_string()))
        .await
    {
        tracing::debug!("Opening {} failed: {}", conversation_id, e);
    }
    let view = controller.view();
    if !view.messages.is_empty() {
        println!("{}", render::format_history(view.messages.iter()));
    }
    if view.has_more {
        println!("({} older messages, /more to load)", view.total - view.messages.len());
    }
}

fn remember(session_file: &SessionFile, session: &Session) {
    if let Err(e) = session_file.save(&session.to_persisted()) {
        tracing::warn!(
            "Failed to save session to {}: {}",
            session_file.path().display(),
            e
        );
    }
}

/// Print validation errors; other failures already reached the event stream.
fn report(result: parley_sync::Result<()>) {
    if let Err(e) = result {
        if e.kind() == ErrorKind::Validation {
            eprintln!("{}", e);
        } else {
            tracing::debug!("Operation failed: {}", e);
        }
    }
}

async fn run_interactive(
    controller: &SyncController,
    api: &ApiClient,
    mut session: Session,
    session_file: &SessionFile,
) -> anyhow::Result<()> {
    let mut events = Box::pin(controller.event_stream());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // EOF
                    break;
                };
                let Some(command) = commands::parse(&line) else {
                    continue;
                };
                match command {
                    Command::Send(text) => report(controller.send_user_message(&text).await),
                    Command::More => {
                        let before = controller.view();
                        if !before.has_more {
                            println!("No older messages.");
                            continue;
                        }
                        report(controller.load_more_messages().await);
                        let after = controller.view();
                        // Older messages land behind the previously oldest one
                        let start = before
                            .messages
                            .last()
                            .and_then(|oldest| after.messages.iter().position(|m| m.id == oldest.id))
                            .map_or(0, |pos| pos + 1);
                        let text = render::format_history(after.messages[start..].iter());
                        if !text.is_empty() {
                            println!("{}", text);
                        }
                    }
                    Command::Edit { id, content } => {
                        match controller.edit_message(&id, &content).await {
                            Ok(message) => println!("{}", render::format_message(&message)),
                            Err(e) => report(Err(e)),
                        }
                    }
                    Command::Delete(id) => match controller.remove_message(&id).await {
                        Ok(()) => println!("Deleted {}.", id),
                        Err(e) => report(Err(e)),
                    },
                    Command::Typing(is_typing) => report(controller.emit_typing(is_typing).await),
                    Command::New => match start_new_conversation(api, &session.user_id).await {
                        Ok(fresh) => {
                            session = fresh;
                            remember(session_file, &session);
                            println!("Started conversation {}", session.conversation_id);
                            open_conversation(controller, &session.conversation_id).await;
                        }
                        Err(e) => eprintln!("Could not start a new conversation: {}", e),
                    },
                    Command::Help => println!("{}", commands::help_message()),
                    Command::Quit => break,
                    Command::Usage(usage) => println!("Usage: {}", usage),
                    Command::Unknown(cmd) => {
                        println!("Unknown command: /{}", cmd);
                        println!("Type /help for available commands.");
                    }
                }
            }
            Some(event) = events.next() => {
                if let Some(line) = render::format_event(&event) {
                    println!("{}", line);
                }
            }
        }
    }

    Ok(())
}
