//! Interactive terminal client for a streaming chat service.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a service on localhost:8000
//! chatstream
//!
//! # Point at another service and reopen a saved session
//! chatstream --base-url http://chat.internal:8000 --session 42
//!
//! # Read settings from a file, disable colors
//! chatstream --config chatstream.yaml --no-color
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.
//!
//! # Commands
//!
//! - `/sessions` - Show saved sessions
//! - `/open <id>` - Open a saved session
//! - `/menu <id>` - Open a session's menu, then `/rename`, `/delete` or `/export`
//! - `/new` - Start a new conversation
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use chatstream::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, help_text, parse_command,
};
use chatstream::{ChatClient, MenuAction, MenuCommand, SessionCoordinator, SessionId};

/// Main entry point for the chatstream application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("chatstream [OPTIONS]");
    let config = ChatConfig::from_args(args)?;

    let client = ChatClient::with_options(config.base_url.clone(), Some(config.timeout))?;
    println!("Chat service: {}", client.base_url());
    let mut coordinator = SessionCoordinator::new(client).with_export_dir(&config.export_dir);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    let abort = coordinator.abort_handle();
    ctrlc::set_handler(move || {
        if abort.abort() {
            tracing::debug!("interrupt received; aborting reply");
        }
    })?;

    if let Err(err) = coordinator.refresh_sessions(&mut renderer).await {
        renderer.print_error(&format!("Failed to load sessions: {err}"));
    }
    if let Some(id) = config.initial_session.clone() {
        if let Err(err) = coordinator.open_session(&id, &mut renderer).await {
            renderer.print_error(&format!("Failed to open session {id}: {err}"));
        }
    } else {
        renderer.show_title(coordinator.current_title());
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if cmd == ChatCommand::Quit {
                        println!("Goodbye!");
                        break;
                    }
                    run_command(cmd, &mut coordinator, &mut renderer, &mut rl).await;
                    continue;
                }

                if let Err(e) = coordinator.submit(line, &mut renderer).await {
                    tracing::debug!(error = %e, "submission ended with an error");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

async fn run_command(
    cmd: ChatCommand,
    coordinator: &mut SessionCoordinator<ChatClient>,
    renderer: &mut PlainTextRenderer,
    rl: &mut DefaultEditor,
) {
    if let Some(action) = cmd.menu_action() {
        let Some(id) = select_target(coordinator, action, renderer) else {
            renderer.print_error("No session selected; open a menu with /menu <id> first.");
            return;
        };
        match cmd {
            ChatCommand::Rename(title) => {
                match coordinator.rename(&id, &title, renderer).await {
                    Ok(chatstream::RenameOutcome::Renamed) => {
                        renderer.print_info(&format!("Renamed session {id} to \"{title}\"."))
                    }
                    Ok(chatstream::RenameOutcome::Unchanged) => {
                        renderer.print_info("Title unchanged.")
                    }
                    Err(err) if err.is_validation() || err.is_not_found() => {
                        renderer.print_error(&err.to_string())
                    }
                    Err(_) => {}
                }
            }
            ChatCommand::Delete => {
                let mut confirm = |prompt: &str| {
                    println!("{prompt}");
                    match rl.readline("Delete? [y/N] ") {
                        Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
                        Err(_) => false,
                    }
                };
                match coordinator.delete(&id, &mut confirm, renderer).await {
                    Ok(Some(_)) => renderer.print_info(&format!("Deleted session {id}.")),
                    Ok(None) => renderer.print_info("Delete cancelled."),
                    Err(err) if err.is_not_found() => renderer.print_error(&err.to_string()),
                    Err(_) => {}
                }
            }
            ChatCommand::Export(format) => match coordinator.export(&id, format).await {
                Ok(path) => renderer.print_info(&format!("Saved {}", path.display())),
                Err(err) => renderer.print_error(&format!("Failed to export session: {err}")),
            },
            _ => {}
        }
        return;
    }

    match cmd {
        ChatCommand::New => coordinator.navigate_new(renderer),
        ChatCommand::Sessions => renderer.render_sidebar(coordinator.sidebar()),
        ChatCommand::Refresh => match coordinator.refresh_sessions(renderer).await {
            Ok(count) => renderer.print_info(&format!("{count} saved sessions.")),
            Err(err) => renderer.print_error(&format!("Failed to load sessions: {err}")),
        },
        ChatCommand::Open(id) => {
            if let Err(err) = coordinator.open_session(&id, renderer).await {
                renderer.print_error(&format!("Failed to open session {id}: {err}"));
            }
        }
        ChatCommand::Menu(Some(id)) => {
            coordinator.menu_command(MenuCommand::Toggle(id), renderer);
        }
        ChatCommand::Menu(None) => {
            coordinator.menu_command(MenuCommand::Dismiss, renderer);
        }
        ChatCommand::Title => renderer.show_title(coordinator.current_title()),
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Invalid(message) => renderer.print_error(&message),
        ChatCommand::Quit
        | ChatCommand::Rename(_)
        | ChatCommand::Delete
        | ChatCommand::Export(_) => {}
    }
}

/// Picks the session a menu action applies to, closing the open menu.
fn select_target(
    coordinator: &mut SessionCoordinator<ChatClient>,
    action: MenuAction,
    renderer: &mut PlainTextRenderer,
) -> Option<SessionId> {
    if coordinator.menu().open_session().is_some() {
        coordinator
            .menu_command(MenuCommand::Select(action), renderer)
            .map(|(_, id)| id)
    } else {
        coordinator.binding().session_id().cloned()
    }
}
