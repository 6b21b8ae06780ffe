//! Slash command parsing for the chat application.
//!
//! Lines starting with `/` control the session list and menu instead of
//! being sent to the service.

use crate::menu::MenuAction;
use crate::types::{ExportFormat, SessionId};

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new, unsaved conversation.
    New,

    /// Show the session list.
    Sessions,

    /// Reload the session list from the service.
    Refresh,

    /// Open a saved session.
    Open(SessionId),

    /// Toggle the menu of a session; `None` closes any open menu.
    Menu(Option<SessionId>),

    /// Rename the targeted session.
    Rename(String),

    /// Delete the targeted session.
    Delete,

    /// Export the targeted session.
    Export(ExportFormat),

    /// Show the title of the current conversation.
    Title,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

impl ChatCommand {
    /// The menu action this command performs, if it is one.
    pub fn menu_action(&self) -> Option<MenuAction> {
        match self {
            ChatCommand::Rename(_) => Some(MenuAction::Rename),
            ChatCommand::Delete => Some(MenuAction::Delete),
            ChatCommand::Export(_) => Some(MenuAction::Export),
            _ => None,
        }
    }
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use chatstream::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/rename Trip plans").is_some());
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "sessions" | "ls" => ChatCommand::Sessions,
        "refresh" => ChatCommand::Refresh,
        "open" => match argument {
            Some(id) => ChatCommand::Open(SessionId::new(id)),
            None => ChatCommand::Invalid("/open requires a session id".to_string()),
        },
        "menu" => ChatCommand::Menu(argument.map(SessionId::new)),
        "rename" => match argument {
            Some(title) => ChatCommand::Rename(title.to_string()),
            None => ChatCommand::Invalid("/rename requires a title".to_string()),
        },
        "delete" | "rm" => ChatCommand::Delete,
        "export" => match argument {
            None => ChatCommand::Export(ExportFormat::default()),
            Some(arg) => match arg.parse::<ExportFormat>() {
                Ok(format) => ChatCommand::Export(format),
                Err(_) => ChatCommand::Invalid("/export expects 'text' or 'json'".to_string()),
            },
        },
        "title" => ChatCommand::Title,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new conversation
  /sessions              Show saved sessions
  /refresh               Reload saved sessions from the service
  /open <id>             Open a saved session
  /menu [<id>]           Toggle a session's menu (no argument closes it)
  /rename <title>        Rename the selected session
  /delete                Delete the selected session
  /export [text|json]    Download the selected session
  /title                 Show the current conversation's title
  /help                  Show this help message
  /quit                  Exit the chat

Rename, delete and export act on the session whose menu is open, or on the
current session when no menu is open."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/SESSIONS"), Some(ChatCommand::Sessions));
        assert_eq!(parse_command("/refresh"), Some(ChatCommand::Refresh));
        assert_eq!(
            parse_command("/open 42"),
            Some(ChatCommand::Open(SessionId::new("42")))
        );
        assert_eq!(
            parse_command("/open"),
            Some(ChatCommand::Invalid(
                "/open requires a session id".to_string()
            ))
        );
    }

    #[test]
    fn parse_menu() {
        assert_eq!(
            parse_command("/menu abc123"),
            Some(ChatCommand::Menu(Some(SessionId::new("abc123"))))
        );
        assert_eq!(parse_command("/menu"), Some(ChatCommand::Menu(None)));
    }

    #[test]
    fn parse_rename_keeps_inner_spaces() {
        assert_eq!(
            parse_command("/rename   Trip  plans  "),
            Some(ChatCommand::Rename("Trip  plans".to_string()))
        );
        assert!(matches!(
            parse_command("/rename"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_export() {
        assert_eq!(
            parse_command("/export"),
            Some(ChatCommand::Export(ExportFormat::Text))
        );
        assert_eq!(
            parse_command("/export json"),
            Some(ChatCommand::Export(ExportFormat::Json))
        );
        assert!(matches!(
            parse_command("/export pdf"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn menu_actions() {
        assert_eq!(
            ChatCommand::Rename("x".to_string()).menu_action(),
            Some(MenuAction::Rename)
        );
        assert_eq!(ChatCommand::Delete.menu_action(), Some(MenuAction::Delete));
        assert_eq!(
            ChatCommand::Export(ExportFormat::Json).menu_action(),
            Some(MenuAction::Export)
        );
        assert_eq!(ChatCommand::Title.menu_action(), None);
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/rename"));
        assert!(help.contains("/export"));
    }
}
