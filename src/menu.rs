//! Per-session action menu state.
//!
//! At most one session's menu is open at a time. Commands move the state
//! explicitly; selecting an action closes the menu and yields the action
//! together with the session it targets.

use std::fmt;
use std::str::FromStr;

use crate::types::SessionId;

/// An action offered by a session's menu.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MenuAction {
    /// Download the session.
    Export,
    /// Change the session's title.
    Rename,
    /// Delete the session.
    Delete,
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuAction::Export => write!(f, "export"),
            MenuAction::Rename => write!(f, "rename"),
            MenuAction::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for MenuAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "export" => Ok(MenuAction::Export),
            "rename" => Ok(MenuAction::Rename),
            "delete" => Ok(MenuAction::Delete),
            _ => Err(format!("unknown menu action: {s}")),
        }
    }
}

/// A discrete input to the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    /// Open the menu of a session, or close it if it is already open.
    Toggle(SessionId),
    /// Pick an action from the open menu.
    Select(MenuAction),
    /// Close whatever menu is open.
    Dismiss,
}

/// Which session's menu, if any, is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MenuState {
    /// No menu is open.
    #[default]
    Closed,
    /// The menu of this session is open.
    Open(SessionId),
}

impl MenuState {
    /// Applies `command`, returning the selected action and its target.
    pub fn apply(&mut self, command: MenuCommand) -> Option<(MenuAction, SessionId)> {
        match command {
            MenuCommand::Toggle(id) => {
                *self = if self.is_open_for(&id) {
                    MenuState::Closed
                } else {
                    MenuState::Open(id)
                };
                None
            }
            MenuCommand::Select(action) => match std::mem::take(self) {
                MenuState::Open(id) => Some((action, id)),
                MenuState::Closed => None,
            },
            MenuCommand::Dismiss => {
                *self = MenuState::Closed;
                None
            }
        }
    }

    /// Returns the session whose menu is open.
    pub fn open_session(&self) -> Option<&SessionId> {
        match self {
            MenuState::Open(id) => Some(id),
            MenuState::Closed => None,
        }
    }

    /// Returns true if the menu of `id` is open.
    pub fn is_open_for(&self, id: &SessionId) -> bool {
        self.open_session() == Some(id)
    }
}
