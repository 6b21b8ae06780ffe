//! Terminal chat application support.
//!
//! This module holds the pieces the `chatstream` binary is assembled from:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//!
//! Rendering lives in [`crate::render`] and session state in
//! [`crate::coordinator`].

mod commands;
mod config;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ConfigFile};
