//! Output rendering for the chat client.
//!
//! The coordinator owns all state; renderers only project it. This module
//! provides the [`Renderer`] trait and a plain-text implementation with
//! optional ANSI styling.

use std::io::{self, Stdout, Write};

use crate::menu::{MenuAction, MenuState};
use crate::session_list::SessionList;
use crate::transcript::Transcript;
use crate::types::{MessageRole, SessionId};

/// ANSI escape code for dim text (used for informational output).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for the title label).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the current session).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for open menus).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Everything needed to draw the sidebar.
#[derive(Debug, Clone, Copy)]
pub struct SidebarView<'a> {
    /// Saved sessions, most recent first.
    pub sessions: &'a SessionList,
    /// The session being viewed, if bound.
    pub current: Option<&'a SessionId>,
    /// The menu state.
    pub menu: &'a MenuState,
}

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording renderers in tests
pub trait Renderer: Send {
    /// Called when the assistant entry of a reply is created.
    fn start_reply(&mut self) {}

    /// Print a chunk of reply text.
    ///
    /// This is called for every chunk as it is applied to the transcript.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply stream ends.
    fn finish_response(&mut self);

    /// Called when the reply stream is aborted by the user.
    fn print_interrupted(&mut self) {}

    /// Update the title label of the conversation being viewed.
    fn show_title(&mut self, title: &str) {
        _ = title;
    }

    /// Redraw the sidebar.
    fn render_sidebar(&mut self, sidebar: SidebarView<'_>) {
        _ = sidebar;
    }

    /// Redraw the whole transcript, e.g. after opening a saved session.
    fn render_transcript(&mut self, transcript: &Transcript) {
        _ = transcript;
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    line_start: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            line_start: true,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn end_line(&mut self) {
        if !self.line_start {
            println!();
            self.line_start = true;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_reply(&mut self) {
        self.end_line();
        print!("Assistant: ");
        self.line_start = false;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        if !text.is_empty() {
            self.line_start = text.ends_with('\n');
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_line();
        eprintln!("{}", self.styled(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_info(&mut self, info: &str) {
        self.end_line();
        println!("{}", self.styled(ANSI_DIM, info));
        self.flush();
    }

    fn finish_response(&mut self) {
        self.end_line();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.end_line();
        println!("[interrupted]");
        self.flush();
    }

    fn show_title(&mut self, title: &str) {
        self.end_line();
        println!("{}", self.styled(ANSI_BOLD, &format!("== {title} ==")));
        self.flush();
    }

    fn render_sidebar(&mut self, sidebar: SidebarView<'_>) {
        self.end_line();
        for line in sidebar_lines(sidebar) {
            let styled = match line.style {
                LineStyle::Plain => line.text,
                LineStyle::Current => self.styled(ANSI_CYAN, &line.text),
                LineStyle::Menu => self.styled(ANSI_YELLOW, &line.text),
            };
            println!("{styled}");
        }
        self.flush();
    }

    fn render_transcript(&mut self, transcript: &Transcript) {
        self.end_line();
        for entry in transcript.entries() {
            let label = match entry.role {
                MessageRole::User => "You",
                MessageRole::Assistant => "Assistant",
            };
            println!("{label}: {}", entry.text);
        }
        self.flush();
    }
}

enum LineStyle {
    Plain,
    Current,
    Menu,
}

struct SidebarLine {
    text: String,
    style: LineStyle,
}

fn sidebar_lines(sidebar: SidebarView<'_>) -> Vec<SidebarLine> {
    if sidebar.sessions.is_empty() {
        return vec![SidebarLine {
            text: "Sessions: (none)".to_string(),
            style: LineStyle::Plain,
        }];
    }
    let mut lines = vec![SidebarLine {
        text: "Sessions:".to_string(),
        style: LineStyle::Plain,
    }];
    for entry in sidebar.sessions.iter() {
        let is_current = sidebar.current == Some(&entry.id);
        let marker = if is_current { '*' } else { ' ' };
        let mut text = format!("  {marker} [{}] {}", entry.id, entry.display_title());
        if entry.is_renaming() {
            text.push_str(" (saving)");
        }
        lines.push(SidebarLine {
            text,
            style: if is_current {
                LineStyle::Current
            } else {
                LineStyle::Plain
            },
        });
        if sidebar.menu.is_open_for(&entry.id) {
            let actions = [MenuAction::Export, MenuAction::Rename, MenuAction::Delete]
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" | ");
            lines.push(SidebarLine {
                text: format!("      {actions}"),
                style: LineStyle::Menu,
            });
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.styled(ANSI_RED, "x"), "x");
    }

    #[test]
    fn sidebar_marks_current_and_menu() {
        let mut sessions = SessionList::new();
        sessions.insert_front(SessionId::new("a"));
        sessions.insert_front(SessionId::new("b"));
        sessions.begin_rename(&SessionId::new("a"), "Alpha");
        let current = SessionId::new("b");
        let menu = MenuState::Open(SessionId::new("a"));
        let lines: Vec<String> = sidebar_lines(SidebarView {
            sessions: &sessions,
            current: Some(&current),
            menu: &menu,
        })
        .into_iter()
        .map(|l| l.text)
        .collect();
        assert_eq!(
            lines,
            vec![
                "Sessions:".to_string(),
                "  * [b] b".to_string(),
                "    [a] Alpha (saving)".to_string(),
                "      export | rename | delete".to_string(),
            ]
        );
    }

    #[test]
    fn empty_sidebar() {
        let sessions = SessionList::new();
        let lines = sidebar_lines(SidebarView {
            sessions: &sessions,
            current: None,
            menu: &MenuState::Closed,
        });
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Sessions: (none)");
    }
}
