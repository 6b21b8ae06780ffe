//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ChatConfig`]. Command-line flags
//! override the file, which overrides the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::SessionId;

/// Default timeout for connecting and for non-streaming requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the chatstream tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat service.
    #[arrrg(optional, "Chat service URL (default: $CHATSTREAM_BASE_URL or http://localhost:8000/)", "URL")]
    pub base_url: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "Read settings from a YAML file", "PATH")]
    pub config: Option<String>,

    /// Directory exports are written to.
    #[arrrg(optional, "Directory for exported sessions (default: .)", "DIR")]
    pub export_dir: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Session to open at startup.
    #[arrrg(optional, "Open this saved session at startup", "ID")]
    pub session: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Settings read from a YAML configuration file.
///
/// ```yaml
/// base_url: http://chat.internal:8000/
/// export_dir: ~/exports
/// timeout_secs: 30
/// color: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Base URL of the chat service.
    pub base_url: Option<String>,
    /// Directory exports are written to.
    pub export_dir: Option<PathBuf>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Whether to style output.
    pub color: Option<bool>,
}

impl ConfigFile {
    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        Self::parse(&contents)
    }

    /// Parses configuration from YAML text.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// the configuration file and command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the service; `None` defers to the environment.
    pub base_url: Option<String>,

    /// Directory exports are written to.
    pub export_dir: PathBuf,

    /// Timeout for connecting and for non-streaming requests.
    pub timeout: Duration,

    /// Session to open at startup.
    pub initial_session: Option<SessionId>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: from the environment
    /// - Export directory: the current directory
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: None,
            export_dir: PathBuf::from("."),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            initial_session: None,
            use_color: true,
        }
    }

    /// Resolves the configuration from command-line arguments, reading the
    /// configuration file they name first.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Self::new().with_file(ConfigFile::load(path)?)?,
            None => Self::new(),
        };
        config.with_args(args)
    }

    /// Applies the settings of a configuration file.
    pub fn with_file(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(base_url) = file.base_url {
            self.base_url = Some(base_url);
        }
        if let Some(export_dir) = file.export_dir {
            self.export_dir = export_dir;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = timeout_from_secs(secs, "timeout_secs")?;
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        Ok(self)
    }

    /// Applies command-line arguments.
    pub fn with_args(mut self, args: ChatArgs) -> Result<Self> {
        if let Some(secs) = args.timeout_secs {
            self.timeout = timeout_from_secs(secs, "timeout-secs")?;
        }
        if let Some(base_url) = args.base_url {
            self.base_url = Some(base_url);
        }
        if let Some(export_dir) = args.export_dir {
            self.export_dir = PathBuf::from(export_dir);
        }
        if let Some(session) = args.session {
            self.initial_session = Some(SessionId::new(session));
        }
        if args.no_color {
            self.use_color = false;
        }
        Ok(self)
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the export directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the session to open at startup.
    pub fn with_initial_session(mut self, id: SessionId) -> Self {
        self.initial_session = Some(id);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

/// A zero timeout would fail every connection attempt.
fn timeout_from_secs(secs: u64, param: &str) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::validation(
            "timeout must be at least one second",
            Some(param.to_string()),
        ));
    }
    Ok(Duration::from_secs(secs))
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
