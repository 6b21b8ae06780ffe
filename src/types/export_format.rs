use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File format of a session export.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Human-readable plain text.
    #[default]
    Text,

    /// Structured JSON.
    Json,
}

impl ExportFormat {
    /// The value of the `format` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
        }
    }

    /// The file extension of a downloaded export.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid export format string.
#[derive(Debug)]
pub struct ExportFormatParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for ExportFormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown export format: {} (expected text or json)",
            self.invalid_value
        )
    }
}

impl std::error::Error for ExportFormatParseError {}

impl FromStr for ExportFormat {
    type Err = ExportFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportFormatParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}
