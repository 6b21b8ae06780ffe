//! The conversation transcript.
//!
//! A transcript is append-only. The one exception is the assistant entry of
//! the reply currently streaming in: it grows in place through an
//! [`OpenEntry`] handle, and becomes immutable once that handle is dropped.

use serde::{Deserialize, Serialize};

use crate::types::{MessageRole, SessionRecord};

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who wrote the message.
    pub role: MessageRole,
    /// The message text.
    pub text: String,
}

impl TranscriptEntry {
    /// Create a new entry.
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Handle to the assistant entry a stream is writing into.
///
/// Only the transcript can create one, and it cannot be cloned, so at most
/// one writer exists for any entry.
#[derive(Debug, PartialEq, Eq)]
pub struct OpenEntry {
    index: usize,
}

impl OpenEntry {
    /// Position of the entry in the transcript.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Ordered messages shown for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the transcript of a stored session.
    pub fn from_record(record: &SessionRecord) -> Self {
        let entries = record
            .messages
            .iter()
            .map(|m| TranscriptEntry::new(m.role, m.message.clone()))
            .collect();
        Self { entries }
    }

    /// Appends a user message.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries
            .push(TranscriptEntry::new(MessageRole::User, text));
    }

    /// Appends an empty assistant entry and returns the handle that grows it.
    pub fn open_assistant(&mut self) -> OpenEntry {
        self.entries
            .push(TranscriptEntry::new(MessageRole::Assistant, String::new()));
        OpenEntry {
            index: self.entries.len() - 1,
        }
    }

    /// Appends `text` to the open entry and returns the entry's full text.
    pub fn extend(&mut self, entry: &OpenEntry, text: &str) -> &str {
        let target = &mut self.entries[entry.index];
        target.text.push_str(text);
        &target.text
    }

    /// Returns the entries in conversation order.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Returns the most recent entry.
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the transcript holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionId, StoredMessage};

    #[test]
    fn open_entry_grows_in_place() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hello");
        let entry = transcript.open_assistant();
        assert_eq!(entry.index(), 1);
        assert_eq!(transcript.extend(&entry, "Hi"), "Hi");
        assert_eq!(transcript.extend(&entry, " there"), "Hi there");
        assert_eq!(
            transcript.entries(),
            &[
                TranscriptEntry::new(MessageRole::User, "Hello"),
                TranscriptEntry::new(MessageRole::Assistant, "Hi there"),
            ]
        );
    }

    #[test]
    fn from_record_keeps_order() {
        let record = SessionRecord {
            id: SessionId::new("4"),
            title: None,
            created_at: None,
            messages: vec![
                StoredMessage {
                    role: MessageRole::User,
                    message: "one".to_string(),
                    created_at: None,
                },
                StoredMessage {
                    role: MessageRole::Assistant,
                    message: "two".to_string(),
                    created_at: None,
                },
            ],
        };
        let transcript = Transcript::from_record(&record);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().map(|e| e.text.as_str()), Some("two"));
    }
}
