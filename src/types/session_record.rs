use serde::{Deserialize, Serialize};

use crate::types::{MessageRole, SessionId};

/// A stored message as returned by the session endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Who wrote the message.
    pub role: MessageRole,

    /// The message text.
    pub message: String,

    /// Creation timestamp as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A stored session with its full history (the JSON export).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The session identity.
    pub id: SessionId,

    /// The title, absent until the session is renamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Creation timestamp as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Messages in conversation order.
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}
