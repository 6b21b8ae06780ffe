use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Body of a message submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,

    /// The bound session, omitted for the first message of a conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl ChatRequest {
    /// Create a request for `message`, continuing `session_id` when bound.
    pub fn new(message: impl Into<String>, session_id: Option<SessionId>) -> Self {
        Self {
            message: message.into(),
            session_id,
        }
    }
}
