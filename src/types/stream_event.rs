use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// One newline-delimited record of a streamed reply.
///
/// Records are tagged by their `type` field. Types this client does not know
/// deserialize to [`StreamEvent::Unknown`] so newer services keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Incremental assistant text.
    #[serde(rename = "chunk")]
    Chunk {
        /// Text to append to the assistant's reply.
        data: String,
    },

    /// The reply is complete and stored under `session_id`.
    #[serde(rename = "done")]
    Done {
        /// Identity of the session the exchange was stored in.
        session_id: SessionId,
    },

    /// A record type this client does not understand.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Create a chunk event.
    pub fn chunk(data: impl Into<String>) -> Self {
        StreamEvent::Chunk { data: data.into() }
    }

    /// Create a done event.
    pub fn done(session_id: impl Into<SessionId>) -> Self {
        StreamEvent::Done {
            session_id: session_id.into(),
        }
    }
}
