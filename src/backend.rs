//! The service operations the session coordinator depends on.

use bytes::Bytes;

use crate::decoder::ByteStream;
use crate::error::Result;
use crate::types::{
    ChatRequest, DeleteOutcome, ExportFormat, RenameRequest, SessionId, SessionRecord,
    SessionSummary,
};

/// A chat service.
///
/// [`ChatClient`](crate::ChatClient) implements this over HTTP; tests
/// substitute in-memory fakes.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submits a message and returns the raw body of the streamed reply.
    ///
    /// A non-success status is returned as an error before any body is read.
    async fn send_message(&self, request: &ChatRequest) -> Result<ByteStream>;

    /// Lists saved sessions.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// Fetches a saved session with its messages.
    async fn load_session(&self, id: &SessionId) -> Result<SessionRecord>;

    /// Renames a session.
    async fn rename_session(&self, id: &SessionId, request: &RenameRequest) -> Result<()>;

    /// Deletes a session. A not-found answer is [`DeleteOutcome::AlreadyGone`].
    async fn delete_session(&self, id: &SessionId) -> Result<DeleteOutcome>;

    /// Downloads a session export.
    async fn export_session(&self, id: &SessionId, format: ExportFormat) -> Result<Bytes>;
}
