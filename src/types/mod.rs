// Public modules
pub mod chat_request;
pub mod delete_outcome;
pub mod export_format;
pub mod message_role;
pub mod rename_request;
pub mod session_id;
pub mod session_record;
pub mod session_summary;
pub mod stream_event;

// Re-exports
pub use chat_request::ChatRequest;
pub use delete_outcome::DeleteOutcome;
pub use export_format::{ExportFormat, ExportFormatParseError};
pub use message_role::MessageRole;
pub use rename_request::RenameRequest;
pub use session_id::SessionId;
pub use session_record::{SessionRecord, StoredMessage};
pub use session_summary::SessionSummary;
pub use stream_event::StreamEvent;
