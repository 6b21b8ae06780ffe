// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod coordinator;
pub mod decoder;
pub mod error;
pub mod menu;
pub mod observability;
pub mod render;
pub mod reply;
pub mod session_list;
pub mod transcript;
pub mod types;

// Re-exports
pub use backend::ChatBackend;
pub use client::ChatClient;
pub use coordinator::{
    AbortHandle, Confirm, PendingDelete, PendingRename, RenameOutcome, SessionBinding,
    SessionCoordinator,
};
pub use decoder::{ByteStream, LineDecoder, MAX_LINE_BYTES, process_ndjson};
pub use error::{Error, Result};
pub use menu::{MenuAction, MenuCommand, MenuState};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer, SidebarView};
pub use reply::{PendingStream, ReplyOutcome};
pub use session_list::{SessionEntry, SessionList};
pub use transcript::{OpenEntry, Transcript, TranscriptEntry};
pub use types::*;
