use serde::{Deserialize, Serialize};

/// Body of a session rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRequest {
    /// The new title.
    pub title: String,
}

impl RenameRequest {
    /// Create a rename request.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}
