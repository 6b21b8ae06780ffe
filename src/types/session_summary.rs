use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// One row of the service's session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session identity.
    pub id: SessionId,

    /// The title, absent until the session is renamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Creation timestamp as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl SessionSummary {
    /// Create a summary with no title or timestamp.
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            created_at: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json};

    #[test]
    fn deserialize_listing() {
        let rows: Vec<SessionSummary> = from_value(json!([
            {"id": 3, "title": "Groceries", "created_at": "2024-05-01 10:00:00"},
            {"id": 2, "title": null, "created_at": "2024-04-30 09:00:00"},
            {"id": "x1"}
        ]))
        .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, SessionId::new("3"));
        assert_eq!(rows[0].title.as_deref(), Some("Groceries"));
        assert!(rows[1].title.is_none());
        assert!(rows[2].created_at.is_none());
    }
}
