//! The sidebar of saved sessions.
//!
//! Entries are ordered most-recent-first and keyed by [`SessionId`]. Each
//! entry carries its committed title plus, while a rename is in flight, the
//! optimistically displayed title.

use crate::types::{SessionId, SessionSummary};

/// One sidebar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// The session identity.
    pub id: SessionId,
    title: String,
    pending_title: Option<String>,
}

impl SessionEntry {
    /// Create an entry titled after its id.
    pub fn new(id: SessionId) -> Self {
        let title = id.to_string();
        Self {
            id,
            title,
            pending_title: None,
        }
    }

    /// Create an entry with an explicit title.
    pub fn with_title(id: SessionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            pending_title: None,
        }
    }

    /// The title acknowledged by the service.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The title to display: a pending rename if any, else the committed title.
    pub fn display_title(&self) -> &str {
        self.pending_title.as_deref().unwrap_or(&self.title)
    }

    /// Returns true while a rename is awaiting the service.
    pub fn is_renaming(&self) -> bool {
        self.pending_title.is_some()
    }
}

impl From<SessionSummary> for SessionEntry {
    fn from(summary: SessionSummary) -> Self {
        match summary.title.filter(|t| !t.trim().is_empty()) {
            Some(title) => Self::with_title(summary.id, title),
            None => Self::new(summary.id),
        }
    }
}

/// In-memory session list backing the sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionList {
    entries: Vec<SessionEntry>,
}

impl SessionList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from the service's listing, keeping its order and
    /// dropping repeated ids.
    pub fn from_summaries(summaries: Vec<SessionSummary>) -> Self {
        let mut list = Self::new();
        for summary in summaries {
            if !list.contains(&summary.id) {
                list.entries.push(SessionEntry::from(summary));
            }
        }
        list
    }

    /// Inserts a new entry titled after its id at the front.
    ///
    /// Returns false, leaving the list unchanged, if the id is already listed.
    pub fn insert_front(&mut self, id: SessionId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.entries.insert(0, SessionEntry::new(id));
        true
    }

    /// Returns the entry for `id`.
    pub fn get(&self, id: &SessionId) -> Option<&SessionEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    fn get_mut(&mut self, id: &SessionId) -> Option<&mut SessionEntry> {
        self.entries.iter_mut().find(|e| &e.id == id)
    }

    /// Returns true if `id` is listed.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.get(id).is_some()
    }

    /// Displays `title` for `id` until the rename is committed or rolled back.
    pub fn begin_rename(&mut self, id: &SessionId, title: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.pending_title = Some(title.into());
                true
            }
            None => false,
        }
    }

    /// Makes `title` the committed title of `id`.
    pub fn commit_rename(&mut self, id: &SessionId, title: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.title = title.into();
                entry.pending_title = None;
                true
            }
            None => false,
        }
    }

    /// Drops the pending title of `id`, restoring the committed one.
    pub fn rollback_rename(&mut self, id: &SessionId) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.pending_title = None;
                true
            }
            None => false,
        }
    }

    /// Removes and returns the entry for `id`.
    pub fn remove(&mut self, id: &SessionId) -> Option<SessionEntry> {
        let index = self.entries.iter().position(|e| &e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Iterates entries most-recent-first.
    pub fn iter(&self) -> impl Iterator<Item = &SessionEntry> {
        self.entries.iter()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no sessions are listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SessionId {
        SessionId::new(s)
    }

    #[test]
    fn insert_front_is_most_recent_first() {
        let mut list = SessionList::new();
        assert!(list.insert_front(id("a")));
        assert!(list.insert_front(id("b")));
        assert!(!list.insert_front(id("a")));
        let ids: Vec<_> = list.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(list.get(&id("a")).map(|e| e.title()), Some("a"));
    }

    #[test]
    fn rename_commit_and_rollback() {
        let mut list = SessionList::new();
        list.insert_front(id("s1"));

        assert!(list.begin_rename(&id("s1"), "Plans"));
        let entry = list.get(&id("s1")).unwrap();
        assert_eq!(entry.display_title(), "Plans");
        assert_eq!(entry.title(), "s1");
        assert!(entry.is_renaming());

        assert!(list.rollback_rename(&id("s1")));
        assert_eq!(list.get(&id("s1")).unwrap().display_title(), "s1");

        list.begin_rename(&id("s1"), "Plans");
        assert!(list.commit_rename(&id("s1"), "Plans"));
        let entry = list.get(&id("s1")).unwrap();
        assert_eq!(entry.title(), "Plans");
        assert!(!entry.is_renaming());
    }

    #[test]
    fn operations_on_missing_ids_are_no_ops() {
        let mut list = SessionList::new();
        assert!(!list.begin_rename(&id("x"), "t"));
        assert!(!list.commit_rename(&id("x"), "t"));
        assert!(!list.rollback_rename(&id("x")));
        assert!(list.remove(&id("x")).is_none());
    }

    #[test]
    fn from_summaries_defaults_titles_to_ids() {
        let list = SessionList::from_summaries(vec![
            SessionSummary::new("2").with_title("Recipes"),
            SessionSummary::new("1"),
            SessionSummary::new("1").with_title("dup"),
            SessionSummary::new("0").with_title("   "),
        ]);
        let titles: Vec<_> = list.iter().map(|e| e.display_title()).collect();
        assert_eq!(titles, vec!["Recipes", "1", "0"]);
    }
}
