/// How the service answered a session delete.
///
/// Both outcomes mean the session no longer exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The service deleted the session.
    Deleted,

    /// The service reported the session as not found.
    AlreadyGone,
}
