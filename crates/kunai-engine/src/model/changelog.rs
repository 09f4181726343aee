//! Change-log entries and the collapse rule.

use kunai_core::types::ChangeStatus;

/// One pending mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub href: String,
    pub status: ChangeStatus,
}

impl ChangeEntry {
    #[must_use]
    pub fn new(href: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            href: href.into(),
            status,
        }
    }
}

/// Collapses a new local status onto an existing one, keeping at most one
/// outstanding `_by_user` entry per item.
///
/// `None` means the entry disappears entirely (an item added and then
/// deleted locally never existed as far as the server is concerned).
/// Server-side statuses are bookkeeping and always replace.
#[must_use]
pub fn collapse(previous: Option<ChangeStatus>, new: ChangeStatus) -> Option<ChangeStatus> {
    use ChangeStatus as S;

    let Some(previous) = previous else {
        return Some(new);
    };

    if !new.is_local() || !previous.is_local() {
        return Some(new);
    }

    match (previous, new) {
        // Still unknown to the server, stays an add.
        (S::AddedByUser, S::ModifiedByUser) => Some(S::AddedByUser),
        // Added then deleted before any upload: nothing to tell anyone.
        (S::AddedByUser, S::DeletedByUser) => None,
        (_, new) => Some(new),
    }
}
