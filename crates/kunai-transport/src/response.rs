//! Normalized transport responses.

use kunai_rfc::dav::MultiStatus;

/// What a call site gets back from [`crate::Transport::send`].
#[derive(Debug, Clone)]
pub enum DavResponse {
    /// 200/201/204 with no meaningful body (some servers answer DELETE
    /// with 200).
    Ok { status: u16 },
    /// 207 parsed into the normalized entry list.
    MultiStatus(MultiStatus),
    /// A status from the caller's soft-fail set; the caller decides
    /// whether this aborts anything.
    SoftError { status: u16 },
}

impl DavResponse {
    /// The multistatus payload, if this is one.
    #[must_use]
    pub fn multi_status(&self) -> Option<&MultiStatus> {
        match self {
            Self::MultiStatus(ms) => Some(ms),
            _ => None,
        }
    }

    #[must_use]
    pub fn soft_error(&self) -> Option<u16> {
        match self {
            Self::SoftError { status } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}
