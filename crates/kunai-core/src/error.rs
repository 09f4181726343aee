use thiserror::Error;

/// Machine-readable classification of a sync failure.
///
/// Every terminal error surfaced by the engine carries one of these kinds;
/// the string form (`code()`) is what an embedder's event log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Connect, TLS, or timeout failure before a usable response.
    Network,
    /// 401 retries exhausted.
    Authentication,
    /// Unparseable XML or a missing expected node.
    MalformedResponse,
    /// An HTTP status nobody whitelisted.
    Status,
    /// CTAG kept changing past the stabilization bound.
    UnstableCtag,
    /// The server rejected a local mutation on permission grounds.
    Permission,
    /// A collaborator (store, target) failed.
    Store,
}

impl SyncErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "network-error",
            Self::Authentication => "auth-failed",
            Self::MalformedResponse => "malformed-response",
            Self::Status => "unexpected-status",
            Self::UnstableCtag => "could-not-get-stable-ctag",
            Self::Permission => "permission-denied",
            Self::Store => "store-error",
        }
    }
}

impl std::fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A terminal sync failure: machine code plus a human diagnostic.
///
/// `detail` carries the raw protocol exchange (request and response dump)
/// when one exists, for the embedder's event log. It never feeds back into
/// control flow.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct SyncError {
    pub kind: SyncErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl SyncError {
    #[must_use]
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Network, message)
    }

    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Authentication, message)
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::MalformedResponse, message)
    }

    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            SyncErrorKind::Status,
            format!("HTTP {status}: {}", message.into()),
        )
    }

    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Store, message)
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
