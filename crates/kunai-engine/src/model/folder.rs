//! Folder entity: one per remote collection.

use kunai_core::types::{AclMask, FolderKind, Version};
use serde::{Deserialize, Serialize};

/// One remote collection known to an account.
///
/// `href` is the primary identity within the account. `ctag` and `token`
/// are opaque change markers: any change in either means "remote
/// collection mutated since last sync"; an absent token forces full
/// enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    /// Server-relative collection path, unique per account.
    pub href: String,
    pub kind: FolderKind,
    pub scheme: String,
    pub fqdn: String,
    pub display_name: String,
    pub acl: AclMask,
    /// Reached through a proxy/group home-set rather than our own.
    pub shared: bool,
    pub color: Option<String>,
    /// Subscription source URL for `Ics` folders.
    pub source: Option<String>,
    pub ctag: Option<String>,
    pub token: Option<String>,
    /// Opaque handle to the external address-book/calendar object.
    pub target: Option<String>,
    pub download_only: bool,
    /// Engine version at folder creation; gates versioned field mappings.
    pub created_with: Version,
    /// Soft-deleted: absent from the last listing, target preserved.
    pub removed: bool,
}

impl Folder {
    #[must_use]
    pub fn new(href: impl Into<String>, kind: FolderKind, created_with: Version) -> Self {
        Self {
            href: href.into(),
            kind,
            scheme: "https".to_string(),
            fqdn: String::new(),
            display_name: String::new(),
            acl: AclMask::NONE,
            shared: false,
            color: None,
            source: None,
            ctag: None,
            token: None,
            target: None,
            download_only: false,
            created_with,
            removed: false,
        }
    }

    /// Clears both change markers, forcing the next remote phase to fully
    /// enumerate.
    pub fn reset_change_markers(&mut self) {
        self.ctag = None;
        self.token = None;
    }

    #[must_use]
    pub const fn writable(&self) -> bool {
        self.acl.contains(AclMask::MODIFY)
            || self.acl.contains(AclMask::CREATE)
            || self.acl.contains(AclMask::DELETE)
    }
}

/// Outcome of one folder-list pass, for the embedder to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}
