//! Account entity and service-provider presets.

use kunai_core::types::FolderKind;
use serde::{Deserialize, Serialize};

/// Known service providers with fixed entry points or quirks.
///
/// Behavior keys off the quirk accessors, not the preset name, so a new
/// provider with the same quirk reuses the same code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreset {
    /// Discover via RFC 6764 from the account host.
    #[default]
    Generic,
    Fruux,
    ICloud,
    Yahoo,
    Gmx,
}

impl ProviderPreset {
    /// Root URL the discovery state machine starts from.
    #[must_use]
    pub fn root_url(self, kind: FolderKind, host: &str) -> String {
        let label = match kind {
            FolderKind::CalDav | FolderKind::Ics => "caldav",
            FolderKind::CardDav => "carddav",
        };
        match self {
            Self::Generic => format!("{label}6764://{host}"),
            Self::Fruux => "https://dav.fruux.com".to_string(),
            Self::ICloud => match kind {
                FolderKind::CalDav | FolderKind::Ics => {
                    "https://caldav.icloud.com".to_string()
                }
                FolderKind::CardDav => "https://contacts.icloud.com".to_string(),
            },
            Self::Yahoo => match kind {
                FolderKind::CalDav | FolderKind::Ics => {
                    "https://caldav.calendar.yahoo.com".to_string()
                }
                FolderKind::CardDav => "https://carddav.address.yahoo.com".to_string(),
            },
            Self::Gmx => format!("{label}6764://{host}"),
        }
    }

    /// Whether collections missing privilege data still get read access.
    /// iCloud omits `current-user-privilege-set` entirely.
    #[must_use]
    pub const fn default_read_acl(self) -> bool {
        matches!(self, Self::ICloud)
    }

    /// Whether the host is known to need the pre-emptive Basic header
    /// from the first request on.
    #[must_use]
    pub const fn pre_flagged_auth(self) -> bool {
        matches!(self, Self::Yahoo)
    }
}

/// One configured DAV account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Bare host for RFC 6764 bootstrap, or a full entry URL.
    pub host: String,
    pub scheme: String,
    pub username: String,
    pub provider: ProviderPreset,
    /// When off, mailing-list reconciliation is skipped entirely.
    pub sync_groups: bool,
    /// Default for newly-created folders.
    pub download_only_default: bool,
}

impl Account {
    #[must_use]
    pub fn new(id: impl Into<String>, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            scheme: "https".to_string(),
            username: username.into(),
            provider: ProviderPreset::Generic,
            sync_groups: true,
            download_only_default: false,
        }
    }
}
