use serde::{Deserialize, Serialize};

/// What kind of remote collection a folder mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    CalDav,
    CardDav,
    /// Read-only subscribed calendar; sync is delegated to the calendar
    /// engine, kunai only tracks the folder entity.
    Ics,
}

impl FolderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CalDav => "caldav",
            Self::CardDav => "carddav",
            Self::Ics => "ics",
        }
    }
}

impl std::fmt::Display for FolderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder permission bitmask derived from `current-user-privilege-set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AclMask(pub u8);

impl AclMask {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(0x1);
    pub const MODIFY: Self = Self(0x2);
    pub const CREATE: Self = Self(0x4);
    pub const DELETE: Self = Self(0x8);
    pub const ALL: Self = Self(0xF);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn readable(self) -> bool {
        self.contains(Self::READ)
    }
}

impl std::ops::BitOr for AclMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for AclMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// State of a pending change-log entry.
///
/// `_ByUser` entries await upload; `_ByServer` entries are bookkeeping for
/// mutations the engine itself applied during a remote phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    AddedByUser,
    ModifiedByUser,
    DeletedByUser,
    AddedByServer,
    ModifiedByServer,
    DeletedByServer,
}

impl ChangeStatus {
    /// Whether this entry represents a local mutation awaiting upload.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(
            self,
            Self::AddedByUser | Self::ModifiedByUser | Self::DeletedByUser
        )
    }
}

/// Engine version, used to gate mapped fields per folder creation version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version(pub u16, pub u16, pub u16);

impl Version {
    /// Versions compare lexicographically on (major, minor, patch).
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self(major, minor, patch)
    }
}

impl std::str::FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = |name: &str| -> Result<u16, String> {
            parts
                .next()
                .unwrap_or("0")
                .parse()
                .map_err(|_| format!("invalid {name} in version: {s}"))
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        Ok(Self(major, minor, patch))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}
