use crate::types::Version;

/// Current engine version, recorded on folders at creation time and used
/// to gate version-dependent field mappings.
pub const ENGINE_VERSION: Version = Version::new(1, 0, 0);

/// Address component layout changed in this version; folders created
/// earlier keep the swapped street/extended layout they were synced with.
pub const ADR_LAYOUT_FIX_VERSION: Version = Version::new(0, 4, 30);

/// Bound on 401 retries before giving up on authentication.
pub const DEFAULT_AUTH_RETRIES: u8 = 5;

/// Bound on manually-followed redirects.
pub const DEFAULT_REDIRECT_LIMIT: u8 = 5;

/// Bound on CTAG re-fetch iterations while the collection keeps mutating.
pub const DEFAULT_CTAG_BOUND: u32 = 20;

/// Multiget / delete dispatch batch size.
pub const DEFAULT_BATCH_SIZE: usize = 50;
