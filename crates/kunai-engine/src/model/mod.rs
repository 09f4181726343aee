//! Engine data model: accounts, folders, contact records, change-log.

pub mod account;
pub mod changelog;
pub mod contact;
pub mod folder;

pub use account::{Account, ProviderPreset};
pub use changelog::{ChangeEntry, collapse};
pub use contact::ContactRecord;
pub use folder::{Folder, FolderDiff};
