#![allow(dead_code)]
//! Shared constructors for integration tests.

use kunai_core::config::SyncConfig;
use kunai_core::constants::ENGINE_VERSION;
use kunai_core::types::FolderKind;
use kunai_engine::model::account::Account;
use kunai_engine::model::folder::Folder;

pub use kunai_test::*;

pub fn account() -> Account {
    Account::new("acct-1", "example.com", "jane")
}

pub fn folder(href: &str) -> Folder {
    Folder::new(href, FolderKind::CardDav, ENGINE_VERSION)
}

/// Sync settings with pacing disabled so tests run instantly.
pub fn config() -> SyncConfig {
    SyncConfig {
        batch_size: 50,
        ctag_bound: 20,
        delete_pause_ms: 0,
    }
}

pub fn connection() -> kunai_transport::Connection {
    kunai_transport::Connection::new(
        "https",
        "dav.example.com",
        kunai_transport::Credentials::new("jane", "secret"),
    )
}
