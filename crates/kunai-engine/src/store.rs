//! External-collaborator interfaces: persistence, credentials, and the
//! per-folder target object. The engine never touches the host's storage
//! directly; everything goes through these traits.
//!
//! The in-memory implementations at the bottom are reference collaborators
//! used by the integration tests and by embedders that keep their own
//! persistence elsewhere.

use std::collections::BTreeMap;

use kunai_core::types::ChangeStatus;

use crate::model::{ChangeEntry, ContactRecord, collapse};

/// Key-value property store per account or folder.
///
/// The engine only requires that a `set` is durable before the next
/// network step reads it back, and that `reset` restores the documented
/// default rather than removing the key.
pub trait PropertyStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    /// Restores the default value for `key`.
    fn reset(&mut self, key: &str);
}

/// Credential lookup by (host, realm, username).
///
/// Lookups fall back to a legacy host key when the primary key misses,
/// covering stores written before realm-qualified keys existed.
pub trait CredentialStore {
    fn lookup(&self, host: &str, realm: Option<&str>, username: &str) -> Option<String>;
    /// Rotates username/password atomically.
    fn update(&mut self, host: &str, realm: Option<&str>, username: &str, password: &str);
}

/// Resolves a password, trying the realm-qualified key first and the
/// legacy bare-host key second.
#[must_use]
pub fn resolve_password(
    store: &impl CredentialStore,
    host: &str,
    realm: Option<&str>,
    username: &str,
) -> Option<String> {
    store
        .lookup(host, realm, username)
        .or_else(|| store.lookup(host, None, username))
}

/// The per-folder target object: the host address book (or calendar)
/// behind an opaque handle, including its local change-log.
pub trait SyncTarget {
    /// All item hrefs currently in the target.
    fn hrefs(&self) -> Vec<String>;
    fn get(&self, href: &str) -> Option<ContactRecord>;
    /// Creates or replaces an item by primary key.
    fn upsert(&mut self, record: ContactRecord);
    fn delete(&mut self, href: &str);

    /// Appends a local mutation, collapsing per the change-log invariant.
    fn log_change(&mut self, href: &str, status: ChangeStatus);
    /// Outstanding entries in insertion order.
    fn changelog(&self) -> Vec<ChangeEntry>;
    fn clear_change(&mut self, href: &str);

    /// Hrefs with a pending `added_by_user` entry.
    fn pending_adds(&self) -> Vec<String> {
        self.changelog()
            .into_iter()
            .filter(|e| e.status == ChangeStatus::AddedByUser)
            .map(|e| e.href)
            .collect()
    }

    /// Hrefs with a pending `deleted_by_user` entry.
    fn pending_deletes(&self) -> Vec<String> {
        self.changelog()
            .into_iter()
            .filter(|e| e.status == ChangeStatus::DeletedByUser)
            .map(|e| e.href)
            .collect()
    }
}

/// In-memory [`SyncTarget`].
#[derive(Debug, Default)]
pub struct MemoryTarget {
    items: BTreeMap<String, ContactRecord>,
    changes: Vec<ChangeEntry>,
}

impl MemoryTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Item count, for test assertions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SyncTarget for MemoryTarget {
    fn hrefs(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn get(&self, href: &str) -> Option<ContactRecord> {
        self.items.get(href).cloned()
    }

    fn upsert(&mut self, record: ContactRecord) {
        self.items.insert(record.href.clone(), record);
    }

    fn delete(&mut self, href: &str) {
        self.items.remove(href);
    }

    fn log_change(&mut self, href: &str, status: ChangeStatus) {
        let previous = self
            .changes
            .iter()
            .position(|e| e.href == href)
            .map(|i| self.changes.remove(i).status);
        if let Some(collapsed) = collapse(previous, status) {
            self.changes.push(ChangeEntry::new(href, collapsed));
        }
    }

    fn changelog(&self) -> Vec<ChangeEntry> {
        self.changes.clone()
    }

    fn clear_change(&mut self, href: &str) {
        self.changes.retain(|e| e.href != href);
    }
}

/// In-memory [`PropertyStore`] with explicit defaults.
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    values: BTreeMap<String, String>,
    defaults: BTreeMap<String, String>,
}

impl MemoryPropertyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_default(&mut self, key: &str, value: &str) {
        self.defaults.insert(key.to_string(), value.to_string());
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .or_else(|| self.defaults.get(key))
            .cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn reset(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// In-memory [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: BTreeMap<(String, Option<String>, String), String>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, host: &str, realm: Option<&str>, username: &str) -> Option<String> {
        self.entries
            .get(&(
                host.to_string(),
                realm.map(str::to_string),
                username.to_string(),
            ))
            .cloned()
    }

    fn update(&mut self, host: &str, realm: Option<&str>, username: &str, password: &str) {
        self.entries.insert(
            (
                host.to_string(),
                realm.map(str::to_string),
                username.to_string(),
            ),
            password.to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changelog_collapses_in_target() {
        let mut target = MemoryTarget::new();
        target.log_change("/x.vcf", ChangeStatus::AddedByUser);
        target.log_change("/x.vcf", ChangeStatus::ModifiedByUser);
        assert_eq!(
            target.changelog(),
            vec![ChangeEntry::new("/x.vcf", ChangeStatus::AddedByUser)]
        );
        target.log_change("/x.vcf", ChangeStatus::DeletedByUser);
        assert!(target.changelog().is_empty());
    }

    #[test]
    fn reset_restores_default() {
        let mut store = MemoryPropertyStore::new();
        store.define_default("color", "#0000ff");
        store.set("color", "#ff0000");
        assert_eq!(store.get("color").as_deref(), Some("#ff0000"));
        store.reset("color");
        assert_eq!(store.get("color").as_deref(), Some("#0000ff"));
    }

    #[test]
    fn legacy_credential_fallback() {
        let mut store = MemoryCredentialStore::new();
        store.update("dav.example.com", None, "u", "legacy-pw");
        let pw = resolve_password(&store, "dav.example.com", Some("Realm"), "u");
        assert_eq!(pw.as_deref(), Some("legacy-pw"));
    }
}
