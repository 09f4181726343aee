//! Process-lifetime transport caches.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Caches owned by the transport instance.
///
/// `problematic_hosts` holds hosts whose challenge handling is broken
/// enough that the Basic header must be attached pre-emptively; once a
/// host is flagged it stays flagged for the lifetime of the client (it is
/// re-learned next session). `realms` remembers the `WWW-Authenticate`
/// realm per host for credential-store lookups.
///
/// Both are append-only; the mutex merely satisfies `&self` access under
/// the engine's strictly sequential execution.
#[derive(Debug, Default)]
pub struct TransportCaches {
    problematic_hosts: Mutex<HashSet<String>>,
    realms: Mutex<HashMap<String, String>>,
}

impl TransportCaches {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_problematic(&self, host: &str) {
        if let Ok(mut hosts) = self.problematic_hosts.lock() {
            if hosts.insert(host.to_string()) {
                tracing::info!(host, "host flagged for pre-emptive Basic auth");
            }
        }
    }

    #[must_use]
    pub fn is_problematic(&self, host: &str) -> bool {
        self.problematic_hosts
            .lock()
            .map_or(false, |hosts| hosts.contains(host))
    }

    pub fn remember_realm(&self, host: &str, realm: &str) {
        if let Ok(mut realms) = self.realms.lock() {
            realms.insert(host.to_string(), realm.to_string());
        }
    }

    #[must_use]
    pub fn realm_for(&self, host: &str) -> Option<String> {
        self.realms.lock().ok()?.get(host).cloned()
    }
}
