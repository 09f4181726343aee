//! Account discovery: principal, home-sets, folder listing.
//!
//! The chain is principal -> home-sets (own plus proxy/group, one level
//! deep) -> depth-1 collection listing with privilege extraction. Every
//! step goes through [`Transport`], so the bootstrap pseudo-scheme and
//! all auth/redirect handling happen below this module.

use kunai_core::constants::ENGINE_VERSION;
use kunai_core::error::{SyncError, SyncResult};
use kunai_core::types::{AclMask, FolderKind};
use kunai_rfc::dav::namespace::{APPLE_NS, CALDAV_NS, CARDDAV_NS, CS_NS, DAV_NS};
use kunai_rfc::dav::{MsEntry, build};
use kunai_transport::{Connection, DavRequest, Transport};

use crate::model::account::{Account, ProviderPreset};
use crate::model::folder::{Folder, FolderDiff};

/// A discovered home collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeSet {
    pub href: String,
    /// Reached through a proxy or group principal, not our own.
    pub shared: bool,
}

/// Discovery pass over one account.
pub struct DiscoveryService<'a, T> {
    transport: &'a T,
    provider: ProviderPreset,
}

impl<'a, T: Transport> DiscoveryService<'a, T> {
    #[must_use]
    pub const fn new(transport: &'a T, provider: ProviderPreset) -> Self {
        Self { transport, provider }
    }

    /// Resolves the account's `current-user-principal`.
    ///
    /// The request tolerates a 404 status: some servers answer the
    /// well-known path with 404 yet still attach a valid multistatus
    /// body, which is accepted like a 207.
    ///
    /// ## Errors
    /// Transport failures propagate; a response with no principal href
    /// maps to a malformed-response error.
    #[tracing::instrument(skip(self, conn))]
    pub async fn find_principal(
        &self,
        conn: &mut Connection,
        kind: FolderKind,
        root_path: &str,
    ) -> SyncResult<String> {
        let request = DavRequest::propfind(root_path, 0, build::propfind_current_user_principal())
            .soft_fail_on(&[404]);
        let response = self.transport.send(request, conn).await?;
        let principal = response.multi_status().and_then(|ms| {
            ms.entries.iter().find_map(|entry| {
                entry
                    .node
                    .path_text(&[(DAV_NS, "current-user-principal"), (DAV_NS, "href")])
                    .map(String::from)
            })
        });
        principal.ok_or_else(|| {
            SyncError::malformed("no current-user-principal in discovery response")
        })
    }

    /// Collects home-set hrefs for a principal, then walks proxy and
    /// group principals exactly one level deep for shared home-sets.
    ///
    /// Failures on secondary principals are logged and skipped; only the
    /// primary principal request is fatal.
    ///
    /// ## Errors
    /// Propagates transport failures for the primary principal.
    #[tracing::instrument(skip(self, conn))]
    pub async fn find_home_sets(
        &self,
        conn: &mut Connection,
        kind: FolderKind,
        principal: &str,
    ) -> SyncResult<Vec<HomeSet>> {
        let mut homes: Vec<HomeSet> = Vec::new();
        let mut related: Vec<String> = Vec::new();
        self.principal_step(conn, kind, principal, false, &mut homes, Some(&mut related))
            .await?;

        related.retain(|href| href != principal);
        related.dedup();
        for href in related {
            if let Err(error) = self
                .principal_step(conn, kind, &href, true, &mut homes, None)
                .await
            {
                tracing::warn!(principal = %href, %error, "skipping secondary principal");
            }
        }
        homes.dedup_by(|a, b| a.href == b.href);
        Ok(homes)
    }

    async fn principal_step(
        &self,
        conn: &mut Connection,
        kind: FolderKind,
        principal: &str,
        shared: bool,
        homes: &mut Vec<HomeSet>,
        mut related: Option<&mut Vec<String>>,
    ) -> SyncResult<()> {
        let request = DavRequest::propfind(principal, 0, build::propfind_principal(kind))
            .soft_fail_on(&[403, 404, 501]);
        let response = self.transport.send(request, conn).await?;
        let Some(ms) = response.multi_status() else {
            return Ok(());
        };
        let home_item = match kind {
            FolderKind::CalDav | FolderKind::Ics => (CALDAV_NS, "calendar-home-set"),
            FolderKind::CardDav => (CARDDAV_NS, "addressbook-home-set"),
        };
        for entry in &ms.entries {
            if let Some(set) = entry.node.child(home_item.0, home_item.1) {
                for href in set.children_named(DAV_NS, "href") {
                    if let Some(text) = href.non_empty_text() {
                        if !homes.iter().any(|h| h.href == text) {
                            homes.push(HomeSet {
                                href: text.to_string(),
                                shared,
                            });
                        }
                    }
                }
            }
            if let Some(related) = related.as_deref_mut() {
                for container in [
                    entry.node.child(CS_NS, "calendar-proxy-read-for"),
                    entry.node.child(CS_NS, "calendar-proxy-write-for"),
                    entry.node.child(DAV_NS, "group-membership"),
                ]
                .into_iter()
                .flatten()
                {
                    for href in container.children_named(DAV_NS, "href") {
                        if let Some(text) = href.non_empty_text() {
                            if !related.contains(&text.to_string()) {
                                related.push(text.to_string());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Lists the collections under a set of home-sets as [`Folder`]
    /// candidates. Unreadable collections are excluded.
    ///
    /// ## Errors
    /// Propagates transport failures; a home-set whose listing soft-fails
    /// is skipped with a warning.
    #[tracing::instrument(skip(self, conn, homes))]
    pub async fn list_folders(
        &self,
        conn: &mut Connection,
        kind: FolderKind,
        homes: &[HomeSet],
    ) -> SyncResult<Vec<Folder>> {
        let mut folders = Vec::new();
        for home in homes {
            let request = DavRequest::propfind(&home.href, 1, build::propfind_folder_list(kind))
                .soft_fail_on(&[403, 404]);
            let response = self.transport.send(request, conn).await?;
            let Some(ms) = response.multi_status() else {
                tracing::warn!(home = %home.href, "home-set listing unavailable");
                continue;
            };
            for entry in ms.entries.iter().filter(|e| e.is_ok()) {
                if let Some(folder) = self.folder_from_entry(conn, kind, home, entry) {
                    if !folders.iter().any(|f: &Folder| f.href == folder.href) {
                        folders.push(folder);
                    }
                }
            }
        }
        Ok(folders)
    }

    fn folder_from_entry(
        &self,
        conn: &Connection,
        kind: FolderKind,
        home: &HomeSet,
        entry: &MsEntry,
    ) -> Option<Folder> {
        let resource_type = entry.node.child(DAV_NS, "resourcetype")?;
        let subscribed = resource_type.child(CS_NS, "subscribed").is_some();
        let matches_kind = match kind {
            FolderKind::CardDav => resource_type.child(CARDDAV_NS, "addressbook").is_some(),
            FolderKind::CalDav | FolderKind::Ics => {
                resource_type.child(CALDAV_NS, "calendar").is_some() || subscribed
            }
        };
        if !matches_kind {
            return None;
        }

        let acl = self.privileges(entry);
        if !acl.readable() {
            tracing::debug!(href = %entry.href, "excluding unreadable collection");
            return None;
        }

        let source = entry
            .node
            .path_text(&[(CS_NS, "source"), (DAV_NS, "href")])
            .map(String::from);
        let effective_kind = if subscribed && source.is_some() {
            FolderKind::Ics
        } else {
            kind
        };

        let mut folder = Folder::new(entry.href.clone(), effective_kind, ENGINE_VERSION);
        folder.scheme = conn.scheme.clone();
        folder.fqdn = conn.fqdn.clone();
        folder.display_name = entry
            .node
            .path_text(&[(DAV_NS, "displayname")])
            .map_or_else(|| entry.href.clone(), String::from);
        folder.acl = acl;
        folder.shared = home.shared;
        folder.color = entry
            .node
            .path_text(&[(APPLE_NS, "calendar-color")])
            .map(String::from);
        folder.source = source;
        Some(folder)
    }

    /// Privilege-set to ACL bitmask. Servers that omit the privilege set
    /// entirely get read access only under providers known to do that.
    fn privileges(&self, entry: &MsEntry) -> AclMask {
        let Some(set) = entry.node.child(DAV_NS, "current-user-privilege-set") else {
            return if self.provider.default_read_acl() {
                AclMask::READ
            } else {
                AclMask::NONE
            };
        };
        let mut acl = AclMask::NONE;
        for privilege in set.children_named(DAV_NS, "privilege") {
            if privilege.child(DAV_NS, "all").is_some() {
                return AclMask::ALL;
            }
            if privilege.child(DAV_NS, "read").is_some() {
                acl |= AclMask::READ;
            }
            if privilege.child(DAV_NS, "write").is_some()
                || privilege.child(DAV_NS, "write-content").is_some()
            {
                acl |= AclMask::MODIFY;
            }
            if privilege.child(DAV_NS, "bind").is_some() {
                acl |= AclMask::CREATE;
            }
            if privilege.child(DAV_NS, "unbind").is_some() {
                acl |= AclMask::DELETE;
            }
        }
        acl
    }
}

/// Merges a fresh listing into the known folder set.
///
/// New hrefs become folders (inheriting target and download-only from a
/// soft-removed predecessor with the same href); known folders get their
/// server-owned metadata refreshed; folders missing from the listing are
/// soft-removed so their local target survives until the embedder acts.
pub fn merge_folder_list(
    found: Vec<Folder>,
    known: &mut Vec<Folder>,
    account: &Account,
) -> FolderDiff {
    let mut diff = FolderDiff::default();
    let listed: Vec<String> = found.iter().map(|f| f.href.clone()).collect();
    for fresh in found {
        if let Some(existing) = known.iter_mut().find(|f| f.href == fresh.href) {
            existing.display_name = fresh.display_name;
            existing.acl = fresh.acl;
            existing.shared = fresh.shared;
            existing.color = fresh.color;
            existing.source = fresh.source;
            existing.scheme = fresh.scheme;
            existing.fqdn = fresh.fqdn;
            if existing.removed {
                // Reappeared: keep the old target and settings, but force
                // a full enumeration since we missed changes meanwhile.
                existing.removed = false;
                existing.reset_change_markers();
                diff.added.push(existing.href.clone());
            } else {
                diff.unchanged += 1;
            }
        } else {
            let mut folder = fresh;
            folder.download_only = account.download_only_default || folder.kind == FolderKind::Ics;
            diff.added.push(folder.href.clone());
            known.push(folder);
        }
    }
    for folder in known.iter_mut() {
        if !folder.removed && !listed.contains(&folder.href) {
            folder.removed = true;
            diff.removed.push(folder.href.clone());
        }
    }
    diff
}
