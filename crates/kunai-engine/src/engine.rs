//! Top-level reconciliation engine: folder-list refresh plus the
//! per-folder remote/local/repair sequence.

use kunai_core::config::SyncConfig;
use kunai_core::error::SyncResult;
use kunai_core::types::FolderKind;
use kunai_transport::{Connection, Transport};

use crate::discovery::{DiscoveryService, merge_folder_list};
use crate::model::account::Account;
use crate::model::folder::{Folder, FolderDiff};
use crate::reconcile::{RemoteSummary, local, remote};
use crate::store::SyncTarget;

/// How one folder's sync run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOutcome {
    Synced {
        remote: RemoteSummary,
        /// Positive: uploaded mutations. Negative: permission rejections
        /// that triggered a repair pass.
        uploaded: i64,
    },
    /// Calendar content is produced here but consumed by a separate
    /// scheduling component; only the folder list is maintained.
    Delegated,
    /// Soft-removed folders are never synced.
    Skipped,
}

/// The reconciliation engine, generic over the transport seam.
pub struct ReconciliationEngine<'a, T> {
    transport: &'a T,
    config: &'a SyncConfig,
}

impl<'a, T: Transport> ReconciliationEngine<'a, T> {
    #[must_use]
    pub const fn new(transport: &'a T, config: &'a SyncConfig) -> Self {
        Self { transport, config }
    }

    /// Providers whose challenge handling is known broken get the host
    /// pre-flagged before the first request goes out.
    fn prepare_transport(&self, conn: &Connection, account: &Account) {
        if account.provider.pre_flagged_auth() {
            self.transport.note_problematic_host(&conn.fqdn);
        }
    }

    /// Re-runs discovery and folds the result into the known folder set.
    ///
    /// ## Errors
    /// Propagates discovery failures; nothing is merged on error.
    #[tracing::instrument(skip(self, conn, known))]
    pub async fn refresh_folders(
        &self,
        conn: &mut Connection,
        account: &Account,
        kind: FolderKind,
        known: &mut Vec<Folder>,
    ) -> SyncResult<FolderDiff> {
        self.prepare_transport(conn, account);
        let discovery = DiscoveryService::new(self.transport, account.provider);
        let root = account.provider.root_url(kind, &account.host);
        let principal = discovery.find_principal(conn, kind, &root).await?;
        let homes = discovery.find_home_sets(conn, kind, &principal).await?;
        let found = discovery.list_folders(conn, kind, &homes).await?;
        Ok(merge_folder_list(found, known, account))
    }

    /// Runs one folder end to end: remote pass, upload phase, and the
    /// follow-up remote pass the upload outcome demands.
    ///
    /// After a permission rejection the change markers are reset and a
    /// full remote pass restores the server's state; after successful
    /// uploads a single absorb pass picks up fresh ETags.
    ///
    /// ## Errors
    /// Propagates transport and stabilization failures.
    #[tracing::instrument(skip_all, fields(folder = %folder.href))]
    pub async fn sync_folder<S: SyncTarget>(
        &self,
        conn: &mut Connection,
        account: &Account,
        folder: &mut Folder,
        target: &mut S,
    ) -> SyncResult<FolderOutcome> {
        self.prepare_transport(conn, account);
        if folder.removed {
            return Ok(FolderOutcome::Skipped);
        }
        if folder.kind != FolderKind::CardDav {
            return Ok(FolderOutcome::Delegated);
        }

        let sync_groups = account.sync_groups;
        let mut summary = remote::run(
            self.transport,
            conn,
            folder,
            target,
            self.config,
            sync_groups,
        )
        .await?;

        if folder.download_only || !folder.writable() {
            drop_local_changes(target);
            return Ok(FolderOutcome::Synced {
                remote: summary,
                uploaded: 0,
            });
        }

        let uploaded = local::run(self.transport, conn, folder, target, self.config).await?;
        if uploaded < 0 {
            // Rejected mutations left holes; re-enumerate everything so
            // the server's versions come back.
            folder.reset_change_markers();
            summary = remote::run(
                self.transport,
                conn,
                folder,
                target,
                self.config,
                sync_groups,
            )
            .await?;
        } else if uploaded > 0 {
            summary = remote::run(
                self.transport,
                conn,
                folder,
                target,
                self.config,
                sync_groups,
            )
            .await?;
        }

        Ok(FolderOutcome::Synced {
            remote: summary,
            uploaded,
        })
    }
}

/// Read-only folders cannot push: pending local mutations are written
/// off so they stop re-triggering upload phases.
fn drop_local_changes<S: SyncTarget>(target: &mut S) {
    for entry in target.changelog() {
        if entry.status.is_local() {
            target.clear_change(&entry.href);
        }
    }
}
