//! Local phase: push user mutations to the server.
//!
//! Every change-log entry is consumed exactly once per run: uploaded,
//! deleted remotely, or written off. Permission rejections do not abort
//! the run; the rejected local copy is discarded so the next remote pass
//! restores the server's version, and the phase reports the rejection
//! count as a negative total so the caller schedules that full pass.
//! A 403/405 also denies that change-status class for the rest of the
//! run, so later entries of the class are written off without another
//! wire call.

use std::time::Duration;

use kunai_core::config::SyncConfig;
use kunai_core::error::SyncResult;
use kunai_transport::{Connection, DavRequest, Method, Transport};

use crate::mapper::{FieldMapper, parse_baseline};
use crate::model::folder::Folder;
use crate::reconcile::lists;
use crate::store::SyncTarget;
use kunai_core::types::ChangeStatus;
use kunai_rfc::vcard::generate;

const VCARD_CONTENT_TYPE: &str = "text/vcard; charset=utf-8";

/// Statuses meaning "the server refuses this mutation on permission
/// grounds"; handled in-band rather than failing the run.
const PERMISSION_STATUSES: &[u16] = &[403, 405];

/// Runs the upload phase for a folder.
///
/// Returns the number of applied mutations, or, when any permission
/// rejection occurred, minus the number of rejections.
///
/// ## Errors
/// Transport failures other than the whitelisted permission statuses
/// propagate and leave unprocessed entries in the log.
#[tracing::instrument(skip_all, fields(folder = %folder.href))]
pub async fn run<T: Transport, S: SyncTarget>(
    transport: &T,
    conn: &mut Connection,
    folder: &Folder,
    target: &mut S,
    config: &SyncConfig,
) -> SyncResult<i64> {
    let mapper = FieldMapper::new(folder.created_with);
    let mut successes: i64 = 0;
    let mut rejections: i64 = 0;
    let mut denied: Vec<ChangeStatus> = Vec::new();
    let mut deletes_in_batch = 0;

    for entry in target.changelog() {
        if !entry.status.is_local() {
            target.clear_change(&entry.href);
            continue;
        }
        if denied.contains(&entry.status) {
            // The server already refused this class this run; write the
            // entry off without asking again.
            tracing::debug!(href = %entry.href, status = ?entry.status, "class denied, skipping");
            rejections += 1;
            if entry.status != ChangeStatus::DeletedByUser {
                target.delete(&entry.href);
            }
            target.clear_change(&entry.href);
            continue;
        }
        match entry.status {
            ChangeStatus::AddedByUser | ChangeStatus::ModifiedByUser => {
                match upload_item(transport, conn, target, mapper, &entry.href).await? {
                    UploadOutcome::Done => successes += 1,
                    UploadOutcome::Rejected => {
                        rejections += 1;
                        denied.push(entry.status);
                        // Drop the rejected copy; the next remote pass
                        // restores the server's version.
                        target.delete(&entry.href);
                    }
                    UploadOutcome::Vanished => {}
                }
            }
            ChangeStatus::DeletedByUser => {
                if delete_item(transport, conn, &entry.href).await? {
                    successes += 1;
                } else {
                    rejections += 1;
                    denied.push(entry.status);
                }
                deletes_in_batch += 1;
                if deletes_in_batch >= config.batch_size.max(1) {
                    deletes_in_batch = 0;
                    delete_pause(config).await;
                }
            }
            _ => {}
        }
        target.clear_change(&entry.href);
    }

    Ok(if rejections > 0 { -rejections } else { successes })
}

/// Pause after each full delete batch; some servers throttle rapid-fire
/// deletes and host UIs want a breather between bursts.
pub(crate) async fn delete_pause(config: &SyncConfig) {
    if config.delete_pause_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.delete_pause_ms)).await;
    }
}

enum UploadOutcome {
    Done,
    Rejected,
    /// The record disappeared locally before we got to it.
    Vanished,
}

async fn upload_item<T: Transport, S: SyncTarget>(
    transport: &T,
    conn: &mut Connection,
    target: &mut S,
    mapper: FieldMapper,
    href: &str,
) -> SyncResult<UploadOutcome> {
    let Some(mut record) = target.get(href) else {
        return Ok(UploadOutcome::Vanished);
    };
    let baseline = parse_baseline(record.ocard.as_deref());
    let card = if record.is_list {
        lists::build_group_card(&record, baseline.as_ref())
    } else {
        mapper.record_to_card(&mut record, baseline.as_ref())
    };
    let body = generate(&card);

    let request = DavRequest::new(Method::Put, href)
        .with_body(body.clone())
        .with_header("Content-Type", VCARD_CONTENT_TYPE.to_string())
        .soft_fail_on(PERMISSION_STATUSES);
    let response = transport.send(request, conn).await?;
    if let Some(status) = response.soft_error() {
        tracing::warn!(href, status, "upload rejected");
        return Ok(UploadOutcome::Rejected);
    }

    // The stored ETag is stale after a PUT; clearing it makes the next
    // remote pass re-fetch the server's canonical form.
    record.etag = None;
    record.ocard = Some(body);
    target.upsert(record);
    Ok(UploadOutcome::Done)
}

/// DELETE one item; 404 already-gone counts as success.
async fn delete_item<T: Transport>(
    transport: &T,
    conn: &mut Connection,
    href: &str,
) -> SyncResult<bool> {
    let request = DavRequest::new(Method::Delete, href).soft_fail_on(&[403, 404, 405]);
    let response = transport.send(request, conn).await?;
    match response.soft_error() {
        None | Some(404) => Ok(true),
        Some(status) => {
            tracing::warn!(href, status, "delete rejected");
            Ok(false)
        }
    }
}
