//! Remote phase: absorb server changes into the local target.
//!
//! Two change-detection strategies share the download path. The token
//! strategy spends one `sync-collection` REPORT when the server granted a
//! token last time; anything wrong with it (soft-failed REPORT, missing
//! next token) resets both markers and falls back to the CTAG strategy,
//! which enumerates ETags and re-polls the CTAG until it stops moving.

use kunai_core::config::SyncConfig;
use kunai_core::error::{SyncError, SyncErrorKind, SyncResult};
use kunai_rfc::dav::namespace::{CARDDAV_NS, CS_NS, DAV_NS};
use kunai_rfc::dav::{MsEntry, build};
use kunai_rfc::vcard::parse;
use kunai_transport::{Connection, DavRequest, Transport};

use crate::mapper::{FieldMapper, parse_baseline};
use crate::model::contact::ContactRecord;
use crate::model::folder::Folder;
use crate::reconcile::{lists, local};
use crate::store::SyncTarget;
use kunai_core::types::ChangeStatus;

/// Statuses after which a sync-collection REPORT falls back to CTAG
/// instead of failing the run.
const TOKEN_SOFT_FAIL: &[u16] = &[400, 403, 409, 415, 507];

/// What one remote pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteSummary {
    pub fetched: usize,
    pub deleted: usize,
    /// True when the CTAG matched and nothing was enumerated.
    pub unchanged: bool,
}

/// Runs one remote pass over a folder.
///
/// ## Errors
/// Transport failures propagate. A CTAG that keeps moving past the
/// configured bound surfaces as an unstable-ctag error.
#[tracing::instrument(skip_all, fields(folder = %folder.href))]
pub async fn run<T: Transport, S: SyncTarget>(
    transport: &T,
    conn: &mut Connection,
    folder: &mut Folder,
    target: &mut S,
    config: &SyncConfig,
    sync_groups: bool,
) -> SyncResult<RemoteSummary> {
    if let Some(token) = folder.token.clone() {
        match token_pass(transport, conn, folder, target, config, sync_groups, &token).await? {
            Some(summary) => return Ok(summary),
            None => {
                // Token rejected or not renewed: full enumeration.
                folder.reset_change_markers();
            }
        }
    }
    ctag_pass(transport, conn, folder, target, config, sync_groups).await
}

/// One sync-collection REPORT. `Ok(None)` means "fall back to CTAG".
async fn token_pass<T: Transport, S: SyncTarget>(
    transport: &T,
    conn: &mut Connection,
    folder: &mut Folder,
    target: &mut S,
    config: &SyncConfig,
    sync_groups: bool,
    token: &str,
) -> SyncResult<Option<RemoteSummary>> {
    let request = DavRequest::report(&folder.href, build::report_sync_collection(token))
        .soft_fail_on(TOKEN_SOFT_FAIL);
    let response = transport.send(request, conn).await?;
    let Some(ms) = response.multi_status() else {
        tracing::info!(status = ?response.soft_error(), "sync-collection rejected");
        return Ok(None);
    };
    let Some(next_token) = ms.sync_token.clone() else {
        tracing::info!("sync-collection response carried no next token");
        return Ok(None);
    };

    let mut summary = RemoteSummary::default();
    let mut changed = Vec::new();
    let mut absorbed_in_batch = 0;
    let pending_deletes = target.pending_deletes();
    for entry in &ms.entries {
        if entry.href == folder.href {
            continue;
        }
        if entry.is_not_found() {
            summary.deleted += absorb_server_delete(target, &entry.href);
            absorbed_in_batch += 1;
            if absorbed_in_batch >= config.batch_size.max(1) {
                absorbed_in_batch = 0;
                local::delete_pause(config).await;
            }
        } else if entry.is_ok()
            && !pending_deletes.contains(&entry.href)
            && etag_moved(target, entry)
        {
            changed.push(entry.href.clone());
        }
    }
    summary.fetched = fetch_batches(
        transport,
        conn,
        folder,
        target,
        config,
        sync_groups,
        &changed,
    )
    .await?;
    folder.token = Some(next_token);
    Ok(Some(summary))
}

/// CTAG strategy with the stabilization loop.
async fn ctag_pass<T: Transport, S: SyncTarget>(
    transport: &T,
    conn: &mut Connection,
    folder: &mut Folder,
    target: &mut S,
    config: &SyncConfig,
    sync_groups: bool,
) -> SyncResult<RemoteSummary> {
    let mut summary = RemoteSummary::default();
    let (mut ctag, mut token) = read_ctag(transport, conn, folder).await?;
    if ctag.is_some() && ctag == folder.ctag {
        summary.unchanged = true;
        return Ok(summary);
    }

    for _ in 0..config.ctag_bound {
        let pass = enumeration_pass(transport, conn, folder, target, config, sync_groups).await?;
        summary.fetched += pass.fetched;
        summary.deleted += pass.deleted;

        let (after, after_token) = read_ctag(transport, conn, folder).await?;
        if after == ctag {
            folder.ctag = after;
            folder.token = after_token.or(token);
            return Ok(summary);
        }
        ctag = after;
        token = after_token;
    }
    Err(SyncError::new(
        SyncErrorKind::UnstableCtag,
        format!(
            "collection {} kept changing through {} enumeration passes",
            folder.href, config.ctag_bound
        ),
    ))
}

/// Depth-0 PROPFIND for (ctag, sync-token).
async fn read_ctag<T: Transport>(
    transport: &T,
    conn: &mut Connection,
    folder: &Folder,
) -> SyncResult<(Option<String>, Option<String>)> {
    let request = DavRequest::propfind(&folder.href, 0, build::propfind_ctag());
    let response = transport.send(request, conn).await?;
    let ms = response
        .multi_status()
        .ok_or_else(|| SyncError::malformed("ctag probe returned no multistatus"))?;
    let mut ctag = None;
    let mut token = None;
    for entry in &ms.entries {
        if ctag.is_none() {
            ctag = entry
                .node
                .path_text(&[(CS_NS, "getctag")])
                .map(String::from);
        }
        if token.is_none() {
            token = entry
                .node
                .path_text(&[(DAV_NS, "sync-token")])
                .map(String::from);
        }
    }
    Ok((ctag, token))
}

/// One full ETag enumeration plus download/delete application.
async fn enumeration_pass<T: Transport, S: SyncTarget>(
    transport: &T,
    conn: &mut Connection,
    folder: &mut Folder,
    target: &mut S,
    config: &SyncConfig,
    sync_groups: bool,
) -> SyncResult<RemoteSummary> {
    let request = DavRequest::propfind(&folder.href, 1, build::propfind_etags());
    let response = transport.send(request, conn).await?;
    let ms = response
        .multi_status()
        .ok_or_else(|| SyncError::malformed("etag enumeration returned no multistatus"))?;

    let pending_adds = target.pending_adds();
    let pending_deletes = target.pending_deletes();
    let mut summary = RemoteSummary::default();
    let mut remote_hrefs = Vec::with_capacity(ms.entries.len());
    let mut changed = Vec::new();
    for entry in &ms.entries {
        if entry.href == folder.href || !entry.is_ok() {
            continue;
        }
        // Sub-collections show up in depth-1 listings; skip them.
        if entry
            .node
            .child(DAV_NS, "resourcetype")
            .is_some_and(|rt| rt.child(DAV_NS, "collection").is_some())
        {
            continue;
        }
        remote_hrefs.push(entry.href.clone());
        if !pending_deletes.contains(&entry.href) && etag_moved(target, entry) {
            changed.push(entry.href.clone());
        }
    }

    // Items we hold that the server no longer lists were deleted there,
    // unless they are local additions still awaiting upload. Absorption
    // is paced in the same batches as delete dispatch.
    let mut absorbed_in_batch = 0;
    for href in target.hrefs() {
        if !remote_hrefs.contains(&href) && !pending_adds.contains(&href) {
            summary.deleted += absorb_server_delete(target, &href);
            absorbed_in_batch += 1;
            if absorbed_in_batch >= config.batch_size.max(1) {
                absorbed_in_batch = 0;
                local::delete_pause(config).await;
            }
        }
    }

    summary.fetched = fetch_batches(
        transport,
        conn,
        folder,
        target,
        config,
        sync_groups,
        &changed,
    )
    .await?;
    Ok(summary)
}

/// Downloads changed items in multiget batches and applies them.
async fn fetch_batches<T: Transport, S: SyncTarget>(
    transport: &T,
    conn: &mut Connection,
    folder: &Folder,
    target: &mut S,
    config: &SyncConfig,
    sync_groups: bool,
    hrefs: &[String],
) -> SyncResult<usize> {
    let mapper = FieldMapper::new(folder.created_with);
    let mut applied = 0;
    let mut deferred_groups: Vec<(String, Option<String>, String)> = Vec::new();
    for batch in hrefs.chunks(config.batch_size.max(1)) {
        let request = DavRequest::report(&folder.href, build::report_multiget(batch));
        let response = transport.send(request, conn).await?;
        let ms = response
            .multi_status()
            .ok_or_else(|| SyncError::malformed("multiget returned no multistatus"))?;
        for entry in &ms.entries {
            // Each entry is re-verified: the batch REPORT answers per
            // item and single members can fail inside a 207.
            if !entry.is_ok() {
                continue;
            }
            let Some(card_text) = entry
                .node
                .child(CARDDAV_NS, "address-data")
                .and_then(kunai_rfc::dav::XmlNode::non_empty_text)
            else {
                continue;
            };
            let etag = entry.etag().map(String::from);
            let Ok(card) = parse(card_text) else {
                tracing::warn!(href = %entry.href, "skipping unparseable card");
                continue;
            };
            if lists::is_group_card(&card) {
                if sync_groups {
                    deferred_groups.push((entry.href.clone(), etag, card_text.to_string()));
                }
                continue;
            }
            apply_contact(target, mapper, &entry.href, etag, &card, card_text);
            applied += 1;
        }
    }
    // Groups go last so member UIDs resolve against this batch's
    // contacts.
    for (href, etag, card_text) in deferred_groups {
        if let Ok(card) = parse(&card_text) {
            apply_group(target, &href, etag, &card, &card_text);
            applied += 1;
        }
    }
    Ok(applied)
}

/// Merges one downloaded contact card into the target.
fn apply_contact<S: SyncTarget>(
    target: &mut S,
    mapper: FieldMapper,
    href: &str,
    etag: Option<String>,
    card: &kunai_rfc::vcard::VCard,
    card_text: &str,
) {
    let (mut record, status) = match target.get(href) {
        Some(record) => (record, ChangeStatus::ModifiedByServer),
        None => (ContactRecord::new(href), ChangeStatus::AddedByServer),
    };
    let baseline = parse_baseline(record.ocard.as_deref());
    mapper.apply_card_to_record(&mut record, card, baseline.as_ref());
    record.etag = etag;
    record.ocard = Some(card_text.to_string());
    target.upsert(record);
    target.log_change(href, status);
}

/// Merges one downloaded group card, three-way on membership.
fn apply_group<S: SyncTarget>(
    target: &mut S,
    href: &str,
    etag: Option<String>,
    card: &kunai_rfc::vcard::VCard,
    card_text: &str,
) {
    let (mut record, status) = match target.get(href) {
        Some(record) => (record, ChangeStatus::ModifiedByServer),
        None => (ContactRecord::new(href), ChangeStatus::AddedByServer),
    };
    record.is_list = true;
    let old_server = parse_baseline(record.ocard.as_deref())
        .map(|b| lists::group_members(&b))
        .unwrap_or_default();
    let new_server = lists::group_members(card);
    record.members = lists::merge_members(&record.members, &old_server, &new_server);
    if let Some(name) = card.text("fn") {
        record.set_prop("DisplayName", name);
    }
    if let Some(uid) = card.text("uid") {
        record.set_prop("UID", uid);
    }
    record.etag = etag;
    record.ocard = Some(card_text.to_string());

    // Members the host can only link by address get a synthetic one.
    for uid in record.members.clone() {
        if let Some(mut member) = member_by_uid(target, &uid) {
            lists::ensure_member_email(&mut member);
            target.upsert(member);
        }
    }
    target.upsert(record);
    target.log_change(href, status);
}

fn member_by_uid<S: SyncTarget>(target: &S, uid: &str) -> Option<ContactRecord> {
    target
        .hrefs()
        .into_iter()
        .filter_map(|href| target.get(&href))
        .find(|r| r.prop("UID") == Some(uid))
}

/// Removes a server-deleted item locally. Returns 1 when something was
/// actually removed.
fn absorb_server_delete<S: SyncTarget>(target: &mut S, href: &str) -> usize {
    if target.get(href).is_none() {
        return 0;
    }
    target.delete(href);
    target.log_change(href, ChangeStatus::DeletedByServer);
    1
}

/// Whether the server ETag differs from the one we stored at last fetch.
fn etag_moved<S: SyncTarget>(target: &S, entry: &MsEntry) -> bool {
    let remote = entry.etag();
    match target.get(&entry.href) {
        Some(record) => record.etag.as_deref() != remote || remote.is_none(),
        None => true,
    }
}
