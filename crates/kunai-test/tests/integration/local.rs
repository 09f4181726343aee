//! Local-phase scenarios: uploads, deletes, permission rejections and
//! the repair pass that follows them.

use kunai_core::types::ChangeStatus;
use kunai_engine::engine::{FolderOutcome, ReconciliationEngine};
use kunai_engine::model::contact::ContactRecord;
use kunai_engine::reconcile::local;
use kunai_engine::store::{MemoryTarget, SyncTarget};
use kunai_transport::Method;

use super::helpers::*;

fn seeded_target(href: &str, status: ChangeStatus) -> MemoryTarget {
    let mut target = MemoryTarget::new();
    let mut record = ContactRecord::new(href);
    record.set_prop("UID", "u-1");
    record.set_prop("DisplayName", "Jane");
    target.upsert(record);
    target.log_change(href, status);
    target
}

/// ## Summary
/// A successful PUT consumes the change-log entry, stores the uploaded
/// text as the new cached copy, and clears the stale ETag.
#[test_log::test(tokio::test)]
async fn upload_put_success() {
    let transport = MockTransport::new();
    transport.push_status(201);

    let folder = folder("/ab/contacts/");
    let mut target = seeded_target("/ab/contacts/1.vcf", ChangeStatus::ModifiedByUser);
    let mut conn = connection();
    let uploaded = local::run(&transport, &mut conn, &folder, &mut target, &config())
        .await
        .unwrap();

    assert_eq!(uploaded, 1);
    assert!(target.changelog().is_empty());
    let record = target.get("/ab/contacts/1.vcf").unwrap();
    assert!(record.etag.is_none());
    assert!(record.ocard.as_deref().unwrap().contains("FN:Jane"));
    let sent = transport.requests();
    assert_eq!(sent[0].method, Method::Put);
    assert!(sent[0].body.as_deref().unwrap().contains("BEGIN:VCARD"));
}

/// ## Summary
/// A 403 on upload counts as a permission rejection: the entry is
/// consumed, the local copy discarded, and the total goes negative.
#[test_log::test(tokio::test)]
async fn upload_403_discards_local_copy() {
    let transport = MockTransport::new();
    transport.push_status(403);

    let folder = folder("/ab/contacts/");
    let mut target = seeded_target("/ab/contacts/1.vcf", ChangeStatus::ModifiedByUser);
    let mut conn = connection();
    let uploaded = local::run(&transport, &mut conn, &folder, &mut target, &config())
        .await
        .unwrap();

    assert_eq!(uploaded, -1);
    assert!(target.changelog().is_empty());
    assert!(target.get("/ab/contacts/1.vcf").is_none());
}

/// ## Summary
/// One permission rejection denies that change-status class for the rest
/// of the run: later entries of the class are written off locally without
/// another PUT hitting the wire.
#[test_log::test(tokio::test)]
async fn denied_class_skips_remaining_uploads() {
    let transport = MockTransport::new();
    transport.push_status(403);

    let folder = folder("/ab/contacts/");
    let mut target = seeded_target("/ab/contacts/1.vcf", ChangeStatus::ModifiedByUser);
    let mut second = ContactRecord::new("/ab/contacts/2.vcf");
    second.set_prop("UID", "u-2");
    second.set_prop("DisplayName", "John");
    target.upsert(second);
    target.log_change("/ab/contacts/2.vcf", ChangeStatus::ModifiedByUser);
    let mut conn = connection();

    let uploaded = local::run(&transport, &mut conn, &folder, &mut target, &config())
        .await
        .unwrap();

    assert_eq!(transport.count(Method::Put), 1);
    assert_eq!(uploaded, -2);
    assert!(target.changelog().is_empty());
    assert!(target.get("/ab/contacts/1.vcf").is_none());
    assert!(target.get("/ab/contacts/2.vcf").is_none());
}

/// ## Summary
/// The delete pause applies once per full dispatch batch, not after every
/// single DELETE.
#[test_log::test(tokio::test(start_paused = true))]
async fn delete_pause_applies_per_batch() {
    let transport = MockTransport::new();
    transport.push_status(200);
    transport.push_status(200);
    transport.push_status(200);

    let folder = folder("/ab/contacts/");
    let mut target = MemoryTarget::new();
    for href in ["/ab/contacts/1.vcf", "/ab/contacts/2.vcf", "/ab/contacts/3.vcf"] {
        target.log_change(href, ChangeStatus::DeletedByUser);
    }
    let config = kunai_core::config::SyncConfig {
        batch_size: 2,
        ctag_bound: 20,
        delete_pause_ms: 100,
    };
    let mut conn = connection();

    let started = tokio::time::Instant::now();
    let uploaded = local::run(&transport, &mut conn, &folder, &mut target, &config)
        .await
        .unwrap();

    assert_eq!(uploaded, 3);
    assert_eq!(transport.count(Method::Delete), 3);
    // Two full deletes then a pause; the trailing partial batch has none.
    assert_eq!(started.elapsed().as_millis(), 100);
}

/// ## Summary
/// Deleting something the server already lost (404) still counts as a
/// successful delete.
#[test_log::test(tokio::test)]
async fn delete_tolerates_already_gone() {
    let transport = MockTransport::new();
    transport.push_status(404);

    let folder = folder("/ab/contacts/");
    let mut target = MemoryTarget::new();
    target.log_change("/ab/contacts/1.vcf", ChangeStatus::DeletedByUser);
    let mut conn = connection();
    let uploaded = local::run(&transport, &mut conn, &folder, &mut target, &config())
        .await
        .unwrap();

    assert_eq!(uploaded, 1);
    assert!(target.changelog().is_empty());
    assert_eq!(transport.count(Method::Delete), 1);
}

/// ## Summary
/// End to end: a rejected upload triggers a marker reset and a full
/// remote pass that restores the server's version of the card.
#[test_log::test(tokio::test)]
async fn rejection_repair_restores_server_state() {
    let server_card = simple_card("u-1", "Server Jane");
    let transport = MockTransport::new();
    // Remote pass: CTAG unchanged, one request.
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-1", None));
    // Local phase: PUT rejected.
    transport.push_status(403);
    // Repair pass: markers were reset, full enumeration follows.
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-1", None));
    transport.push_multi(multistatus(
        &[etag_entry("/ab/contacts/1.vcf", "\"e1\"")],
        None,
    ));
    transport.push_multi(multistatus(
        &[address_entry("/ab/contacts/1.vcf", "\"e1\"", &server_card)],
        None,
    ));
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-1", None));

    let account = account();
    let config = config();
    let engine = ReconciliationEngine::new(&transport, &config);
    let mut folder = folder("/ab/contacts/");
    folder.ctag = Some("ctag-1".to_string());
    folder.acl = kunai_core::types::AclMask::ALL;
    let mut target = seeded_target("/ab/contacts/1.vcf", ChangeStatus::ModifiedByUser);
    let mut conn = connection();

    let outcome = engine
        .sync_folder(&mut conn, &account, &mut folder, &mut target)
        .await
        .unwrap();

    let FolderOutcome::Synced { uploaded, .. } = outcome else {
        panic!("expected a synced outcome");
    };
    assert_eq!(uploaded, -1);
    let record = target.get("/ab/contacts/1.vcf").unwrap();
    assert_eq!(record.prop("DisplayName"), Some("Server Jane"));
    assert_eq!(record.ocard.as_deref(), Some(server_card.as_str()));
    assert_eq!(record.etag.as_deref(), Some("\"e1\""));
}

/// ## Summary
/// Download-only folders never upload; pending local mutations are
/// written off instead of retried forever.
#[test_log::test(tokio::test)]
async fn download_only_folders_skip_upload() {
    let transport = MockTransport::new();
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-1", None));

    let account = account();
    let config = config();
    let engine = ReconciliationEngine::new(&transport, &config);
    let mut folder = folder("/ab/contacts/");
    folder.ctag = Some("ctag-1".to_string());
    folder.acl = kunai_core::types::AclMask::ALL;
    folder.download_only = true;
    let mut target = seeded_target("/ab/contacts/1.vcf", ChangeStatus::ModifiedByUser);
    let mut conn = connection();

    let outcome = engine
        .sync_folder(&mut conn, &account, &mut folder, &mut target)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FolderOutcome::Synced {
            remote: kunai_engine::reconcile::RemoteSummary {
                fetched: 0,
                deleted: 0,
                unchanged: true
            },
            uploaded: 0
        }
    );
    assert!(target.changelog().is_empty());
    assert_eq!(transport.count(Method::Put), 0);
}
