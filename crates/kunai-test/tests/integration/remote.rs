//! Remote-phase scenarios: CTAG short-circuit, stabilization bound,
//! token fallback, download merging, mailing lists.

use kunai_core::error::SyncErrorKind;
use kunai_core::types::ChangeStatus;
use kunai_engine::model::contact::ContactRecord;
use kunai_engine::reconcile::remote;
use kunai_engine::store::{MemoryTarget, SyncTarget};
use kunai_transport::Method;

use super::helpers::*;

/// ## Summary
/// An unchanged CTAG costs exactly one request and touches nothing.
#[test_log::test(tokio::test)]
async fn unchanged_ctag_is_one_propfind() {
    let transport = MockTransport::new();
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-1", None));

    let mut folder = folder("/ab/contacts/");
    folder.ctag = Some("ctag-1".to_string());
    let mut target = MemoryTarget::new();
    let mut conn = connection();
    let summary = remote::run(&transport, &mut conn, &mut folder, &mut target, &config(), true)
        .await
        .unwrap();

    assert!(summary.unchanged);
    assert_eq!(summary.fetched, 0);
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(transport.count(Method::Propfind), 1);
}

/// ## Summary
/// A CTAG that moves on every poll terminates with the stabilization
/// failure after exactly the configured bound, never spinning forever.
#[test_log::test(tokio::test)]
async fn unstable_ctag_fails_after_bound() {
    let transport = MockTransport::new();
    let empty_listing = multistatus(&[], None);
    // Initial probe, then per iteration one enumeration and one re-probe,
    // each probe answering a fresh CTAG.
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-0", None));
    for i in 0..config().ctag_bound {
        transport.push_multi(empty_listing.clone());
        transport.push_multi(ctag_body("/ab/contacts/", &format!("ctag-{}", i + 1), None));
    }

    let mut folder = folder("/ab/contacts/");
    let mut target = MemoryTarget::new();
    let mut conn = connection();
    let error = remote::run(&transport, &mut conn, &mut folder, &mut target, &config(), true)
        .await
        .unwrap_err();

    assert_eq!(error.kind, SyncErrorKind::UnstableCtag);
    assert_eq!(error.kind.code(), "could-not-get-stable-ctag");
    let expected = 1 + 2 * usize::try_from(config().ctag_bound).unwrap();
    assert_eq!(transport.requests().len(), expected);
}

/// ## Summary
/// A soft-failed sync-collection REPORT falls back to the CTAG strategy
/// within the same pass instead of surfacing an error.
#[test_log::test(tokio::test)]
async fn rejected_token_falls_back_to_ctag() {
    let transport = MockTransport::new();
    transport.push_status(415);
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-1", None));
    transport.push_multi(multistatus(&[], None));
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-1", Some("tok-2")));

    let mut folder = folder("/ab/contacts/");
    folder.ctag = Some("stale".to_string());
    folder.token = Some("tok-1".to_string());
    let mut target = MemoryTarget::new();
    let mut conn = connection();
    let summary = remote::run(&transport, &mut conn, &mut folder, &mut target, &config(), true)
        .await
        .unwrap();

    assert!(!summary.unchanged);
    assert_eq!(
        transport.sequence(),
        vec![Method::Report, Method::Propfind, Method::Propfind, Method::Propfind]
    );
    assert_eq!(folder.ctag.as_deref(), Some("ctag-1"));
    assert_eq!(folder.token.as_deref(), Some("tok-2"));
}

/// ## Summary
/// Download path: new and moved ETags are fetched in one multiget, the
/// cached copy and ETag are stored, server deletions are absorbed.
#[test_log::test(tokio::test)]
async fn downloads_changes_and_absorbs_deletions() {
    let card = simple_card("u-1", "Jane Doe");
    let transport = MockTransport::new();
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-2", None));
    transport.push_multi(multistatus(&[etag_entry("/ab/contacts/1.vcf", "\"e2\"")], None));
    transport.push_multi(multistatus(
        &[address_entry("/ab/contacts/1.vcf", "\"e2\"", &card)],
        None,
    ));
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-2", None));

    let mut folder = folder("/ab/contacts/");
    folder.ctag = Some("ctag-1".to_string());
    let mut target = MemoryTarget::new();
    // A record the server no longer lists: must be deleted locally.
    target.upsert(ContactRecord::new("/ab/contacts/gone.vcf"));
    let mut conn = connection();
    let summary = remote::run(&transport, &mut conn, &mut folder, &mut target, &config(), true)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.deleted, 1);
    assert!(target.get("/ab/contacts/gone.vcf").is_none());
    let record = target.get("/ab/contacts/1.vcf").unwrap();
    assert_eq!(record.prop("DisplayName"), Some("Jane Doe"));
    assert_eq!(record.etag.as_deref(), Some("\"e2\""));
    assert_eq!(record.ocard.as_deref(), Some(card.as_str()));
    assert_eq!(folder.ctag.as_deref(), Some("ctag-2"));
}

/// ## Summary
/// Mailing-list membership merges three-way: cached {A,B,C}, server now
/// {B,C,D}, local {A,C,E} resolves to {C,D,E}.
#[test_log::test(tokio::test)]
async fn group_membership_merges_three_way() {
    let old_group = group_card("g-1", "Team", &["A", "B", "C"]);
    let new_group = group_card("g-1", "Team", &["B", "C", "D"]);

    let transport = MockTransport::new();
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-2", None));
    transport.push_multi(multistatus(
        &[etag_entry("/ab/contacts/team.vcf", "\"e2\"")],
        None,
    ));
    transport.push_multi(multistatus(
        &[address_entry("/ab/contacts/team.vcf", "\"e2\"", &new_group)],
        None,
    ));
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-2", None));

    let mut folder = folder("/ab/contacts/");
    folder.ctag = Some("ctag-1".to_string());
    let mut target = MemoryTarget::new();
    let mut record = ContactRecord::new("/ab/contacts/team.vcf");
    record.is_list = true;
    record.etag = Some("\"e1\"".to_string());
    record.ocard = Some(old_group);
    record.members = vec!["A".to_string(), "C".to_string(), "E".to_string()];
    target.upsert(record);
    let mut conn = connection();
    remote::run(&transport, &mut conn, &mut folder, &mut target, &config(), true)
        .await
        .unwrap();

    let mut members = target.get("/ab/contacts/team.vcf").unwrap().members;
    members.sort();
    assert_eq!(members, vec!["C".to_string(), "D".to_string(), "E".to_string()]);
}

/// ## Summary
/// With group sync disabled, group cards are ignored wholesale.
#[test_log::test(tokio::test)]
async fn group_cards_skipped_when_disabled() {
    let new_group = group_card("g-1", "Team", &["A"]);
    let transport = MockTransport::new();
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-2", None));
    transport.push_multi(multistatus(
        &[etag_entry("/ab/contacts/team.vcf", "\"e1\"")],
        None,
    ));
    transport.push_multi(multistatus(
        &[address_entry("/ab/contacts/team.vcf", "\"e1\"", &new_group)],
        None,
    ));
    transport.push_multi(ctag_body("/ab/contacts/", "ctag-2", None));

    let mut folder = folder("/ab/contacts/");
    folder.ctag = Some("old".to_string());
    let mut target = MemoryTarget::new();
    let mut conn = connection();
    let summary = remote::run(&transport, &mut conn, &mut folder, &mut target, &config(), false)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 0);
    assert!(target.get("/ab/contacts/team.vcf").is_none());
}

/// ## Summary
/// Token strategy: not-found responses in the sync-collection REPORT
/// delete locally; the next token is stored.
#[test_log::test(tokio::test)]
async fn token_pass_applies_deletions() {
    let transport = MockTransport::new();
    transport.push_multi(multistatus(
        &[status_response(
            "/ab/contacts/gone.vcf",
            "HTTP/1.1 404 Not Found",
        )],
        Some("tok-2"),
    ));

    let mut folder = folder("/ab/contacts/");
    folder.token = Some("tok-1".to_string());
    let mut target = MemoryTarget::new();
    target.upsert(ContactRecord::new("/ab/contacts/gone.vcf"));
    let mut conn = connection();
    let summary = remote::run(&transport, &mut conn, &mut folder, &mut target, &config(), true)
        .await
        .unwrap();

    assert_eq!(summary.deleted, 1);
    assert!(target.get("/ab/contacts/gone.vcf").is_none());
    assert_eq!(folder.token.as_deref(), Some("tok-2"));
    assert_eq!(
        target.changelog()[0].status,
        ChangeStatus::DeletedByServer
    );
}
