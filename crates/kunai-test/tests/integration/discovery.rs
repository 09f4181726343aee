//! Discovery scenarios: principal resolution, privilege extraction,
//! folder-list merging.

use kunai_core::types::FolderKind;
use kunai_engine::discovery::{DiscoveryService, HomeSet};
use kunai_engine::engine::ReconciliationEngine;
use kunai_engine::model::account::ProviderPreset;

use super::helpers::*;

/// ## Summary
/// A server answering the principal PROPFIND with 404 but a valid
/// multistatus body still yields a usable principal.
#[test_log::test(tokio::test)]
async fn principal_survives_404_with_valid_body() {
    let transport = MockTransport::new();
    transport.push(Scripted::StatusWithBody(
        404,
        principal_body("/.well-known/carddav", "/principals/jane/"),
    ));
    let discovery = DiscoveryService::new(&transport, ProviderPreset::Generic);
    let mut conn = connection();
    let principal = discovery
        .find_principal(&mut conn, FolderKind::CardDav, "/.well-known/carddav")
        .await
        .unwrap();
    assert_eq!(principal, "/principals/jane/");
}

/// ## Summary
/// A plain 404 with no multistatus body is a malformed-response failure,
/// not a panic or a silent empty result.
#[test_log::test(tokio::test)]
async fn principal_hard_fails_without_body() {
    let transport = MockTransport::new();
    transport.push_status(404);
    let discovery = DiscoveryService::new(&transport, ProviderPreset::Generic);
    let mut conn = connection();
    let error = discovery
        .find_principal(&mut conn, FolderKind::CardDav, "/")
        .await
        .unwrap_err();
    assert_eq!(error.kind.code(), "malformed-response");
}

/// ## Summary
/// Collections without the read privilege are excluded from the listing;
/// readable ones carry the accumulated bitmask.
#[test_log::test(tokio::test)]
async fn unreadable_collections_are_excluded() {
    let transport = MockTransport::new();
    transport.push_multi(multistatus(
        &[
            addressbook_entry("/ab/open/", "Open", &["read", "write-content", "bind"]),
            addressbook_entry("/ab/blind/", "Blind", &["write-content", "bind"]),
        ],
        None,
    ));
    let discovery = DiscoveryService::new(&transport, ProviderPreset::Generic);
    let mut conn = connection();
    let homes = [HomeSet {
        href: "/ab/".to_string(),
        shared: false,
    }];
    let folders = discovery
        .list_folders(&mut conn, FolderKind::CardDav, &homes)
        .await
        .unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].href, "/ab/open/");
    assert_eq!(folders[0].acl.0, 0x7);
    assert!(folders[0].writable());
}

/// ## Summary
/// iCloud-style listings omit the privilege set entirely; the provider
/// quirk grants read access instead of excluding everything.
#[test_log::test(tokio::test)]
async fn missing_privilege_set_honors_provider_quirk() {
    let body = multistatus(
        &[ok_response(
            "/ab/default/",
            concat!(
                "<d:resourcetype><d:collection/><card:addressbook/></d:resourcetype>",
                "<d:displayname>Default</d:displayname>"
            ),
        )],
        None,
    );
    let homes = [HomeSet {
        href: "/ab/".to_string(),
        shared: false,
    }];

    let transport = MockTransport::new();
    transport.push_multi(body.clone());
    let quirky = DiscoveryService::new(&transport, ProviderPreset::ICloud);
    let mut conn = connection();
    let folders = quirky
        .list_folders(&mut conn, FolderKind::CardDav, &homes)
        .await
        .unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].acl.0, 0x1);
    assert!(!folders[0].writable());

    let transport = MockTransport::new();
    transport.push_multi(body);
    let strict = DiscoveryService::new(&transport, ProviderPreset::Generic);
    let folders = strict
        .list_folders(&mut conn, FolderKind::CardDav, &homes)
        .await
        .unwrap();
    assert!(folders.is_empty());
}

/// ## Summary
/// Providers with known-broken challenge handling get the host flagged
/// for pre-emptive Basic auth before any request is sent.
#[test_log::test(tokio::test)]
async fn broken_auth_providers_are_pre_flagged() {
    let transport = MockTransport::new();
    let mut account = account();
    account.provider = ProviderPreset::Yahoo;
    let config = config();
    let engine = ReconciliationEngine::new(&transport, &config);
    let mut conn = connection();

    // A delegated folder ends the run before the first request, so the
    // flag is the only observable effect.
    let mut folder = folder("/cal/work/");
    folder.kind = FolderKind::CalDav;
    let mut target = kunai_engine::store::MemoryTarget::new();
    engine
        .sync_folder(&mut conn, &account, &mut folder, &mut target)
        .await
        .unwrap();

    assert_eq!(transport.problematic_hosts(), vec!["dav.example.com"]);
    assert!(transport.requests().is_empty());
}

/// ## Summary
/// Full refresh: principal, home-set, listing, and the diff against the
/// previously known folder set.
#[test_log::test(tokio::test)]
async fn refresh_produces_folder_diff() {
    let transport = MockTransport::new();
    transport.push_multi(principal_body("/", "/principals/jane/"));
    transport.push_multi(home_set_body("/principals/jane/", "/ab/"));
    transport.push_multi(multistatus(
        &[addressbook_entry("/ab/contacts/", "Contacts", &["all"])],
        None,
    ));

    let account = account();
    let config = config();
    let engine = ReconciliationEngine::new(&transport, &config);
    let mut conn = connection();
    let mut known = vec![folder("/ab/stale/")];
    let diff = engine
        .refresh_folders(&mut conn, &account, FolderKind::CardDav, &mut known)
        .await
        .unwrap();

    assert_eq!(diff.added, vec!["/ab/contacts/".to_string()]);
    assert_eq!(diff.removed, vec!["/ab/stale/".to_string()]);
    let fresh = known.iter().find(|f| f.href == "/ab/contacts/").unwrap();
    assert_eq!(fresh.acl.0, 0xF);
    assert_eq!(fresh.display_name, "Contacts");
    assert!(known.iter().find(|f| f.href == "/ab/stale/").unwrap().removed);
}
