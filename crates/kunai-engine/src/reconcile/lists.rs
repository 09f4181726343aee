//! Mailing-list (group card) handling.
//!
//! Group cards arrive interleaved with contacts but reference members by
//! UID, so the remote phase defers them until every contact of the batch
//! is in the target. Membership is merged three-way so concurrent edits
//! on both sides survive.

use kunai_rfc::vcard::{VCard, VCardEntry};

use crate::model::contact::ContactRecord;

const KIND_ITEM: &str = "x-addressbookserver-kind";
const MEMBER_ITEM: &str = "x-addressbookserver-member";
const URN_PREFIX: &str = "urn:uuid:";

/// Whether a parsed card is a group card.
#[must_use]
pub fn is_group_card(card: &VCard) -> bool {
    card.text(KIND_ITEM)
        .is_some_and(|kind| kind.eq_ignore_ascii_case("group"))
}

/// Member UIDs of a group card, in card order.
#[must_use]
pub fn group_members(card: &VCard) -> Vec<String> {
    card.entries(MEMBER_ITEM)
        .iter()
        .filter_map(|entry| {
            let value = entry.value.as_text()?.trim();
            let uid = value.strip_prefix(URN_PREFIX).unwrap_or(value);
            (!uid.is_empty()).then(|| uid.to_string())
        })
        .collect()
}

/// Three-way membership merge.
///
/// Members the server removed since the cached copy leave the list;
/// members the server added join it; everything else keeps the local
/// state, so local additions and removals survive a concurrent server
/// edit. Local order is preserved, server additions append.
#[must_use]
pub fn merge_members(local: &[String], old_server: &[String], new_server: &[String]) -> Vec<String> {
    let server_removed: Vec<&String> = old_server
        .iter()
        .filter(|m| !new_server.contains(m))
        .collect();
    let mut merged: Vec<String> = local
        .iter()
        .filter(|m| !server_removed.contains(m))
        .cloned()
        .collect();
    for member in new_server {
        if !old_server.contains(member) && !merged.contains(member) {
            merged.push(member.clone());
        }
    }
    merged
}

/// Builds the card to upload for a locally-changed group.
///
/// The card starts from the baseline so foreign items survive; kind,
/// name, and the member list are rewritten from the record.
#[must_use]
pub fn build_group_card(record: &ContactRecord, baseline: Option<&VCard>) -> VCard {
    let mut card = baseline.cloned().unwrap_or_default();
    card.set(KIND_ITEM, vec![VCardEntry::text("group")]);
    if let Some(name) = record.prop("DisplayName") {
        card.set("fn", vec![VCardEntry::text(name)]);
    }
    if let Some(uid) = record.prop("UID") {
        card.set("uid", vec![VCardEntry::text(uid)]);
    }
    card.set(
        MEMBER_ITEM,
        record
            .members
            .iter()
            .map(|uid| VCardEntry::text(format!("{URN_PREFIX}{uid}")))
            .collect(),
    );
    card.prune_empty();
    card
}

/// Gives a member contact a synthetic address when it has none, so hosts
/// that key list membership on email can still link the member.
pub fn ensure_member_email(record: &mut ContactRecord) {
    if record.prop("PrimaryEmail").is_none() {
        if let Some(uid) = record.prop("UID").map(String::from) {
            record.set_prop("PrimaryEmail", &format!("{uid}@no-email.invalid"));
        }
    }
}
