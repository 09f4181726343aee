//! Bidirectional field mapper between vCards and host contact records.
//!
//! Both directions merge instead of overwriting: a field only moves when
//! its value differs from the value carried by the cached server copy
//! (the baseline). Fields the peer never touched keep their local value,
//! and unmapped vCard items survive an upload untouched because the
//! outgoing card is built on top of the baseline card.

pub mod special;
pub mod table;

use kunai_core::types::Version;
use kunai_rfc::vcard::{EntryValue, VCard, VCardEntry, generate, parse};
use uuid::Uuid;

use crate::model::contact::ContactRecord;
use special::{Birthday, Photo, multi_values_json, write_multi_values};
use table::{AdrPart, Component, FIELDS, FieldMapping, MapKind, adr_index};

/// Field mapper bound to one folder's creation version.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper {
    version: Version,
}

impl FieldMapper {
    #[must_use]
    pub const fn new(version: Version) -> Self {
        Self { version }
    }

    /// Fields active for this folder version, in table order.
    fn fields(self) -> impl Iterator<Item = &'static FieldMapping> {
        FIELDS.iter().filter(move |f| f.min_version <= self.version)
    }

    fn component_index(self, component: Component) -> usize {
        match component {
            Component::Whole => 0,
            Component::Fixed(i) => i,
            Component::Adr(part) => adr_index(part, self.version),
        }
    }

    /// Canonical string value of a field as carried by a card.
    #[must_use]
    pub fn read_card(self, card: &VCard, field: &FieldMapping) -> Option<String> {
        match field.kind {
            MapKind::Text(component) => {
                let entry = field.spec.select(card)?;
                let value = match component {
                    Component::Whole => entry.value.as_text().unwrap_or_else(|| {
                        // A structured value under a whole-text field:
                        // fall back to the first component.
                        entry.value.component(0)
                    }),
                    other => entry.value.component(self.component_index(other)),
                };
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            }
            MapKind::Photo => Photo::from_card(card).map(|p| p.encode()),
            MapKind::Birthday => Birthday::from_card(card).map(|b| b.encode()),
            MapKind::EmailJson => multi_values_json(card, "email"),
            MapKind::PhoneJson => multi_values_json(card, "tel"),
        }
    }

    /// Writes a field into a card; `None` clears it.
    pub fn write_card(self, card: &mut VCard, field: &FieldMapping, value: Option<&str>) {
        match field.kind {
            MapKind::Text(component) => {
                let value = value.unwrap_or("");
                if value.is_empty() && field.spec.select(card).is_none() {
                    return;
                }
                let entry = field.spec.ensure(card);
                match component {
                    Component::Whole => match &mut entry.value {
                        v @ EntryValue::Text(_) => {
                            *v = EntryValue::Text(value.to_string());
                        }
                        structured => structured.set_component(0, value),
                    },
                    other => {
                        let index = self.component_index(other);
                        entry.value.set_component(index, value);
                    }
                }
            }
            MapKind::Photo => Photo::write(value.and_then(Photo::decode).as_ref(), card),
            MapKind::Birthday => {
                Birthday::write(value.and_then(Birthday::decode).as_ref(), card);
            }
            MapKind::EmailJson => write_multi_values(value, card, "email"),
            MapKind::PhoneJson => write_multi_values(value, card, "tel"),
        }
    }

    fn record_get(record: &ContactRecord, field: &FieldMapping) -> Option<String> {
        record
            .prop(field.name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    }

    fn record_set(record: &mut ContactRecord, field: &FieldMapping, value: Option<&str>) {
        match value {
            Some(v) => record.set_prop(field.name, v),
            None => record.clear_prop(field.name),
        }
    }

    /// Merges a downloaded card into a record.
    ///
    /// With a baseline (the previously cached server copy), a field is
    /// only applied when the server value actually moved since the
    /// baseline, so concurrent local edits to other fields survive.
    /// Without a baseline every server value is applied.
    pub fn apply_card_to_record(
        self,
        record: &mut ContactRecord,
        server: &VCard,
        baseline: Option<&VCard>,
    ) {
        for field in self.fields() {
            let new = self.read_card(server, field);
            if let Some(base) = baseline {
                if self.read_card(base, field) == new {
                    continue;
                }
            }
            Self::record_set(record, field, new.as_deref());
        }
    }

    /// Builds the card to upload for a record.
    ///
    /// The card starts from the baseline so unmapped items survive; a
    /// mapped field is only rewritten when the record's value differs
    /// from what the baseline already carries. A missing UID is minted
    /// and written back to the record.
    pub fn record_to_card(self, record: &mut ContactRecord, baseline: Option<&VCard>) -> VCard {
        let mut card = baseline.cloned().unwrap_or_default();
        for field in self.fields() {
            if !field.upload {
                continue;
            }
            let wanted = Self::record_get(record, field);
            let current = baseline.and_then(|b| self.read_card(b, field));
            if wanted != current {
                self.write_card(&mut card, field, wanted.as_deref());
            }
        }
        if record.prop("UID").is_none() && !card.contains("uid") {
            let uid = Uuid::new_v4().to_string();
            record.set_prop("UID", &uid);
            card.push("uid", VCardEntry::text(uid));
        }
        if !card.contains("fn") {
            if let Some(display) = display_name_fallback(record) {
                card.push("fn", VCardEntry::text(display));
            }
        }
        card.prune_empty();
        card
    }

    /// Whether an upload is actually needed: the record's mapped state,
    /// rendered onto the baseline, differs textually from the baseline.
    #[must_use]
    pub fn record_differs(self, record: &ContactRecord, baseline: &VCard) -> bool {
        let mut probe = record.clone();
        let rendered = self.record_to_card(&mut probe, Some(baseline));
        let mut normalized = baseline.clone();
        normalized.prune_empty();
        generate(&rendered) != generate(&normalized)
    }
}

fn display_name_fallback(record: &ContactRecord) -> Option<String> {
    if let Some(name) = record.prop("DisplayName") {
        return Some(name.to_string());
    }
    let first = record.prop("FirstName").unwrap_or("");
    let last = record.prop("LastName").unwrap_or("");
    let joined = [first, last]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Parses a cached card, tolerating an absent cache.
#[must_use]
pub fn parse_baseline(ocard: Option<&str>) -> Option<VCard> {
    ocard.and_then(|text| parse(text).ok())
}
