//! The field table: which record property lives where in a vCard.

use kunai_core::constants::ADR_LAYOUT_FIX_VERSION;
use kunai_core::types::Version;
use kunai_rfc::vcard::{VCard, VCardEntry};

/// Addresses one entry of one vCard item.
///
/// `index` counts among matching entries only: the first entry whose TYPE
/// set includes `wanted` (when set) and none of `invalid` is index 0.
#[derive(Debug, Clone, Copy)]
pub struct VCardFieldSpec {
    pub item: &'static str,
    pub index: usize,
    /// TYPE token the entry must carry.
    pub wanted: Option<&'static str>,
    /// TYPE tokens that disqualify an entry.
    pub invalid: &'static [&'static str],
    /// Group prefix to stamp on entries this spec creates.
    pub prefix: Option<&'static str>,
}

impl VCardFieldSpec {
    const fn plain(item: &'static str) -> Self {
        Self {
            item,
            index: 0,
            wanted: None,
            invalid: &[],
            prefix: None,
        }
    }

    const fn typed(item: &'static str, wanted: &'static str, invalid: &'static [&'static str]) -> Self {
        Self {
            item,
            index: 0,
            wanted: Some(wanted),
            invalid,
            prefix: None,
        }
    }

    const fn slot(item: &'static str, index: usize) -> Self {
        Self {
            item,
            index,
            wanted: None,
            invalid: &[],
            prefix: None,
        }
    }

    fn matches(&self, entry: &VCardEntry) -> bool {
        if let Some(wanted) = self.wanted {
            if !entry.meta.has_type(wanted) {
                return false;
            }
        }
        !self.invalid.iter().any(|t| entry.meta.has_type(t))
    }

    /// Positions of matching entries within the item's entry list.
    fn matching_positions(&self, card: &VCard) -> Vec<usize> {
        card.entries(self.item)
            .iter()
            .enumerate()
            .filter(|(_, e)| self.matches(e))
            .map(|(i, _)| i)
            .collect()
    }

    /// The addressed entry, if present.
    #[must_use]
    pub fn select<'a>(&self, card: &'a VCard) -> Option<&'a VCardEntry> {
        let pos = *self.matching_positions(card).get(self.index)?;
        card.entries(self.item).get(pos)
    }

    /// The addressed entry, creating matching entries up to `index`.
    pub fn ensure<'a>(&self, card: &'a mut VCard) -> &'a mut VCardEntry {
        loop {
            let positions = self.matching_positions(card);
            if let Some(&pos) = positions.get(self.index) {
                return &mut card.entries_mut(self.item)[pos];
            }
            let mut entry = VCardEntry::text("");
            if let Some(wanted) = self.wanted {
                entry.meta.add("TYPE", wanted);
            }
            if let Some(prefix) = self.prefix {
                entry.group = Some(prefix.to_string());
            }
            card.entries_mut(self.item).push(entry);
        }
    }
}

/// Which part of the entry value a field addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Whole,
    Fixed(usize),
    Adr(AdrPart),
}

/// ADR sub-fields, resolved to indices per folder version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdrPart {
    PoBox,
    Extended,
    Street,
    City,
    Region,
    Zip,
    Country,
}

/// Resolves an ADR part to its component index for a folder version.
///
/// Folders synced before the layout fix carried street and extended
/// address swapped; their data stays readable under the old layout
/// instead of silently shifting one component over.
#[must_use]
pub fn adr_index(part: AdrPart, version: Version) -> usize {
    let fixed = version >= ADR_LAYOUT_FIX_VERSION;
    match part {
        AdrPart::PoBox => 0,
        AdrPart::Extended => {
            if fixed {
                1
            } else {
                2
            }
        }
        AdrPart::Street => {
            if fixed {
                2
            } else {
                1
            }
        }
        AdrPart::City => 3,
        AdrPart::Region => 4,
        AdrPart::Zip => 5,
        AdrPart::Country => 6,
    }
}

/// Non-textual handling a field needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Text(Component),
    Photo,
    Birthday,
    /// Full ordered email list with per-entry meta, JSON-encoded.
    EmailJson,
    /// Full ordered phone list with per-entry meta, JSON-encoded.
    PhoneJson,
}

/// One row of the field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    /// Record property name (host address-book vocabulary).
    pub name: &'static str,
    pub spec: VCardFieldSpec,
    pub kind: MapKind,
    /// Fields introduced later than a folder's creation version are
    /// skipped on both read and write for that folder.
    pub min_version: Version,
    /// Download-only fields are derived views (the JSON side-channel is
    /// authoritative for upload).
    pub upload: bool,
}

const V0: Version = Version::new(0, 1, 0);
const V_JSON: Version = Version::new(0, 4, 19);
const V_NAME_EXTRAS: Version = Version::new(0, 8, 8);
const V_BDAY: Version = Version::new(0, 8, 14);

const fn text(
    name: &'static str,
    spec: VCardFieldSpec,
    component: Component,
    min_version: Version,
) -> FieldMapping {
    FieldMapping {
        name,
        spec,
        kind: MapKind::Text(component),
        min_version,
        upload: true,
    }
}

const fn derived(
    name: &'static str,
    spec: VCardFieldSpec,
    component: Component,
) -> FieldMapping {
    FieldMapping {
        name,
        spec,
        kind: MapKind::Text(component),
        min_version: V0,
        upload: false,
    }
}

/// The full field table, in application order.
pub const FIELDS: &[FieldMapping] = &[
    // Identification
    text("DisplayName", VCardFieldSpec::plain("fn"), Component::Whole, V0),
    text("NickName", VCardFieldSpec::plain("nickname"), Component::Whole, V0),
    text("UID", VCardFieldSpec::plain("uid"), Component::Whole, V0),
    text("LastName", VCardFieldSpec::plain("n"), Component::Fixed(0), V0),
    text("FirstName", VCardFieldSpec::plain("n"), Component::Fixed(1), V0),
    text("MiddleName", VCardFieldSpec::plain("n"), Component::Fixed(2), V_NAME_EXTRAS),
    text("NamePrefix", VCardFieldSpec::plain("n"), Component::Fixed(3), V_NAME_EXTRAS),
    text("NameSuffix", VCardFieldSpec::plain("n"), Component::Fixed(4), V_NAME_EXTRAS),
    // Organization
    text("Company", VCardFieldSpec::plain("org"), Component::Fixed(0), V0),
    text("Department", VCardFieldSpec::plain("org"), Component::Fixed(1), V0),
    text("JobTitle", VCardFieldSpec::plain("title"), Component::Whole, V0),
    // Communication: the JSON side-channels carry the full ordered lists;
    // the scalar slots below are read-only projections for the host's two
    // email slots and classic phone fields.
    FieldMapping {
        name: "X-DAV-JSONEmails",
        spec: VCardFieldSpec::plain("email"),
        kind: MapKind::EmailJson,
        min_version: V_JSON,
        upload: true,
    },
    FieldMapping {
        name: "X-DAV-JSONPhones",
        spec: VCardFieldSpec::plain("tel"),
        kind: MapKind::PhoneJson,
        min_version: V_JSON,
        upload: true,
    },
    derived("PrimaryEmail", VCardFieldSpec::slot("email", 0), Component::Whole),
    derived("SecondEmail", VCardFieldSpec::slot("email", 1), Component::Whole),
    derived(
        "CellularNumber",
        VCardFieldSpec::typed("tel", "CELL", &[]),
        Component::Whole,
    ),
    derived(
        "HomePhone",
        VCardFieldSpec::typed("tel", "HOME", &["FAX", "CELL", "PAGER"]),
        Component::Whole,
    ),
    derived(
        "WorkPhone",
        VCardFieldSpec::typed("tel", "WORK", &["FAX", "CELL", "PAGER"]),
        Component::Whole,
    ),
    derived("FaxNumber", VCardFieldSpec::typed("tel", "FAX", &[]), Component::Whole),
    derived(
        "PagerNumber",
        VCardFieldSpec::typed("tel", "PAGER", &[]),
        Component::Whole,
    ),
    // Addresses
    text(
        "HomeAddress",
        VCardFieldSpec::typed("adr", "HOME", &[]),
        Component::Adr(AdrPart::Street),
        V0,
    ),
    text(
        "HomeAddress2",
        VCardFieldSpec::typed("adr", "HOME", &[]),
        Component::Adr(AdrPart::Extended),
        V0,
    ),
    text(
        "HomeCity",
        VCardFieldSpec::typed("adr", "HOME", &[]),
        Component::Adr(AdrPart::City),
        V0,
    ),
    text(
        "HomeState",
        VCardFieldSpec::typed("adr", "HOME", &[]),
        Component::Adr(AdrPart::Region),
        V0,
    ),
    text(
        "HomeZipCode",
        VCardFieldSpec::typed("adr", "HOME", &[]),
        Component::Adr(AdrPart::Zip),
        V0,
    ),
    text(
        "HomeCountry",
        VCardFieldSpec::typed("adr", "HOME", &[]),
        Component::Adr(AdrPart::Country),
        V0,
    ),
    text(
        "WorkAddress",
        VCardFieldSpec::typed("adr", "WORK", &[]),
        Component::Adr(AdrPart::Street),
        V0,
    ),
    text(
        "WorkAddress2",
        VCardFieldSpec::typed("adr", "WORK", &[]),
        Component::Adr(AdrPart::Extended),
        V0,
    ),
    text(
        "WorkCity",
        VCardFieldSpec::typed("adr", "WORK", &[]),
        Component::Adr(AdrPart::City),
        V0,
    ),
    text(
        "WorkState",
        VCardFieldSpec::typed("adr", "WORK", &[]),
        Component::Adr(AdrPart::Region),
        V0,
    ),
    text(
        "WorkZipCode",
        VCardFieldSpec::typed("adr", "WORK", &[]),
        Component::Adr(AdrPart::Zip),
        V0,
    ),
    text(
        "WorkCountry",
        VCardFieldSpec::typed("adr", "WORK", &[]),
        Component::Adr(AdrPart::Country),
        V0,
    ),
    // Misc
    text("WebPage1", VCardFieldSpec::plain("url"), Component::Whole, V0),
    text("Notes", VCardFieldSpec::plain("note"), Component::Whole, V0),
    FieldMapping {
        name: "Photo",
        spec: VCardFieldSpec::plain("photo"),
        kind: MapKind::Photo,
        min_version: V0,
        upload: true,
    },
    FieldMapping {
        name: "Birthday",
        spec: VCardFieldSpec::plain("bday"),
        kind: MapKind::Birthday,
        min_version: V_BDAY,
        upload: true,
    },
];
