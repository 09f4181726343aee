//! Core vCard model: entry map, entry values, parameter lists.

use std::collections::BTreeMap;

/// Item names whose value is component-structured (split on `;`).
pub const STRUCTURED_ITEMS: &[&str] = &["n", "adr", "org", "geo"];

/// A parsed entry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    Text(String),
    /// Ordered components of a structured item such as N or ADR.
    Structured(Vec<String>),
}

impl EntryValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Structured(_) => None,
        }
    }

    /// Returns the component at `index`, empty string if absent.
    #[must_use]
    pub fn component(&self, index: usize) -> &str {
        match self {
            Self::Structured(parts) => parts.get(index).map_or("", String::as_str),
            Self::Text(s) if index == 0 => s,
            Self::Text(_) => "",
        }
    }

    /// Writes the component at `index`, padding the array first.
    pub fn set_component(&mut self, index: usize, value: impl Into<String>) {
        let parts = match self {
            Self::Structured(parts) => parts,
            Self::Text(s) => {
                let existing = std::mem::take(s);
                *self = Self::Structured(vec![existing]);
                match self {
                    Self::Structured(parts) => parts,
                    Self::Text(_) => unreachable!(),
                }
            }
        };
        if parts.len() <= index {
            parts.resize(index + 1, String::new());
        }
        parts[index] = value.into();
    }

    /// Whether every component (or the text) is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Structured(parts) => parts.iter().all(String::is_empty),
        }
    }
}

/// Entry parameters, normalized to upper-case tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Meta {
    /// Parameter name (upper-case) to value tokens (upper-case), in
    /// appearance order.
    pub params: Vec<(String, Vec<String>)>,
}

impl Meta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All value tokens of a parameter, empty slice if absent.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        let wanted = name.to_ascii_uppercase();
        self.params
            .iter()
            .find(|(n, _)| *n == wanted)
            .map_or(&[], |(_, v)| v.as_slice())
    }

    /// TYPE tokens of this entry.
    #[must_use]
    pub fn types(&self) -> &[String] {
        self.values("TYPE")
    }

    #[must_use]
    pub fn has_type(&self, token: &str) -> bool {
        let wanted = token.to_ascii_uppercase();
        self.types().iter().any(|t| *t == wanted)
    }

    /// Appends a value token, creating the parameter if needed.
    pub fn add(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_uppercase();
        let value = value.to_ascii_uppercase();
        if let Some((_, values)) = self.params.iter_mut().find(|(n, _)| *n == name) {
            if !values.contains(&value) {
                values.push(value);
            }
        } else {
            self.params.push((name, vec![value]));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// One entry of one vCard item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VCardEntry {
    /// Property group prefix (`item1` in `item1.TEL`).
    pub group: Option<String>,
    pub value: EntryValue,
    pub meta: Meta,
}

impl VCardEntry {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            group: None,
            value: EntryValue::Text(value.into()),
            meta: Meta::new(),
        }
    }

    #[must_use]
    pub fn structured(parts: Vec<String>) -> Self {
        Self {
            group: None,
            value: EntryValue::Structured(parts),
            meta: Meta::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, token: &str) -> Self {
        self.meta.add("TYPE", token);
        self
    }
}

/// A parsed vCard: lower-cased item name to ordered entry list.
///
/// `BEGIN`/`END`/`VERSION` are structural and never stored; the generator
/// re-emits them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VCard {
    items: BTreeMap<String, Vec<VCardEntry>>,
}

impl VCard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries of an item, empty slice if absent.
    #[must_use]
    pub fn entries(&self, item: &str) -> &[VCardEntry] {
        self.items
            .get(&item.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    pub fn entries_mut(&mut self, item: &str) -> &mut Vec<VCardEntry> {
        self.items.entry(item.to_ascii_lowercase()).or_default()
    }

    #[must_use]
    pub fn first(&self, item: &str) -> Option<&VCardEntry> {
        self.entries(item).first()
    }

    /// First text value of an item.
    #[must_use]
    pub fn text(&self, item: &str) -> Option<&str> {
        self.first(item).and_then(|e| e.value.as_text())
    }

    pub fn push(&mut self, item: &str, entry: VCardEntry) {
        self.entries_mut(item).push(entry);
    }

    /// Replaces all entries of an item.
    pub fn set(&mut self, item: &str, entries: Vec<VCardEntry>) {
        if entries.is_empty() {
            self.items.remove(&item.to_ascii_lowercase());
        } else {
            self.items.insert(item.to_ascii_lowercase(), entries);
        }
    }

    pub fn remove(&mut self, item: &str) -> Option<Vec<VCardEntry>> {
        self.items.remove(&item.to_ascii_lowercase())
    }

    /// Items in canonical (alphabetical) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[VCardEntry])> {
        self.items
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    #[must_use]
    pub fn contains(&self, item: &str) -> bool {
        !self.entries(item).is_empty()
    }

    /// Drops entries whose value is entirely empty, then empty items.
    pub fn prune_empty(&mut self) {
        for entries in self.items.values_mut() {
            entries.retain(|e| !e.value.is_empty());
        }
        self.items.retain(|_, entries| !entries.is_empty());
    }
}
