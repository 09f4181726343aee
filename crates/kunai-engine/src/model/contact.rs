//! Contact record: the vCard-backed item of the host address book.

use std::collections::BTreeMap;

/// One address-book item.
///
/// Identity is the resource `href`, never the vCard UID (that stays
/// vCard-internal). `ocard` is the raw vCard exactly as last read from or
/// written to the server; local edits are merged against it and it is
/// only replaced once the server confirms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRecord {
    pub href: String,
    pub etag: Option<String>,
    /// Last server-confirmed raw vCard text, the merge baseline.
    pub ocard: Option<String>,
    /// Structured property values keyed by host property name.
    props: BTreeMap<String, String>,
    /// Mailing list (`kind=group`) marker.
    pub is_list: bool,
    /// For lists: member identifiers (the member's UID property).
    pub members: Vec<String>,
}

impl ContactRecord {
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    /// Property value, `None` when unset or empty.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&str> {
        self.props
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Sets a property; an empty value clears it.
    pub fn set_prop(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.props.remove(name);
        } else {
            self.props.insert(name.to_string(), value.to_string());
        }
    }

    pub fn clear_prop(&mut self, name: &str) {
        self.props.remove(name);
    }

    /// All set properties, for diffing in tests.
    #[must_use]
    pub fn props(&self) -> &BTreeMap<String, String> {
        &self.props
    }
}
