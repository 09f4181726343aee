//! Non-textual field handling: photos, birthdays, and the JSON
//! side-channels carrying full email and phone lists.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use kunai_rfc::vcard::{EntryValue, Meta, VCard, VCardEntry};
use serde::{Deserialize, Serialize};

/// Year stamped on birthdays whose year is unknown, per the Apple
/// `X-APPLE-OMIT-YEAR` convention.
pub const OMIT_YEAR: i32 = 1604;

// Canonical encodings separate parts with the ASCII unit separator so
// the smart-merge comparison stays a plain string equality.
const SEP: char = '\u{1f}';

/// A mapped photo, either referenced or carried inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Photo {
    Uri(String),
    /// Base64 payload plus a file extension guessed from the TYPE
    /// parameter.
    Inline { data: String, ext: String },
}

impl Photo {
    /// Reads the first PHOTO entry of a card.
    #[must_use]
    pub fn from_card(card: &VCard) -> Option<Self> {
        let entry = card.first("photo")?;
        let value = entry.value.as_text()?.trim();
        if value.is_empty() {
            return None;
        }
        let inline = entry.meta.values("ENCODING").iter().any(|v| v == "B" || v == "BASE64")
            || !entry.meta.values("VALUE").iter().any(|v| v == "URI" || v == "URL");
        if inline && BASE64.decode(value).is_ok() {
            let ext = entry
                .meta
                .types()
                .iter()
                .find_map(|t| extension_for(t))
                .unwrap_or("jpg");
            Some(Self::Inline {
                data: value.to_string(),
                ext: ext.to_string(),
            })
        } else if value.contains("://") {
            Some(Self::Uri(value.to_string()))
        } else {
            None
        }
    }

    /// Replaces the PHOTO entries of a card.
    pub fn write(photo: Option<&Self>, card: &mut VCard) {
        let Some(photo) = photo else {
            card.remove("photo");
            return;
        };
        let entry = match photo {
            Self::Uri(uri) => {
                let mut entry = VCardEntry::text(uri.clone());
                entry.meta.add("VALUE", "URI");
                entry
            }
            Self::Inline { data, ext } => {
                let mut entry = VCardEntry::text(data.clone());
                entry.meta.add("ENCODING", "B");
                entry.meta.add("TYPE", mime_token(ext));
                entry
            }
        };
        card.set("photo", vec![entry]);
    }

    /// Canonical string form used for change comparison.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Uri(uri) => format!("uri{SEP}{uri}"),
            Self::Inline { data, ext } => format!("bin{SEP}{ext}{SEP}{data}"),
        }
    }

    #[must_use]
    pub fn decode(encoded: &str) -> Option<Self> {
        let mut parts = encoded.split(SEP);
        match parts.next()? {
            "uri" => Some(Self::Uri(parts.next()?.to_string())),
            "bin" => {
                let ext = parts.next()?.to_string();
                let data = parts.next()?.to_string();
                Some(Self::Inline { data, ext })
            }
            _ => None,
        }
    }

    /// Suggested file name for the host's photo store.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::Uri(uri) => uri
                .rsplit('/')
                .next()
                .filter(|n| !n.is_empty())
                .unwrap_or("photo")
                .to_string(),
            Self::Inline { ext, .. } => format!("photo.{ext}"),
        }
    }
}

fn extension_for(type_token: &str) -> Option<&'static str> {
    match type_token {
        "JPEG" | "JPG" | "IMAGE/JPEG" => Some("jpg"),
        "PNG" | "IMAGE/PNG" => Some("png"),
        "GIF" | "IMAGE/GIF" => Some("gif"),
        _ => None,
    }
}

fn mime_token(ext: &str) -> &'static str {
    match ext {
        "png" => "PNG",
        "gif" => "GIF",
        _ => "JPEG",
    }
}

/// A mapped birthday; `year` is `None` when the card omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Birthday {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
}

impl Birthday {
    /// Reads the BDAY entry, tolerating the omitted-year forms
    /// `--MM-DD` and the Apple placeholder year.
    #[must_use]
    pub fn from_card(card: &VCard) -> Option<Self> {
        let entry = card.first("bday")?;
        let text = entry.value.as_text()?.trim();
        let omit_flag = !entry.meta.values("X-APPLE-OMIT-YEAR").is_empty();
        if let Some(rest) = text.strip_prefix("--") {
            let (m, d) = rest.split_once('-')?;
            let month = m.parse().ok()?;
            let day = d.parse().ok()?;
            NaiveDate::from_ymd_opt(OMIT_YEAR, month, day)?;
            return Some(Self {
                year: None,
                month,
                day,
            });
        }
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(text, "%Y%m%d"))
            .ok()?;
        use chrono::Datelike;
        let year = date.year();
        let omitted = omit_flag || year == OMIT_YEAR;
        Some(Self {
            year: (!omitted).then_some(year),
            month: date.month(),
            day: date.day(),
        })
    }

    /// Replaces the BDAY entry. Unknown years are written with the
    /// placeholder year and the omit marker so peers that only accept
    /// full dates still round-trip the value.
    pub fn write(birthday: Option<&Self>, card: &mut VCard) {
        let Some(b) = birthday else {
            card.remove("bday");
            return;
        };
        let entry = match b.year {
            Some(year) => VCardEntry::text(format!("{year:04}-{:02}-{:02}", b.month, b.day)),
            None => {
                let mut entry =
                    VCardEntry::text(format!("{OMIT_YEAR}-{:02}-{:02}", b.month, b.day));
                entry.meta.add("X-APPLE-OMIT-YEAR", &OMIT_YEAR.to_string());
                entry
            }
        };
        card.set("bday", vec![entry]);
    }

    #[must_use]
    pub fn encode(&self) -> String {
        match self.year {
            Some(y) => format!("{y:04}-{:02}-{:02}", self.month, self.day),
            None => format!("--{:02}-{:02}", self.month, self.day),
        }
    }

    #[must_use]
    pub fn decode(encoded: &str) -> Option<Self> {
        if let Some(rest) = encoded.strip_prefix("--") {
            let (m, d) = rest.split_once('-')?;
            return Some(Self {
                year: None,
                month: m.parse().ok()?,
                day: d.parse().ok()?,
            });
        }
        let mut parts = encoded.splitn(3, '-');
        Some(Self {
            year: Some(parts.next()?.parse().ok()?),
            month: parts.next()?.parse().ok()?,
            day: parts.next()?.parse().ok()?,
        })
    }
}

/// One element of a JSON side-channel list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<String>,
}

/// Serializes the full ordered entry list of an item (emails or phones)
/// with each entry's TYPE tokens.
#[must_use]
pub fn multi_values_json(card: &VCard, item: &str) -> Option<String> {
    let values: Vec<MultiValue> = card
        .entries(item)
        .iter()
        .filter_map(|e| {
            let value = e.value.as_text()?.trim();
            (!value.is_empty()).then(|| MultiValue {
                value: value.to_string(),
                meta: e.meta.types().to_vec(),
            })
        })
        .collect();
    if values.is_empty() {
        return None;
    }
    serde_json::to_string(&values).ok()
}

/// Replaces all entries of an item from the JSON side-channel form.
/// Malformed JSON is ignored rather than destroying existing entries.
pub fn write_multi_values(json: Option<&str>, card: &mut VCard, item: &str) {
    let Some(json) = json else {
        card.remove(item);
        return;
    };
    let Ok(values) = serde_json::from_str::<Vec<MultiValue>>(json) else {
        tracing::warn!(item, "ignoring malformed multi-value payload");
        return;
    };
    let entries: Vec<VCardEntry> = values
        .into_iter()
        .filter(|v| !v.value.is_empty())
        .map(|v| {
            let mut entry = VCardEntry {
                group: None,
                value: EntryValue::Text(v.value),
                meta: Meta::new(),
            };
            for token in &v.meta {
                entry.meta.add("TYPE", token);
            }
            entry
        })
        .collect();
    card.set(item, entries);
}
