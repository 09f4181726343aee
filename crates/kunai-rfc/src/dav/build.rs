//! Hand-assembled WebDAV request bodies.
//!
//! These are deliberately plain strings with explicit namespace
//! declarations rather than serializer output; the exact shapes below are
//! what the broadest set of servers has been field-tested against.

use kunai_core::types::FolderKind;

/// Escapes text for inclusion in XML content.
#[must_use]
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Depth-0 PROPFIND for `current-user-principal`.
#[must_use]
pub fn propfind_current_user_principal() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<d:propfind xmlns:d="DAV:">"#,
        "<d:prop><d:current-user-principal/></d:prop>",
        "</d:propfind>"
    )
    .to_string()
}

/// PROPFIND on the principal for the home-set plus proxy/group targets.
#[must_use]
pub fn propfind_principal(kind: FolderKind) -> String {
    let home_set = match kind {
        FolderKind::CalDav | FolderKind::Ics => {
            r#"<cal:calendar-home-set xmlns:cal="urn:ietf:params:xml:ns:caldav"/>"#
        }
        FolderKind::CardDav => {
            r#"<card:addressbook-home-set xmlns:card="urn:ietf:params:xml:ns:carddav"/>"#
        }
    };
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<d:propfind xmlns:d="DAV:" xmlns:cs="http://calendarserver.org/ns/">"#,
            "<d:prop>{home_set}",
            "<cs:calendar-proxy-read-for/><cs:calendar-proxy-write-for/>",
            "<d:group-membership/>",
            "</d:prop></d:propfind>"
        ),
        home_set = home_set
    )
}

/// Depth-1 PROPFIND enumerating collections under a home-set.
#[must_use]
pub fn propfind_folder_list(kind: FolderKind) -> String {
    let extra = match kind {
        FolderKind::CalDav | FolderKind::Ics => concat!(
            r#"<a:calendar-color xmlns:a="http://apple.com/ns/ical/"/>"#,
            r#"<cs:source xmlns:cs="http://calendarserver.org/ns/"/>"#
        ),
        FolderKind::CardDav => "",
    };
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<d:propfind xmlns:d="DAV:">"#,
            "<d:prop><d:resourcetype/><d:displayname/>",
            "<d:current-user-privilege-set/>{extra}",
            "</d:prop></d:propfind>"
        ),
        extra = extra
    )
}

/// Depth-0 PROPFIND for the collection CTAG.
#[must_use]
pub fn propfind_ctag() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<d:propfind xmlns:d="DAV:" xmlns:cs="http://calendarserver.org/ns/">"#,
        "<d:prop><cs:getctag/><d:sync-token/></d:prop>",
        "</d:propfind>"
    )
    .to_string()
}

/// Depth-1 PROPFIND for member ETags.
#[must_use]
pub fn propfind_etags() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<d:propfind xmlns:d="DAV:">"#,
        "<d:prop><d:getetag/><d:resourcetype/></d:prop>",
        "</d:propfind>"
    )
    .to_string()
}

/// `sync-collection` REPORT with a stored token.
#[must_use]
pub fn report_sync_collection(token: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<d:sync-collection xmlns:d="DAV:">"#,
            "<d:sync-token>{token}</d:sync-token>",
            "<d:sync-level>1</d:sync-level>",
            "<d:prop><d:getetag/></d:prop>",
            "</d:sync-collection>"
        ),
        token = escape_xml(token)
    )
}

/// `addressbook-multiget` REPORT fetching full cards for a batch of hrefs.
#[must_use]
pub fn report_multiget(hrefs: &[String]) -> String {
    let mut body = String::from(concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<card:addressbook-multiget xmlns:d="DAV:" "#,
        r#"xmlns:card="urn:ietf:params:xml:ns:carddav">"#,
        "<d:prop><d:getetag/><card:address-data/></d:prop>"
    ));
    for href in hrefs {
        body.push_str("<d:href>");
        body.push_str(&escape_xml(href));
        body.push_str("</d:href>");
    }
    body.push_str("</card:addressbook-multiget>");
    body
}
