//! Test support for the kunai workspace: a scripted transport and
//! multistatus fixture builders for driving the engine without a server.

use std::collections::VecDeque;
use std::sync::Mutex;

use kunai_core::error::{SyncError, SyncResult};
use kunai_rfc::dav::MultiStatus;
use kunai_rfc::dav::build::escape_xml;
use kunai_transport::{Connection, DavRequest, DavResponse, Method, Transport};

/// One scripted server answer.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// A bare status line, no body.
    Status(u16),
    /// A 207 with the given multistatus body.
    Multi(String),
    /// A non-207 status carrying a body (the 404-with-multistatus case).
    StatusWithBody(u16, String),
}

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

/// Transport stand-in that answers from a fixed script.
///
/// Responses are normalized the way the real client does it: 207 bodies
/// become [`DavResponse::MultiStatus`], whitelisted statuses become soft
/// errors (or a multistatus when the body parses as one), everything else
/// is a hard error. Requests are recorded for assertion.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    log: Mutex<Vec<SentRequest>>,
    problematic: Mutex<Vec<String>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
    }

    pub fn push_multi(&self, body: impl Into<String>) {
        self.push(Scripted::Multi(body.into()));
    }

    pub fn push_status(&self, status: u16) {
        self.push(Scripted::Status(status));
    }

    /// Everything sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<SentRequest> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of requests sent with a method.
    #[must_use]
    pub fn count(&self, method: Method) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Methods in send order, for sequence assertions.
    #[must_use]
    pub fn sequence(&self) -> Vec<Method> {
        self.requests().iter().map(|r| r.method).collect()
    }

    /// Hosts flagged for pre-emptive Basic auth.
    #[must_use]
    pub fn problematic_hosts(&self) -> Vec<String> {
        self.problematic
            .lock()
            .map(|hosts| hosts.clone())
            .unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn note_problematic_host(&self, host: &str) {
        if let Ok(mut hosts) = self.problematic.lock() {
            hosts.push(host.to_string());
        }
    }

    async fn send(&self, request: DavRequest, _conn: &mut Connection) -> SyncResult<DavResponse> {
        if let Ok(mut log) = self.log.lock() {
            log.push(SentRequest {
                method: request.method,
                path: request.path.clone(),
                body: request.body.clone(),
            });
        }
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .ok_or_else(|| {
                SyncError::network(format!(
                    "script exhausted at {} {}",
                    request.method, request.path
                ))
            })?;
        match next {
            Scripted::Multi(body) => MultiStatus::parse(&body)
                .map(DavResponse::MultiStatus)
                .ok_or_else(|| SyncError::malformed("fixture body is not a multistatus")),
            Scripted::Status(status) => match status {
                200 | 201 | 204 => Ok(DavResponse::Ok { status }),
                s if request.is_soft(s) => Ok(DavResponse::SoftError { status: s }),
                s => Err(SyncError::status(s, request.path)),
            },
            Scripted::StatusWithBody(status, body) => {
                if request.is_soft(status) {
                    match MultiStatus::parse(&body) {
                        Some(ms) => Ok(DavResponse::MultiStatus(ms)),
                        None => Ok(DavResponse::SoftError { status }),
                    }
                } else {
                    Err(SyncError::status(status, request.path))
                }
            }
        }
    }
}

/// Wraps response fragments into a multistatus document.
#[must_use]
pub fn multistatus(fragments: &[String], sync_token: Option<&str>) -> String {
    let mut body = String::from(concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<d:multistatus xmlns:d="DAV:" xmlns:cs="http://calendarserver.org/ns/" "#,
        r#"xmlns:card="urn:ietf:params:xml:ns:carddav">"#
    ));
    for fragment in fragments {
        body.push_str(fragment);
    }
    if let Some(token) = sync_token {
        body.push_str("<d:sync-token>");
        body.push_str(&escape_xml(token));
        body.push_str("</d:sync-token>");
    }
    body.push_str("</d:multistatus>");
    body
}

/// A `<response>` with one OK propstat around the given prop XML.
#[must_use]
pub fn ok_response(href: &str, props: &str) -> String {
    format!(
        concat!(
            "<d:response><d:href>{href}</d:href>",
            "<d:propstat><d:prop>{props}</d:prop>",
            "<d:status>HTTP/1.1 200 OK</d:status></d:propstat>",
            "</d:response>"
        ),
        href = escape_xml(href),
        props = props
    )
}

/// A `<response>` carrying only a status (sync-collection deletions).
#[must_use]
pub fn status_response(href: &str, status_line: &str) -> String {
    format!(
        "<d:response><d:href>{}</d:href><d:status>{}</d:status></d:response>",
        escape_xml(href),
        status_line
    )
}

/// Depth-0 CTAG probe answer.
#[must_use]
pub fn ctag_body(href: &str, ctag: &str, token: Option<&str>) -> String {
    let mut props = format!("<cs:getctag>{}</cs:getctag>", escape_xml(ctag));
    if let Some(token) = token {
        props.push_str(&format!("<d:sync-token>{}</d:sync-token>", escape_xml(token)));
    }
    multistatus(&[ok_response(href, &props)], None)
}

/// One member row of an ETag enumeration.
#[must_use]
pub fn etag_entry(href: &str, etag: &str) -> String {
    ok_response(
        href,
        &format!("<d:getetag>{}</d:getetag><d:resourcetype/>", escape_xml(etag)),
    )
}

/// One member row of a multiget answer, carrying the full card.
#[must_use]
pub fn address_entry(href: &str, etag: &str, card: &str) -> String {
    ok_response(
        href,
        &format!(
            "<d:getetag>{}</d:getetag><card:address-data>{}</card:address-data>",
            escape_xml(etag),
            escape_xml(card)
        ),
    )
}

/// Principal discovery answer.
#[must_use]
pub fn principal_body(root: &str, principal: &str) -> String {
    multistatus(
        &[ok_response(
            root,
            &format!(
                "<d:current-user-principal><d:href>{}</d:href></d:current-user-principal>",
                escape_xml(principal)
            ),
        )],
        None,
    )
}

/// Addressbook home-set answer for a principal.
#[must_use]
pub fn home_set_body(principal: &str, home: &str) -> String {
    multistatus(
        &[ok_response(
            principal,
            &format!(
                "<card:addressbook-home-set><d:href>{}</d:href></card:addressbook-home-set>",
                escape_xml(home)
            ),
        )],
        None,
    )
}

/// One addressbook row of a folder listing, with named privileges.
#[must_use]
pub fn addressbook_entry(href: &str, name: &str, privileges: &[&str]) -> String {
    let privs: String = privileges
        .iter()
        .map(|p| format!("<d:privilege><d:{p}/></d:privilege>"))
        .collect();
    ok_response(
        href,
        &format!(
            concat!(
                "<d:resourcetype><d:collection/><card:addressbook/></d:resourcetype>",
                "<d:displayname>{name}</d:displayname>",
                "<d:current-user-privilege-set>{privs}</d:current-user-privilege-set>"
            ),
            name = escape_xml(name),
            privs = privs
        ),
    )
}

/// A minimal vCard 3.0 body with CRLF line endings.
#[must_use]
pub fn simple_card(uid: &str, full_name: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:{full_name}\r\nUID:{uid}\r\nEND:VCARD\r\n"
    )
}

/// A group card with the given member UIDs.
#[must_use]
pub fn group_card(uid: &str, name: &str, members: &[&str]) -> String {
    let mut card = format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:{name}\r\nUID:{uid}\r\nX-ADDRESSBOOKSERVER-KIND:group\r\n"
    );
    for member in members {
        card.push_str(&format!("X-ADDRESSBOOKSERVER-MEMBER:urn:uuid:{member}\r\n"));
    }
    card.push_str("END:VCARD\r\n");
    card
}
