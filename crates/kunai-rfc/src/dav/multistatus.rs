//! Multistatus (207) response normalization.

use super::namespace::DAV_NS;
use super::node::XmlNode;
use super::parse::parse_document;

/// One normalized multistatus entry.
///
/// A `<response>` with n `<propstat>` children yields n entries sharing
/// the response href; a `<response>` without any yields one raw entry
/// whose node is the response element itself.
#[derive(Debug, Clone)]
pub struct MsEntry {
    /// Server-relative resource path from `<href>`.
    pub href: String,
    /// HTTP status of the owning `<propstat>`, when there is one.
    pub status: Option<u16>,
    /// HTTP status of the `<response>` element's own `<status>`.
    pub response_status: Option<u16>,
    /// The `<prop>` node (propstat entries) or the `<response>` node
    /// (raw entries), for later field extraction.
    pub node: XmlNode,
}

impl MsEntry {
    /// Whether this entry reports success (200-level propstat status).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self.status.or(self.response_status), Some(200..=299))
    }

    /// Whether this entry reports the resource as gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.status.or(self.response_status), Some(404 | 410))
    }

    /// `getetag` value inside this entry's prop node, if any.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.node
            .child(DAV_NS, "getetag")
            .and_then(XmlNode::non_empty_text)
    }
}

/// A normalized 207 response.
#[derive(Debug, Clone, Default)]
pub struct MultiStatus {
    pub entries: Vec<MsEntry>,
    /// `<sync-token>` at multistatus level, when the server sent one.
    pub sync_token: Option<String>,
}

impl MultiStatus {
    /// Parses a 207 body; `None` when the body is not a multistatus
    /// document (hard error at call sites).
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        let root = parse_document(body)?;
        if !root.is(DAV_NS, "multistatus") {
            tracing::warn!(
                namespace = %root.namespace,
                local = %root.local,
                "expected multistatus root"
            );
            return None;
        }

        let sync_token = root
            .child(DAV_NS, "sync-token")
            .and_then(XmlNode::non_empty_text)
            .map(str::to_string);

        let mut entries = Vec::new();
        for response in root.children_named(DAV_NS, "response") {
            let Some(href) = response
                .child(DAV_NS, "href")
                .and_then(XmlNode::non_empty_text)
            else {
                tracing::debug!("response without href skipped");
                continue;
            };
            let response_status = response
                .child(DAV_NS, "status")
                .and_then(|n| parse_status_line(&n.text));

            let propstats: Vec<&XmlNode> =
                response.children_named(DAV_NS, "propstat").collect();
            if propstats.is_empty() {
                entries.push(MsEntry {
                    href: href.to_string(),
                    status: None,
                    response_status,
                    node: response.clone(),
                });
            } else {
                for propstat in propstats {
                    let status = propstat
                        .child(DAV_NS, "status")
                        .and_then(|n| parse_status_line(&n.text));
                    let node = propstat
                        .child(DAV_NS, "prop")
                        .cloned()
                        .unwrap_or_else(|| propstat.clone());
                    entries.push(MsEntry {
                        href: href.to_string(),
                        status,
                        response_status,
                        node,
                    });
                }
            }
        }

        Some(Self {
            entries,
            sync_token,
        })
    }
}

/// Extracts the numeric status from an `HTTP/1.1 200 OK` line.
#[must_use]
pub fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dav::DAV_NS;

    const BODY: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:">
  <d:sync-token>http://example.com/ns/sync/1234</d:sync-token>
  <d:response>
    <d:href>/ab/one.vcf</d:href>
    <d:propstat>
      <d:prop><d:getetag>"1"</d:getetag></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
    <d:propstat>
      <d:prop><d:displayname/></d:prop>
      <d:status>HTTP/1.1 404 Not Found</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/ab/gone.vcf</d:href>
    <d:status>HTTP/1.1 404 Not Found</d:status>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn one_entry_per_propstat() {
        let ms = MultiStatus::parse(BODY).unwrap();
        assert_eq!(ms.entries.len(), 3);
        assert_eq!(ms.entries[0].status, Some(200));
        assert_eq!(ms.entries[1].status, Some(404));
        assert_eq!(ms.entries[0].href, "/ab/one.vcf");
    }

    #[test]
    fn raw_entry_without_propstat() {
        let ms = MultiStatus::parse(BODY).unwrap();
        let raw = &ms.entries[2];
        assert_eq!(raw.status, None);
        assert_eq!(raw.response_status, Some(404));
        assert!(raw.is_not_found());
        assert!(raw.node.is(DAV_NS, "response"));
    }

    #[test]
    fn sync_token_extracted() {
        let ms = MultiStatus::parse(BODY).unwrap();
        assert_eq!(
            ms.sync_token.as_deref(),
            Some("http://example.com/ns/sync/1234")
        );
    }

    #[test]
    fn propstat_entry_node_is_prop() {
        let ms = MultiStatus::parse(BODY).unwrap();
        assert_eq!(ms.entries[0].etag(), Some("\"1\""));
    }

    #[test]
    fn non_multistatus_root_is_none() {
        assert!(MultiStatus::parse(r#"<d:error xmlns:d="DAV:"/>"#).is_none());
    }

    #[test]
    fn status_line_parsing() {
        assert_eq!(parse_status_line("HTTP/1.1 207 Multi-Status"), Some(207));
        assert_eq!(parse_status_line("garbage"), None);
    }
}
