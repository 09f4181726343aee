//! XML document parsing into the node tree.

use quick_xml::NsReader;
use quick_xml::events::{BytesRef, Event};
use quick_xml::name::ResolveResult;

use super::namespace::{CALDAV_NS, CARDDAV_NS};
use super::node::XmlNode;

/// Removes characters that are invalid in XML 1.0.
///
/// Some servers emit raw control characters inside property values, which
/// would otherwise abort the whole multistatus parse. Non-character code
/// points (`U+FFFE`, `U+FFFF`) are stripped as well; unpaired surrogates
/// cannot occur in a Rust string.
#[must_use]
pub fn sanitize_xml(input: &str) -> String {
    input
        .chars()
        .filter(|&c| {
            matches!(c, '\u{9}' | '\u{A}' | '\u{D}')
                || ('\u{20}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || c >= '\u{10000}'
        })
        .collect()
}

/// Parses an XML document into a node tree, `None` on any parse failure.
///
/// A `None` here is treated as a hard error by callers; there is no
/// partial recovery from malformed server XML.
#[tracing::instrument(skip(input), fields(len = input.len()))]
#[must_use]
pub fn parse_document(input: &str) -> Option<XmlNode> {
    let sanitized = sanitize_xml(input);
    let mut reader = NsReader::from_str(&sanitized);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_resolved_event() {
            Ok((resolve, Event::Start(e))) => {
                stack.push(make_node(&resolve, e.local_name().as_ref())?);
            }
            Ok((resolve, Event::Empty(e))) => {
                let node = make_node(&resolve, e.local_name().as_ref())?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok((_, Event::End(_))) => {
                let mut node = stack.pop()?;
                // Payload elements carry the exact bytes the server sent;
                // everything else is structural and sheds the surrounding
                // pretty-print whitespace.
                if !is_payload(&node) {
                    node.text = node.text.trim().to_string();
                }
                attach(&mut stack, &mut root, node)?;
            }
            Ok((_, Event::Text(e))) => {
                let text = e.decode().ok()?;
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&text);
                }
            }
            Ok((_, Event::GeneralRef(e))) => {
                let resolved = resolve_reference(&e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&resolved);
                }
            }
            Ok((_, Event::CData(e))) => {
                let text = String::from_utf8(e.into_inner().into_owned()).ok()?;
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&text);
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "XML parse failure");
                return None;
            }
        }
    }

    if !stack.is_empty() {
        tracing::warn!(depth = stack.len(), "unclosed XML elements");
        return None;
    }

    root
}

/// Elements whose text must survive byte-for-byte; the stored server copy
/// of a card is compared verbatim later.
fn is_payload(node: &XmlNode) -> bool {
    node.is(CARDDAV_NS, "address-data") || node.is(CALDAV_NS, "calendar-data")
}

/// Resolves a character or predefined entity reference, `None` on an
/// entity this parser has no definition for.
fn resolve_reference(reference: &BytesRef<'_>) -> Option<String> {
    if let Ok(Some(c)) = reference.resolve_char_ref() {
        return Some(c.to_string());
    }
    let name = reference.decode().ok()?;
    let resolved = match name.as_ref() {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "apos" => "'",
        "quot" => "\"",
        other => {
            tracing::warn!(entity = other, "unresolvable entity reference");
            return None;
        }
    };
    Some(resolved.to_string())
}

fn make_node(resolve: &ResolveResult<'_>, local: &[u8]) -> Option<XmlNode> {
    let namespace = match resolve {
        ResolveResult::Bound(ns) => std::str::from_utf8(ns.as_ref()).ok()?.to_string(),
        ResolveResult::Unbound => String::new(),
        ResolveResult::Unknown(prefix) => {
            tracing::warn!(prefix = ?prefix, "undeclared namespace prefix");
            return None;
        }
    };
    Some(XmlNode::new(namespace, std::str::from_utf8(local).ok()?))
}

fn attach(stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) -> Option<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        if root.is_some() {
            // A second root element is not a document.
            return None;
        }
        *root = Some(node);
    }
    Some(())
}
