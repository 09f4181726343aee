//! Namespace-resolved XML node tree and the node-path evaluator.

/// One element of a parsed XML document.
///
/// Namespaces are resolved at parse time; prefixes are gone by the time a
/// node exists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    /// Resolved namespace URI, empty when unbound.
    pub namespace: String,
    /// Local element name.
    pub local: String,
    /// Concatenated character data directly inside this element. Trimmed
    /// for structural elements, verbatim for card/calendar payloads.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Whether this node is `(namespace, local)`.
    #[must_use]
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace == namespace && self.local == local
    }

    /// First direct child matching `(namespace, local)`.
    #[must_use]
    pub fn child(&self, namespace: &str, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.is(namespace, local))
    }

    /// All direct children matching `(namespace, local)`.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.is(namespace, local))
    }

    /// Walks a chain of direct children; `None` on the first mismatch.
    ///
    /// This is the pervasive extraction primitive: WebDAV property trees
    /// are probed with short paths instead of a schema, e.g.
    /// `multistatus.path(&[(DAV_NS, "response"), (DAV_NS, "propstat")])`.
    #[must_use]
    pub fn path(&self, segments: &[(&str, &str)]) -> Option<&XmlNode> {
        let mut node = self;
        for (namespace, local) in segments {
            node = node.child(namespace, local)?;
        }
        Some(node)
    }

    /// Text of the node reached by `segments`, if all of them match.
    #[must_use]
    pub fn path_text(&self, segments: &[(&str, &str)]) -> Option<&str> {
        self.path(segments).map(|n| n.text.as_str())
    }

    /// Non-empty text of this node.
    #[must_use]
    pub fn non_empty_text(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dav::DAV_NS;

    fn sample() -> XmlNode {
        let mut href = XmlNode::new(DAV_NS, "href");
        href.text = "/card/abc.vcf".to_string();
        let mut response = XmlNode::new(DAV_NS, "response");
        response.children.push(href);
        let mut root = XmlNode::new(DAV_NS, "multistatus");
        root.children.push(response);
        root
    }

    #[test]
    fn path_walks_direct_children() {
        let root = sample();
        let text = root.path_text(&[(DAV_NS, "response"), (DAV_NS, "href")]);
        assert_eq!(text, Some("/card/abc.vcf"));
    }

    #[test]
    fn path_fails_on_first_mismatch() {
        let root = sample();
        assert!(root.path(&[(DAV_NS, "propstat"), (DAV_NS, "href")]).is_none());
        assert!(root.path(&[("urn:other", "response")]).is_none());
    }

    #[test]
    fn empty_path_is_self() {
        let root = sample();
        assert_eq!(root.path(&[]), Some(&root));
    }
}
