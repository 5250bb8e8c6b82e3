//! Owned XML element tree built from quick-xml events.
//!
//! The signature extractor and canonicalizer need random access to
//! elements, their ancestry and their namespace context; a streaming
//! reader cannot provide that, so documents are materialized into this
//! small tree first. Text is stored unescaped; whitespace-only text nodes
//! are preserved because they are digest-significant in XMLDSig.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::infra::error::{ProcessorError, ProcessorResult};

/// A node in the tree: child element or character data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes (namespace declarations included,
/// document order preserved) and children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Name as written, possibly prefixed (e.g. `ds:Signature`)
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Parse a buffer into its root element
    pub fn parse(data: &[u8]) -> ProcessorResult<XmlElement> {
        let text = std::str::from_utf8(data)
            .map_err(|e| ProcessorError::Xml(format!("invalid UTF-8: {e}")))?;
        let mut reader = Reader::from_str(text);
        // expand so that <X/> and <X></X> canonicalize identically; text
        // is never trimmed because whitespace is digest-significant
        reader.config_mut().expand_empty_elements = true;

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event().map_err(ProcessorError::from)? {
                Event::Start(start) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    let mut element = XmlElement {
                        name,
                        ..XmlElement::default()
                    };
                    for attr in start.attributes() {
                        let attr = attr
                            .map_err(|e| ProcessorError::Xml(format!("bad attribute: {e}")))?;
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let value = attr
                            .unescape_value()
                            .map_err(|e| ProcessorError::Xml(format!("bad attribute value: {e}")))?
                            .into_owned();
                        element.attributes.push((key, value));
                    }
                    stack.push(element);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ProcessorError::Xml("unbalanced end tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => {
                            root = Some(element);
                            break;
                        }
                    }
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = text
                            .unescape()
                            .map_err(|e| ProcessorError::Xml(format!("bad text: {e}")))?
                            .into_owned();
                        parent.children.push(XmlNode::Text(value));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8_lossy(&data).into_owned();
                        parent.children.push(XmlNode::Text(value));
                    }
                }
                Event::Eof => break,
                // declarations, comments and PIs carry no digest-relevant
                // content for the documents handled here
                _ => {}
            }
        }

        root.ok_or_else(|| ProcessorError::Xml("empty XML document".to_string()))
    }

    /// Local name with any namespace prefix stripped
    #[must_use]
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Attribute value by exact name
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated direct text content
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    /// Resolve a slash-separated path of element names, matched as written
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        self.find_path(path)
            .map(|indices| self.element_at(&indices))
    }

    /// Like [`XmlElement::find`] but returns the child-index path
    #[must_use]
    pub fn find_path(&self, path: &str) -> Option<Vec<usize>> {
        let mut indices = Vec::new();
        let mut current = self;
        for segment in path.split('/') {
            let (idx, child) = current.children.iter().enumerate().find_map(|(i, node)| {
                match node {
                    XmlNode::Element(e) if e.name == segment => Some((i, e)),
                    _ => None,
                }
            })?;
            indices.push(idx);
            current = child;
        }
        Some(indices)
    }

    /// Depth-first search for the first element whose local name matches,
    /// the receiver included. Returns the child-index path (empty when the
    /// receiver itself matches).
    #[must_use]
    pub fn find_local_path(&self, local_name: &str) -> Option<Vec<usize>> {
        if self.local_name() == local_name {
            return Some(Vec::new());
        }
        for (i, node) in self.children.iter().enumerate() {
            if let XmlNode::Element(child) = node {
                if let Some(mut sub) = child.find_local_path(local_name) {
                    sub.insert(0, i);
                    return Some(sub);
                }
            }
        }
        None
    }

    /// Element at a child-index path produced by the find methods
    #[must_use]
    pub fn element_at(&self, indices: &[usize]) -> &XmlElement {
        let mut current = self;
        for &i in indices {
            match &current.children[i] {
                XmlNode::Element(e) => current = e,
                XmlNode::Text(_) => unreachable!("index path points at a text node"),
            }
        }
        current
    }

    /// Remove the element at a non-empty child-index path
    pub fn remove_at(&mut self, indices: &[usize]) {
        let (last, parents) = indices.split_last().expect("non-empty path");
        let mut current = self;
        for &i in parents {
            match &mut current.children[i] {
                XmlNode::Element(e) => current = e,
                XmlNode::Text(_) => unreachable!("index path points at a text node"),
            }
        }
        current.children.remove(*last);
    }

    /// Namespace declarations (prefix, uri) made on this element
    #[must_use]
    pub fn namespace_declarations(&self) -> Vec<(String, String)> {
        let mut decls = Vec::new();
        for (key, value) in &self.attributes {
            if key == "xmlns" {
                decls.push((String::new(), value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                decls.push((prefix.to_string(), value.clone()));
            }
        }
        decls
    }

    /// Namespaces in scope at the element addressed by `indices`,
    /// outermost declarations first, inner declarations overriding
    #[must_use]
    pub fn namespaces_in_scope(&self, indices: &[usize]) -> Vec<(String, String)> {
        let mut scope: Vec<(String, String)> = Vec::new();
        let mut current = self;
        let mut merge = |element: &XmlElement, scope: &mut Vec<(String, String)>| {
            for (prefix, uri) in element.namespace_declarations() {
                scope.retain(|(p, _)| *p != prefix);
                scope.push((prefix, uri));
            }
        };
        merge(current, &mut scope);
        for &i in indices {
            match &current.children[i] {
                XmlNode::Element(e) => current = e,
                XmlNode::Text(_) => unreachable!("index path points at a text node"),
            }
            merge(current, &mut scope);
        }
        scope
    }

    /// Plain serialization: attributes in document order, explicit end
    /// tags, minimal escaping. Not canonical form.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_into(&mut out);
        out
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        out.push(b'<');
        out.extend_from_slice(self.name.as_bytes());
        for (key, value) in &self.attributes {
            out.push(b' ');
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b"=\"");
            out.extend_from_slice(escape_attribute(value).as_bytes());
            out.push(b'"');
        }
        out.push(b'>');
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.serialize_into(out),
                XmlNode::Text(t) => out.extend_from_slice(escape_text(t).as_bytes()),
            }
        }
        out.extend_from_slice(b"</");
        out.extend_from_slice(self.name.as_bytes());
        out.push(b'>');
    }
}

/// Escape character data
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape an attribute value for double-quoted output
#[must_use]
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}
