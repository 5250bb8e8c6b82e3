//! XML canonicalization (W3C C14N 1.0 and Exclusive C14N 1.0).
//!
//! Covers the canonicalization profile used by e-invoice signatures:
//! explicit end tags, double-quoted sorted attributes, namespace
//! materialization and the C14N escaping rules. Comments are never part of
//! the parsed tree, so the with-comments variants canonicalize identically.

use super::xmltree::{escape_attribute, escape_text, XmlElement, XmlNode};

/// Algorithm URIs understood by [`canonicalize`]
pub const C14N_INCLUSIVE: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const C14N_INCLUSIVE_COMMENTS: &str =
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
pub const C14N_EXCLUSIVE: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const C14N_EXCLUSIVE_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

/// Canonicalization flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    Inclusive,
    Exclusive,
}

impl C14nMode {
    /// Map an algorithm URI to its mode; `None` for unsupported algorithms
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<C14nMode> {
        match uri {
            C14N_INCLUSIVE | C14N_INCLUSIVE_COMMENTS => Some(C14nMode::Inclusive),
            C14N_EXCLUSIVE | C14N_EXCLUSIVE_COMMENTS => Some(C14nMode::Exclusive),
            _ => None,
        }
    }
}

/// Canonicalize `element` as a document subset apex.
///
/// `inherited_ns` is the namespace context the element had in its original
/// document ((prefix, uri) pairs, empty prefix for the default namespace);
/// inclusive canonicalization materializes that context onto the apex.
#[must_use]
pub fn canonicalize(
    element: &XmlElement,
    mode: C14nMode,
    inherited_ns: &[(String, String)],
) -> Vec<u8> {
    let mut out = Vec::new();
    let rendered: Vec<(String, String)> = Vec::new();
    canon_element(&mut out, element, mode, inherited_ns, &rendered);
    out
}

fn canon_element(
    out: &mut Vec<u8>,
    element: &XmlElement,
    mode: C14nMode,
    in_scope_parent: &[(String, String)],
    rendered_parent: &[(String, String)],
) {
    // namespace context at this element
    let mut in_scope: Vec<(String, String)> = in_scope_parent.to_vec();
    for (prefix, uri) in element.namespace_declarations() {
        in_scope.retain(|(p, _)| *p != prefix);
        in_scope.push((prefix, uri));
    }

    // which namespace declarations this element must output
    let mut to_render: Vec<(String, String)> = Vec::new();
    match mode {
        C14nMode::Inclusive => {
            for (prefix, uri) in &in_scope {
                if uri.is_empty() && prefix.is_empty() {
                    // xmlns="" is only rendered when undeclaring an
                    // ancestor-rendered default namespace
                    if rendered_lookup(rendered_parent, "").is_some_and(|u| !u.is_empty()) {
                        to_render.push((prefix.clone(), uri.clone()));
                    }
                    continue;
                }
                if rendered_lookup(rendered_parent, prefix) != Some(uri) {
                    to_render.push((prefix.clone(), uri.clone()));
                }
            }
        }
        C14nMode::Exclusive => {
            for prefix in visibly_utilized_prefixes(element) {
                let Some(uri) = in_scope
                    .iter()
                    .find(|(p, _)| *p == prefix)
                    .map(|(_, u)| u.clone())
                else {
                    continue;
                };
                if uri.is_empty() {
                    continue;
                }
                if rendered_lookup(rendered_parent, &prefix) != Some(&uri) {
                    to_render.push((prefix, uri));
                }
            }
        }
    }
    to_render.sort();

    let mut rendered: Vec<(String, String)> = rendered_parent.to_vec();
    for (prefix, uri) in &to_render {
        rendered.retain(|(p, _)| p != prefix);
        rendered.push((prefix.clone(), uri.clone()));
    }

    // regular attributes, sorted by name
    let mut attributes: Vec<(&String, &String)> = element
        .attributes
        .iter()
        .filter(|(k, _)| k != "xmlns" && !k.starts_with("xmlns:"))
        .map(|(k, v)| (k, v))
        .collect();
    attributes.sort();

    out.push(b'<');
    out.extend_from_slice(element.name.as_bytes());
    for (prefix, uri) in &to_render {
        if prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        out.extend_from_slice(escape_attribute(uri).as_bytes());
        out.push(b'"');
    }
    for (key, value) in attributes {
        out.push(b' ');
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(escape_attribute(value).as_bytes());
        out.push(b'"');
    }
    out.push(b'>');

    for child in &element.children {
        match child {
            XmlNode::Element(e) => canon_element(out, e, mode, &in_scope, &rendered),
            XmlNode::Text(t) => out.extend_from_slice(escape_text(t).as_bytes()),
        }
    }

    out.extend_from_slice(b"</");
    out.extend_from_slice(element.name.as_bytes());
    out.push(b'>');
}

fn rendered_lookup<'a>(rendered: &'a [(String, String)], prefix: &str) -> Option<&'a String> {
    rendered.iter().find(|(p, _)| p == prefix).map(|(_, u)| u)
}

/// Prefixes visibly utilized by an element: its own name's prefix (the
/// empty prefix for unprefixed names) and its attributes' prefixes
fn visibly_utilized_prefixes(element: &XmlElement) -> Vec<String> {
    let mut prefixes = vec![element
        .name
        .split_once(':')
        .map(|(p, _)| p.to_string())
        .unwrap_or_default()];
    for (key, _) in &element.attributes {
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        if let Some((prefix, _)) = key.split_once(':') {
            let prefix = prefix.to_string();
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::xmltree::XmlElement;

    fn canon_str(doc: &str, mode: C14nMode, inherited: &[(&str, &str)]) -> String {
        let root = XmlElement::parse(doc.as_bytes()).unwrap();
        let inherited: Vec<(String, String)> = inherited
            .iter()
            .map(|(p, u)| (p.to_string(), u.to_string()))
            .collect();
        String::from_utf8(canonicalize(&root, mode, &inherited)).unwrap()
    }

    #[test]
    fn test_canonical_form_is_identity() {
        let doc = "<A><B>x</B> <C>y</C></A>";
        assert_eq!(canon_str(doc, C14nMode::Inclusive, &[]), doc);
    }

    #[test]
    fn test_empty_elements_expanded() {
        assert_eq!(canon_str("<A><B/></A>", C14nMode::Inclusive, &[]), "<A><B></B></A>");
    }

    #[test]
    fn test_attributes_sorted() {
        assert_eq!(
            canon_str("<A c=\"3\" a=\"1\" b=\"2\"></A>", C14nMode::Inclusive, &[]),
            "<A a=\"1\" b=\"2\" c=\"3\"></A>"
        );
    }

    #[test]
    fn test_inherited_default_namespace_materialized() {
        // SignedInfo-style: the apex inherits a default namespace from its
        // removed ancestor and must render it
        assert_eq!(
            canon_str(
                "<SignedInfo><X>1</X></SignedInfo>",
                C14nMode::Inclusive,
                &[("", "http://www.w3.org/2000/09/xmldsig#")]
            ),
            "<SignedInfo xmlns=\"http://www.w3.org/2000/09/xmldsig#\"><X>1</X></SignedInfo>"
        );
    }

    #[test]
    fn test_namespace_not_rerendered_on_children() {
        assert_eq!(
            canon_str("<A xmlns=\"urn:x\"><B>1</B></A>", C14nMode::Inclusive, &[]),
            "<A xmlns=\"urn:x\"><B>1</B></A>"
        );
    }

    #[test]
    fn test_namespace_decls_precede_attributes() {
        assert_eq!(
            canon_str("<A b=\"2\" xmlns=\"urn:x\" a=\"1\"></A>", C14nMode::Inclusive, &[]),
            "<A xmlns=\"urn:x\" a=\"1\" b=\"2\"></A>"
        );
    }

    #[test]
    fn test_exclusive_omits_unused_inherited_namespaces() {
        // the inherited prefixed namespace is not visibly utilized
        assert_eq!(
            canon_str(
                "<SignedInfo><X>1</X></SignedInfo>",
                C14nMode::Exclusive,
                &[("unused", "urn:u")]
            ),
            "<SignedInfo><X>1</X></SignedInfo>"
        );
    }

    #[test]
    fn test_exclusive_renders_utilized_prefix() {
        assert_eq!(
            canon_str(
                "<ds:SignedInfo><ds:X>1</ds:X></ds:SignedInfo>",
                C14nMode::Exclusive,
                &[("ds", "http://www.w3.org/2000/09/xmldsig#")]
            ),
            "<ds:SignedInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\"><ds:X>1</ds:X></ds:SignedInfo>"
        );
    }

    #[test]
    fn test_text_escaping() {
        let root = XmlElement::parse(b"<A>a &amp; b</A>").unwrap();
        assert_eq!(
            String::from_utf8(canonicalize(&root, C14nMode::Inclusive, &[])).unwrap(),
            "<A>a &amp; b</A>"
        );
    }

    #[test]
    fn test_mode_from_uri() {
        assert_eq!(C14nMode::from_uri(C14N_INCLUSIVE), Some(C14nMode::Inclusive));
        assert_eq!(C14nMode::from_uri(C14N_EXCLUSIVE), Some(C14nMode::Exclusive));
        assert_eq!(C14nMode::from_uri("urn:bogus"), None);
    }
}
