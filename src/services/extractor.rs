//! Signature element extraction from provider XML.
//!
//! Providers disagree on where the XMLDSig `Signature` lives and whether
//! it carries a namespace prefix; a fixed probe list covers the known
//! locations and a recursive local-name scan catches the rest.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::xmltree::XmlElement;
use crate::domain::invoice::Provider;
use crate::infra::error::{ProcessorError, ProcessorResult};

/// Known signature locations, probed in order before the recursive scan
const SIGNATURE_PATHS: &[&str] = &[
    "Signature",
    "ds:Signature",
    "Invoice/Signature",
    "Invoices/Invoice/Signature",
    "SInvoice/Signature",
    "HoaDon/Signature",
    "HDon/TTChung/TTKhac/Signature",
    "HDon/Signature",
    "EInvoice/Signature",
];

/// Certificate locations inside a Signature element
const CERTIFICATE_PATHS: &[&str] = &[
    "KeyInfo/X509Data/X509Certificate",
    "ds:KeyInfo/ds:X509Data/ds:X509Certificate",
];

/// Extraction output: the signature, what it signs, and document context
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// The `Signature` element
    pub signature: XmlElement,
    /// The element the signature covers: its parent, else the root
    pub signed_element: XmlElement,
    /// Parsed document root
    pub document: XmlElement,
    /// Provider derived from the root element name
    pub provider: Provider,
    /// Namespaces in scope at the signature element, for canonicalization
    pub signature_namespaces: Vec<(String, String)>,
}

/// Locates XMLDSig signatures inside any provider's XML
#[derive(Debug, Default)]
pub struct SignatureExtractor;

impl SignatureExtractor {
    #[must_use]
    pub fn new() -> Self {
        SignatureExtractor
    }

    /// Find the signature element and the element it signs
    pub fn extract(&self, data: &[u8]) -> ProcessorResult<ExtractionResult> {
        let document = XmlElement::parse(data)
            .map_err(|e| ProcessorError::Xml(format!("failed to parse XML: {e}")))?;

        let path = find_signature_path(&document).ok_or(ProcessorError::NoSignature)?;

        let signature = document.element_at(&path).clone();
        let signed_element = if path.len() >= 2 {
            document.element_at(&path[..path.len() - 1]).clone()
        } else {
            // direct child of the root, or the root itself
            document.clone()
        };
        let signature_namespaces = document.namespaces_in_scope(&path);
        let provider = Provider::from_root_tag(document.local_name());

        Ok(ExtractionResult {
            signature,
            signed_element,
            document,
            provider,
            signature_namespaces,
        })
    }

    /// Cheap structural predicate: XML shape plus a signature marker
    #[must_use]
    pub fn can_extract(&self, data: &[u8]) -> bool {
        if data.len() < 5 {
            return false;
        }
        let trimmed = trim_start(data);
        if !trimmed.starts_with(b"<?xml") && !trimmed.starts_with(b"<") {
            return false;
        }
        contains(data, b"<Signature")
            || contains(data, b"<ds:Signature")
            || contains(data, b":Signature")
    }
}

/// Child-index path to the signature element
fn find_signature_path(root: &XmlElement) -> Option<Vec<usize>> {
    for path in SIGNATURE_PATHS {
        if let Some(indices) = root.find_path(path) {
            return Some(indices);
        }
    }
    // fallback: any element whose local name is Signature
    let path = root.find_local_path("Signature")?;
    if path.is_empty() {
        // a bare Signature document signs nothing
        return None;
    }
    Some(path)
}

/// Extract the DER certificate embedded in a Signature element
pub fn extract_certificate(signature: &XmlElement) -> ProcessorResult<Vec<u8>> {
    for path in CERTIFICATE_PATHS {
        if let Some(cert_elem) = signature.find(path) {
            let text = cert_elem.text();
            let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            if cleaned.is_empty() {
                continue;
            }
            return BASE64
                .decode(cleaned.as_bytes())
                .map_err(|e| ProcessorError::Certificate(format!("failed to decode certificate: {e}")));
        }
    }
    Err(ProcessorError::Certificate(
        "no X509Certificate found in Signature".to_string(),
    ))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn trim_start(data: &[u8]) -> &[u8] {
    let mut rest = data;
    while let Some((first, tail)) = rest.split_first() {
        if first.is_ascii_whitespace() {
            rest = tail;
        } else {
            break;
        }
    }
    rest
}
