//! XMLDSig verification service.
//!
//! Sequences the verification steps and aggregates their outcomes into a
//! [`VerificationResult`]. Expected verification failures never abort the
//! procedure: a tampered invoice still reports its signer identity, and a
//! bad certificate still reports the cryptographic verdict.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use super::extractor::{extract_certificate, SignatureExtractor};
use super::xmldsig;
use super::xmltree::XmlElement;
use super::Verifier;
use crate::domain::result::{VerificationResult, FORMAT_XML};
use crate::trust::{RevocationOutcome, TrustStore};

/// Paths probed for the signing time inside the Signature element
const SIGNING_TIME_PATHS: &[&str] = &[
    "Object/SignatureProperties/SignatureProperty/SigningTime",
    "Object/SignatureProperties/SigningTime",
    "SignedProperties/SignedSignatureProperties/SigningTime",
];

/// Verifier for XMLDSig-signed invoice documents
pub struct XmlVerifier {
    trust_store: Arc<TrustStore>,
    extractor: SignatureExtractor,
}

impl XmlVerifier {
    #[must_use]
    pub fn new(trust_store: Arc<TrustStore>) -> Self {
        XmlVerifier {
            trust_store,
            extractor: SignatureExtractor::new(),
        }
    }

    async fn verify_inner(&self, data: &[u8]) -> VerificationResult {
        let mut result = VerificationResult::new(FORMAT_XML);

        // 1. locate signature and signed element
        let extraction = match self.extractor.extract(data) {
            Ok(extraction) => extraction,
            Err(e) => {
                result.add_error(e.to_string());
                return result;
            }
        };
        result.signature_found = true;

        // 2. narrow the canonicalization scope: re-serialize the signed
        // element in isolation and re-parse it
        let signed_bytes = extraction.signed_element.serialize();
        let signed_root = match XmlElement::parse(&signed_bytes) {
            Ok(root) => root,
            Err(e) => {
                result.add_error(format!("failed to re-parse signed element: {e}"));
                return result;
            }
        };

        // 3. cryptographic validation; continue on failure, the remaining
        // checks still yield diagnostic information
        match xmldsig::validate_enveloped(&signed_root) {
            Ok(()) => result.signature_valid = true,
            Err(e) => {
                result.signature_valid = false;
                result.add_error(format!("signature validation failed: {e}"));
            }
        }

        // 4.-6. certificate, chain, revocation
        self.verify_certificate(&extraction.signature, &mut result).await;

        // 7. declared signing time
        if let Some(signed_at) = extract_signing_time(&extraction.signature) {
            result.signed_at = Some(signed_at);
        }

        result.compute_validity();
        result
    }

    /// Parse the embedded certificate, verify its chain and check
    /// revocation, populating the result as far as each step gets
    async fn verify_certificate(&self, signature: &XmlElement, result: &mut VerificationResult) {
        let cert_der = match extract_certificate(signature) {
            Ok(der) => der,
            Err(e) => {
                result.add_warning(format!("certificate extraction/verification: {e}"));
                return;
            }
        };

        match X509Certificate::from_der(&cert_der) {
            Ok((_, cert)) => result.set_signer(&cert),
            Err(e) => {
                result.add_warning(format!(
                    "certificate extraction/verification: failed to parse certificate: {e}"
                ));
                return;
            }
        }

        let chain = match self.trust_store.verify_chain(&cert_der, &[]) {
            Ok(chain) => chain,
            Err(e) => {
                result.add_warning(format!("certificate extraction/verification: {e}"));
                return;
            }
        };
        result.cert_chain_valid = true;
        result.cert_chain = chain;

        if result.cert_chain.len() < 2 {
            // self-signed or lone root, nothing to ask a responder about
            result.not_revoked = true;
            result.add_warning("revocation check skipped: no issuer certificate in chain");
            return;
        }

        let (leaf, issuer) = (&result.cert_chain[0], &result.cert_chain[1]);
        match self.trust_store.check_revocation(leaf, issuer).await {
            Ok(RevocationOutcome::NotRevoked) => result.not_revoked = true,
            Ok(RevocationOutcome::Unchecked(note)) => {
                log::debug!("revocation unchecked: {note}");
                result.not_revoked = true;
            }
            Ok(RevocationOutcome::SoftFailed(cause)) => {
                result.not_revoked = true;
                result.add_warning(format!("OCSP check: {cause} (soft-fail enabled)"));
            }
            Ok(RevocationOutcome::Revoked) => {
                result.not_revoked = false;
                result.add_error("certificate has been revoked");
            }
            Err(e) => {
                result.not_revoked = false;
                result.add_error(format!("OCSP check failed: {e}"));
            }
        }
    }
}

#[async_trait]
impl Verifier for XmlVerifier {
    async fn verify(&self, data: &[u8]) -> VerificationResult {
        self.verify_inner(data).await
    }

    fn can_verify(&self, data: &[u8]) -> bool {
        if data.len() < 5 {
            return false;
        }
        let trimmed = data
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map_or(&data[..0], |i| &data[i..]);
        trimmed.starts_with(b"<?xml") || trimmed.starts_with(b"<")
    }

    fn format(&self) -> &'static str {
        FORMAT_XML
    }
}

/// Signing time from the known SignatureProperties locations.
/// Accepts RFC 3339 and second-precision ISO 8601.
fn extract_signing_time(signature: &XmlElement) -> Option<DateTime<Utc>> {
    for path in SIGNING_TIME_PATHS {
        let Some(element) = signature.find(path) else {
            continue;
        };
        let text = element.text();
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}
