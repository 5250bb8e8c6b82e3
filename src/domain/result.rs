//! Signature verification result types.
//!
//! Aggregates the outcomes of the individual verification steps into a
//! stable reporting contract. The overall `valid` flag is never set
//! directly; it is derived from the per-check booleans and the error list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use x509_parser::certificate::X509Certificate;

/// Document formats handled by the verifier registry
pub const FORMAT_XML: &str = "xml";
pub const FORMAT_PDF: &str = "pdf";

/// Complete signature verification outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Overall validity, true only if all checks pass and no errors occurred
    pub valid: bool,

    pub signature_found: bool,
    pub signature_valid: bool,
    pub cert_chain_valid: bool,
    pub not_revoked: bool,
    /// Reserved for timestamp-authority validation, currently never set
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub timestamp_valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,

    /// Verified certificate chain as DER, leaf first, trusted root last.
    /// In-memory only, never serialized.
    #[serde(skip)]
    pub cert_chain: Vec<Vec<u8>>,

    /// Non-fatal issues
    pub warnings: Vec<String>,

    /// Reasons the document was rejected, in detection order
    pub errors: Vec<String>,

    /// "xml" or "pdf"
    pub format: String,
}

/// Certificate subject information for the signing certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// Common name (CN)
    pub name: String,

    /// Organization (O)
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub organization: String,

    /// Certificate serial number, decimal
    pub serial_number: String,

    /// Issuer common name (falls back to issuer organization)
    pub issuer: String,

    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl VerificationResult {
    /// New empty result for the given format
    #[must_use]
    pub fn new(format: &str) -> Self {
        VerificationResult {
            format: format.to_string(),
            ..VerificationResult::default()
        }
    }

    /// Record a non-fatal issue
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Record a rejection reason. Forces the result invalid.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.valid = false;
    }

    /// Populate signer information from the signing certificate.
    ///
    /// The validity window is copied from the certificate unchanged.
    pub fn set_signer(&mut self, cert: &X509Certificate<'_>) {
        let subject = cert.subject();
        let issuer = cert.issuer();

        let name = subject
            .iter_common_name()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .unwrap_or_default()
            .to_string();
        let organization = subject
            .iter_organization()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .unwrap_or_default()
            .to_string();
        let issuer_name = issuer
            .iter_common_name()
            .next()
            .or_else(|| issuer.iter_organization().next())
            .and_then(|attr| attr.as_str().ok())
            .unwrap_or_default()
            .to_string();

        self.signer = Some(SignerInfo {
            name,
            organization,
            serial_number: cert.tbs_certificate.serial.to_string(),
            issuer: issuer_name,
            valid_from: DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
                .unwrap_or_default(),
            valid_to: DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
                .unwrap_or_default(),
        });
    }

    /// Derive the overall `valid` flag from the individual check results
    pub fn compute_validity(&mut self) {
        self.valid = self.signature_found
            && self.signature_valid
            && self.cert_chain_valid
            && self.not_revoked
            && self.errors.is_empty();
    }

    /// True if all checks passed including the (reserved) timestamp check
    #[must_use]
    pub fn is_fully_valid(&self) -> bool {
        self.valid && self.timestamp_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_result() -> VerificationResult {
        let mut r = VerificationResult::new(FORMAT_XML);
        r.signature_found = true;
        r.signature_valid = true;
        r.cert_chain_valid = true;
        r.not_revoked = true;
        r
    }

    #[test]
    fn test_validity_requires_all_checks() {
        let mut r = passing_result();
        r.compute_validity();
        assert!(r.valid);

        let mut r = passing_result();
        r.not_revoked = false;
        r.compute_validity();
        assert!(!r.valid);

        let mut r = passing_result();
        r.signature_valid = false;
        r.compute_validity();
        assert!(!r.valid);
    }

    #[test]
    fn test_add_error_forces_invalid() {
        let mut r = passing_result();
        r.compute_validity();
        assert!(r.valid);

        r.add_error("certificate has been revoked");
        assert!(!r.valid);

        // recomputing with a non-empty error list stays invalid
        r.compute_validity();
        assert!(!r.valid);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn test_add_warning_never_toggles_validity() {
        let mut r = passing_result();
        r.compute_validity();
        r.add_warning("revocation check skipped");
        assert!(r.valid);
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn test_json_shape() {
        let mut r = passing_result();
        r.compute_validity();
        let json = serde_json::to_value(&r).unwrap();

        assert_eq!(json["valid"], true);
        assert_eq!(json["format"], "xml");
        // suppressed fields
        assert!(json.get("timestamp_valid").is_none());
        assert!(json.get("signer").is_none());
        assert!(json.get("signed_at").is_none());
        assert!(json.get("cert_chain").is_none());
    }

    #[test]
    fn test_cert_chain_never_serialized() {
        let mut r = passing_result();
        r.cert_chain = vec![vec![0x30, 0x82], vec![0x30, 0x81]];
        r.compute_validity();
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("cert_chain"));
    }
}
