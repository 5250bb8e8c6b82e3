//! PDF signature verification via the external pdfsig tool.
//!
//! Native PDF signature validation is out of scope; the XMLDSig path is
//! the legally significant channel and PDF reports are a secondary
//! courtesy mapped into the same result model.

use async_trait::async_trait;
use std::time::Duration;

use super::Verifier;
use crate::adapters::pdfsig::{
    install_instructions, issuer_from_distinguished_name, parse_report, PdfsigTool,
    DEFAULT_PDFSIG_TIMEOUT,
};
use crate::domain::result::{SignerInfo, VerificationResult, FORMAT_PDF};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Verifier for signed PDF documents
pub struct PdfVerifier {
    tool: PdfsigTool,
    timeout: Duration,
}

impl PdfVerifier {
    /// Detect the tool at construction time
    #[must_use]
    pub fn new() -> Self {
        PdfVerifier {
            tool: PdfsigTool::detect(),
            timeout: DEFAULT_PDFSIG_TIMEOUT,
        }
    }

    /// Verifier over a specific tool installation (tests, custom paths)
    #[must_use]
    pub fn with_tool(tool: PdfsigTool) -> Self {
        PdfVerifier {
            tool,
            timeout: DEFAULT_PDFSIG_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the external tool was found
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.tool.is_available()
    }

    /// Detected pdfsig path
    #[must_use]
    pub fn tool_path(&self) -> Option<&std::path::Path> {
        self.tool.tool_path()
    }

    /// Result for deployments without the tool installed
    #[must_use]
    pub fn unavailable_result() -> VerificationResult {
        let mut result = VerificationResult::new(FORMAT_PDF);
        result.add_error("PDF signature verification unavailable: pdfsig tool not installed");
        result.add_warning(install_instructions());
        result
    }

    async fn verify_inner(&self, data: &[u8]) -> VerificationResult {
        let mut result = VerificationResult::new(FORMAT_PDF);

        if !self.tool.is_available() {
            result.add_error("pdfsig tool not available");
            result.add_warning(install_instructions());
            return result;
        }

        let output = match self.tool.dump(data, self.timeout).await {
            Ok(output) => output,
            Err(e) => {
                result.add_error(format!("pdfsig failed: {e}"));
                return result;
            }
        };

        let report = parse_report(&output);
        if report.signature_count() == 0 {
            result.add_error("no signatures found in PDF");
            return result;
        }
        result.signature_found = true;

        // map the primary signature; in practice most PDFs have one
        let sig = &report.signatures[0];
        result.signature_valid = sig.signature_valid;
        result.cert_chain_valid = sig.cert_trusted;
        result.signed_at = sig.signing_time;

        if !sig.signer_common_name.is_empty() || !sig.signer_distinguished_name.is_empty() {
            result.signer = Some(SignerInfo {
                name: sig.signer_common_name.clone(),
                issuer: issuer_from_distinguished_name(&sig.signer_distinguished_name),
                ..SignerInfo::default()
            });
        }

        if !sig.signature_valid {
            result.add_error(format!("signature invalid: {}", sig.error_message));
        }
        if !sig.cert_trusted {
            result.add_warning("certificate not trusted by pdfsig");
        }

        if report.signature_count() > 1 {
            result.add_warning(format!(
                "PDF contains {} signatures, only first verified",
                report.signature_count()
            ));
        }

        // pdfsig performs no OCSP
        result.not_revoked = true;
        result.add_warning("OCSP revocation check not performed for PDF signatures");

        result.compute_validity();
        result
    }
}

impl Default for PdfVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Verifier for PdfVerifier {
    async fn verify(&self, data: &[u8]) -> VerificationResult {
        self.verify_inner(data).await
    }

    fn can_verify(&self, data: &[u8]) -> bool {
        data.starts_with(PDF_MAGIC)
    }

    fn format(&self) -> &'static str {
        FORMAT_PDF
    }
}
