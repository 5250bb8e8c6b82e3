//! Verification services: signature extraction, XMLDSig validation and
//! the format-dispatching verifier registry.

pub mod c14n;
pub mod extractor;
pub mod pdf_verifier;
pub mod xml_verifier;
pub mod xmldsig;
pub mod xmltree;

use async_trait::async_trait;

use crate::domain::result::VerificationResult;
use crate::infra::error::{ProcessorError, ProcessorResult};

pub use extractor::{ExtractionResult, SignatureExtractor};
pub use pdf_verifier::PdfVerifier;
pub use xml_verifier::XmlVerifier;

/// A signature verifier for one document format
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verify the signature on `data`.
    ///
    /// Expected verification failures never surface as errors here; every
    /// failed check is narrated by the result's booleans and error list.
    async fn verify(&self, data: &[u8]) -> VerificationResult;

    /// Cheap byte-prefix predicate
    fn can_verify(&self, data: &[u8]) -> bool;

    /// Format identifier ("xml", "pdf")
    fn format(&self) -> &'static str;
}

/// Ordered verifier dispatch by content sniffing
#[derive(Default)]
pub struct VerifierRegistry {
    verifiers: Vec<Box<dyn Verifier>>,
}

impl VerifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        VerifierRegistry {
            verifiers: Vec::new(),
        }
    }

    /// Append a verifier; earlier registrations are probed first
    pub fn register(&mut self, verifier: Box<dyn Verifier>) {
        self.verifiers.push(verifier);
    }

    /// First verifier whose predicate matches the data
    pub fn detect(&self, data: &[u8]) -> ProcessorResult<&dyn Verifier> {
        self.verifiers
            .iter()
            .map(|v| v.as_ref())
            .find(|v| v.can_verify(data))
            .ok_or_else(|| ProcessorError::UnsupportedFormat("unknown".to_string()))
    }

    /// Detect-then-dispatch convenience
    pub async fn verify(&self, data: &[u8]) -> ProcessorResult<VerificationResult> {
        Ok(self.detect(data)?.verify(data).await)
    }

    /// Verifier registered for a specific format
    #[must_use]
    pub fn verifier_for(&self, format: &str) -> Option<&dyn Verifier> {
        self.verifiers
            .iter()
            .map(|v| v.as_ref())
            .find(|v| v.format() == format)
    }

    /// Formats that can be verified, in registration order
    #[must_use]
    pub fn available_formats(&self) -> Vec<&'static str> {
        self.verifiers.iter().map(|v| v.format()).collect()
    }
}
