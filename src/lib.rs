//! Vietnam E-Invoice Processor
//!
//! Parses Vietnamese electronic invoices (hóa đơn điện tử) across the five
//! provider schemas (TCT, VNPT, MISA, Viettel, FPT) and verifies the
//! digital signatures that give them legal force: XMLDSig validation,
//! certificate chains against the embedded national roots, OCSP revocation
//! with caching, and PDF signatures via the external `pdfsig` tool.

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;
pub mod trust;

use std::sync::Arc;

pub use adapters::xml::{AdapterRegistry, ProviderAdapter};
pub use domain::format::{detect_format, detect_mime_type, DocumentFormat};
pub use domain::invoice::{
    EmbeddedSignature, Invoice, InvoiceType, LineItem, Party, Provider, VATRate,
};
pub use domain::result::{SignerInfo, VerificationResult};
pub use infra::config::{ConfigManager, ProcessorConfiguration};
pub use infra::error::{ProcessorError, ProcessorResult};
pub use pipelines::{ProcessedInvoice, ProcessingPipeline, VerifyWorkflow};
pub use services::{PdfVerifier, SignatureExtractor, Verifier, VerifierRegistry, XmlVerifier};
pub use trust::{RevocationOutcome, TrustStore, TrustStoreBuilder};

/// Parse an invoice of any supported provider into the unified model
pub fn parse_invoice(data: &[u8]) -> ProcessorResult<Invoice> {
    ProcessingPipeline::new().process(data).map(|p| p.invoice)
}

/// Verify the signature on an XML or PDF document with a fresh default
/// trust store.
///
/// For batch use, build one [`TrustStore`] and [`VerifyWorkflow`] and
/// reuse them so the OCSP cache is shared.
pub async fn verify_bytes(data: &[u8]) -> ProcessorResult<VerificationResult> {
    let store = Arc::new(TrustStore::new()?);
    VerifyWorkflow::new(store).run(data).await
}
