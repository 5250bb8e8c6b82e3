//! Verification workflow: registry construction and the overall deadline.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::result::VerificationResult;
use crate::infra::error::ProcessorResult;
use crate::services::{PdfVerifier, VerifierRegistry, XmlVerifier};
use crate::trust::TrustStore;

/// Upper bound on one complete verification, network included
pub const VERIFICATION_DEADLINE: Duration = Duration::from_secs(60);

/// Orchestrates format detection and signature verification
pub struct VerifyWorkflow {
    registry: VerifierRegistry,
    trust_store: Arc<TrustStore>,
}

impl VerifyWorkflow {
    /// Workflow with the XML and PDF verifiers over the given store
    #[must_use]
    pub fn new(trust_store: Arc<TrustStore>) -> Self {
        let mut registry = VerifierRegistry::new();
        registry.register(Box::new(XmlVerifier::new(Arc::clone(&trust_store))));
        registry.register(Box::new(PdfVerifier::new()));
        VerifyWorkflow {
            registry,
            trust_store,
        }
    }

    /// Verify `data` with the matching verifier under the deadline.
    ///
    /// A deadline overrun produces an invalid result, not an error; only
    /// an unrecognized format is an error.
    pub async fn run(&self, data: &[u8]) -> ProcessorResult<VerificationResult> {
        let verifier = self.registry.detect(data)?;
        match tokio::time::timeout(VERIFICATION_DEADLINE, verifier.verify(data)).await {
            Ok(result) => Ok(result),
            Err(_) => {
                let mut result = VerificationResult::new(verifier.format());
                result.add_error(format!(
                    "verification timed out after {}s",
                    VERIFICATION_DEADLINE.as_secs()
                ));
                Ok(result)
            }
        }
    }

    #[must_use]
    pub fn trust_store(&self) -> &Arc<TrustStore> {
        &self.trust_store
    }

    /// The verifier registry, for registering custom verifiers
    pub fn registry_mut(&mut self) -> &mut VerifierRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn registry(&self) -> &VerifierRegistry {
        &self.registry
    }
}
