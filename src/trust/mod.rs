//! Trust store: root CA pool, chain verification and revocation checking.
//!
//! Constructed once per process. The root pool is append-only; additions
//! must happen before concurrent verification begins. The OCSP cache lives
//! as long as its owning store.

pub mod chain;
pub mod keys;
pub mod ocsp;
pub mod ocsp_wire;
pub mod roots;

use std::path::{Path, PathBuf};
use std::time::Duration;

use x509_parser::certificate::X509Certificate;
use x509_parser::pem::Pem;
use x509_parser::prelude::FromDer;

use crate::adapters::ocsp_http::OcspHttpClient;
use crate::infra::error::{ProcessorError, ProcessorResult};
use ocsp::{OcspCache, DEFAULT_OCSP_CACHE_TTL, DEFAULT_OCSP_TIMEOUT};

/// Outcome of a revocation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationOutcome {
    /// Responder (or cache) confirmed the certificate is not revoked
    NotRevoked,
    /// Responder confirmed revocation
    Revoked,
    /// Check not performed; the note explains why
    Unchecked(String),
    /// OCSP failed but soft-fail mode demoted the failure to a warning
    SoftFailed(String),
}

/// Trusted root pool with chain building and OCSP revocation checking
pub struct TrustStore {
    roots_der: Vec<Vec<u8>>,
    tsa_der: Option<Vec<u8>>,
    ocsp_cache: OcspCache,
    ocsp_http: OcspHttpClient,
    soft_fail: bool,
}

impl TrustStore {
    /// Store with the embedded Vietnam national roots and default options
    pub fn new() -> ProcessorResult<Self> {
        TrustStoreBuilder::default().build()
    }

    /// Store without any trusted roots
    #[must_use]
    pub fn empty() -> Self {
        TrustStore {
            roots_der: Vec::new(),
            tsa_der: None,
            ocsp_cache: OcspCache::new(DEFAULT_OCSP_CACHE_TTL),
            ocsp_http: OcspHttpClient::new(DEFAULT_OCSP_TIMEOUT),
            soft_fail: false,
        }
    }

    #[must_use]
    pub fn builder() -> TrustStoreBuilder {
        TrustStoreBuilder::default()
    }

    /// Append a DER certificate to the root pool
    pub fn add_certificate_der(&mut self, der: Vec<u8>) -> ProcessorResult<()> {
        X509Certificate::from_der(&der)
            .map_err(|e| ProcessorError::Certificate(format!("failed to parse certificate: {e}")))?;
        self.roots_der.push(der);
        Ok(())
    }

    /// Append every CERTIFICATE block found in a PEM buffer.
    /// Fails when the buffer contains no certificate blocks.
    pub fn add_certificates_from_pem(&mut self, pem_data: &[u8]) -> ProcessorResult<usize> {
        let mut added = 0;
        for pem in Pem::iter_from_buffer(pem_data) {
            let pem = match pem {
                Ok(pem) => pem,
                Err(_) if added > 0 => break,
                Err(e) => {
                    return Err(ProcessorError::InvalidInput(format!(
                        "failed to parse PEM: {e}"
                    )))
                }
            };
            if pem.label != "CERTIFICATE" {
                continue;
            }
            self.add_certificate_der(pem.contents)?;
            added += 1;
        }
        if added == 0 {
            return Err(ProcessorError::InvalidInput(
                "no certificates found in PEM data".to_string(),
            ));
        }
        Ok(added)
    }

    /// Build a chain from `cert_der` up to a trusted root, allowing
    /// `intermediates` to bridge gaps. Leaf first, root last.
    pub fn verify_chain(
        &self,
        cert_der: &[u8],
        intermediates: &[Vec<u8>],
    ) -> ProcessorResult<Vec<Vec<u8>>> {
        chain::verify_chain(cert_der, intermediates, &self.roots_der)
    }

    /// Check revocation status of `cert_der` against its issuer via OCSP.
    ///
    /// Consults the cache first; fresh verdicts are cached. Certificates
    /// without a listed responder are reported unchecked, not failed.
    /// Under soft-fail, responder errors are demoted to
    /// [`RevocationOutcome::SoftFailed`].
    pub async fn check_revocation(
        &self,
        cert_der: &[u8],
        issuer_der: &[u8],
    ) -> ProcessorResult<RevocationOutcome> {
        let (_, cert) = X509Certificate::from_der(cert_der)
            .map_err(|e| ProcessorError::Certificate(format!("failed to parse certificate: {e}")))?;
        let (_, issuer) = X509Certificate::from_der(issuer_der)
            .map_err(|e| ProcessorError::Certificate(format!("failed to parse issuer: {e}")))?;

        if let Some(not_revoked) = self.ocsp_cache.get(&cert) {
            return Ok(if not_revoked {
                RevocationOutcome::NotRevoked
            } else {
                RevocationOutcome::Revoked
            });
        }

        if ocsp::responder_urls(&cert).is_empty() {
            return Ok(RevocationOutcome::Unchecked(
                "no OCSP responder listed in certificate".to_string(),
            ));
        }

        match ocsp::check_ocsp(&self.ocsp_http, &cert, &issuer).await {
            Ok(not_revoked) => {
                self.ocsp_cache.set(&cert, not_revoked);
                Ok(if not_revoked {
                    RevocationOutcome::NotRevoked
                } else {
                    RevocationOutcome::Revoked
                })
            }
            Err(e) if self.soft_fail => Ok(RevocationOutcome::SoftFailed(e.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Root pool as DER certificates
    #[must_use]
    pub fn roots(&self) -> &[Vec<u8>] {
        &self.roots_der
    }

    /// TSA root certificate, held for future timestamp verification
    #[must_use]
    pub fn tsa_root(&self) -> Option<&[u8]> {
        self.tsa_der.as_deref()
    }

    #[must_use]
    pub fn is_soft_fail(&self) -> bool {
        self.soft_fail
    }

    /// OCSP verdict cache
    #[must_use]
    pub fn ocsp_cache(&self) -> &OcspCache {
        &self.ocsp_cache
    }
}

/// Configuration for a fresh trust store. Omitted options take defaults:
/// hard-fail, 10 s OCSP timeout, 1 h cache TTL.
pub struct TrustStoreBuilder {
    soft_fail: bool,
    ocsp_timeout: Duration,
    ocsp_cache_ttl: Duration,
    custom_ca_path: Option<PathBuf>,
    embedded_roots: bool,
}

impl Default for TrustStoreBuilder {
    fn default() -> Self {
        TrustStoreBuilder {
            soft_fail: false,
            ocsp_timeout: DEFAULT_OCSP_TIMEOUT,
            ocsp_cache_ttl: DEFAULT_OCSP_CACHE_TTL,
            custom_ca_path: None,
            embedded_roots: true,
        }
    }
}

impl TrustStoreBuilder {
    /// Demote OCSP failures to warnings instead of verification errors
    #[must_use]
    pub fn soft_fail(mut self, enabled: bool) -> Self {
        self.soft_fail = enabled;
        self
    }

    /// Timeout for each OCSP responder exchange
    #[must_use]
    pub fn ocsp_timeout(mut self, timeout: Duration) -> Self {
        self.ocsp_timeout = timeout;
        self
    }

    /// Lifetime of cached OCSP verdicts
    #[must_use]
    pub fn ocsp_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ocsp_cache_ttl = ttl;
        self
    }

    /// Additional trusted roots from a PEM file
    #[must_use]
    pub fn custom_ca_file(mut self, path: impl AsRef<Path>) -> Self {
        self.custom_ca_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skip the embedded national roots (custom roots only)
    #[must_use]
    pub fn without_embedded_roots(mut self) -> Self {
        self.embedded_roots = false;
        self
    }

    pub fn build(self) -> ProcessorResult<TrustStore> {
        let mut store = TrustStore {
            roots_der: Vec::new(),
            tsa_der: None,
            ocsp_cache: OcspCache::new(self.ocsp_cache_ttl),
            ocsp_http: OcspHttpClient::new(self.ocsp_timeout),
            soft_fail: self.soft_fail,
        };

        if self.embedded_roots {
            store.roots_der = roots::verification_roots_der()?;
            store.tsa_der = Some(roots::tsa_root_der()?);
        }

        if let Some(path) = &self.custom_ca_path {
            match std::fs::read(path) {
                Ok(data) => {
                    let added = store.add_certificates_from_pem(&data)?;
                    log::info!("loaded {added} custom root(s) from {}", path.display());
                }
                Err(e) => {
                    log::warn!("custom CA file {} not loaded: {e}", path.display());
                }
            }
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_pem(name: &str) -> Vec<u8> {
        let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(path).unwrap()
    }

    fn fixture_der(name: &str) -> Vec<u8> {
        Pem::iter_from_buffer(&fixture_pem(name))
            .next()
            .unwrap()
            .unwrap()
            .contents
    }

    #[test]
    fn test_default_store_loads_embedded_roots() {
        let store = TrustStore::new().unwrap();
        assert_eq!(store.roots().len(), 2);
        assert!(store.tsa_root().is_some());
        assert!(!store.is_soft_fail());
    }

    #[test]
    fn test_empty_store_rejects_then_accepts_after_adding_root() {
        let mut store = TrustStore::empty();
        let leaf = fixture_der("end_entity.pem");

        let err = store.verify_chain(&leaf, &[]).unwrap_err();
        assert_eq!(err.code(), "CHAIN_INVALID");

        store.add_certificate_der(fixture_der("untrusted_root.pem")).unwrap();
        let chain = store.verify_chain(&leaf, &[]).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0], leaf);
    }

    #[test]
    fn test_add_certificates_from_pem() {
        let mut store = TrustStore::empty();
        let added = store
            .add_certificates_from_pem(&fixture_pem("chain_root.pem"))
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.roots().len(), 1);
    }

    #[test]
    fn test_add_certificates_from_pem_without_certs_fails() {
        let mut store = TrustStore::empty();
        let err = store
            .add_certificates_from_pem(b"not pem data at all")
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_revocation_without_responder_is_unchecked() {
        let store = TrustStore::empty();
        let leaf = fixture_der("end_entity.pem");
        let issuer = fixture_der("untrusted_root.pem");

        let outcome = store.check_revocation(&leaf, &issuer).await.unwrap();
        assert!(matches!(outcome, RevocationOutcome::Unchecked(_)));
    }

    #[tokio::test]
    async fn test_revocation_soft_fail_demotes_errors() {
        // chain_leaf lists an unreachable responder
        let store = TrustStore::builder()
            .soft_fail(true)
            .ocsp_timeout(Duration::from_millis(200))
            .without_embedded_roots()
            .build()
            .unwrap();
        let leaf = fixture_der("chain_leaf.pem");
        let issuer = fixture_der("chain_intermediate.pem");

        let outcome = store.check_revocation(&leaf, &issuer).await.unwrap();
        assert!(matches!(outcome, RevocationOutcome::SoftFailed(_)));
    }

    #[tokio::test]
    async fn test_revocation_hard_fail_propagates_errors() {
        let store = TrustStore::builder()
            .ocsp_timeout(Duration::from_millis(200))
            .without_embedded_roots()
            .build()
            .unwrap();
        let leaf = fixture_der("chain_leaf.pem");
        let issuer = fixture_der("chain_intermediate.pem");

        let err = store.check_revocation(&leaf, &issuer).await.unwrap_err();
        assert_eq!(err.code(), "OCSP_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_cached_verdict_short_circuits_network() {
        let store = TrustStore::empty();
        let leaf_der = fixture_der("chain_leaf.pem");
        let issuer_der = fixture_der("chain_intermediate.pem");

        let (_, leaf) = X509Certificate::from_der(&leaf_der).unwrap();
        store.ocsp_cache().set(&leaf, true);

        // the responder URL is unreachable, so only a cache hit can succeed
        let outcome = store.check_revocation(&leaf_der, &issuer_der).await.unwrap();
        assert_eq!(outcome, RevocationOutcome::NotRevoked);
    }
}
