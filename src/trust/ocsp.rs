//! OCSP revocation checking with a TTL cache.
//!
//! The cache maps (issuer DN, serial) to the last responder verdict. Reads
//! take the shared lock; writes and expiry evictions take the exclusive
//! lock. Reads dominate writes by an order of magnitude in batch
//! verification, hence the reader-preferring primitive.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{GeneralName, ParsedExtension};

use super::ocsp_wire::{self, CertId, CertStatus};
use crate::adapters::ocsp_http::OcspHttpClient;
use crate::infra::error::{ProcessorError, ProcessorResult};

/// Default timeout for one OCSP exchange
pub const DEFAULT_OCSP_TIMEOUT: Duration = Duration::from_secs(10);
/// Default lifetime of a cached verdict
pub const DEFAULT_OCSP_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    not_revoked: bool,
    expires_at: Instant,
}

/// Concurrent cache of OCSP verdicts keyed by issuer DN and serial
pub struct OcspCache {
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
    ttl: Duration,
}

impl OcspCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        OcspCache {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached verdict for the certificate, evicting it when expired
    pub fn get(&self, cert: &X509Certificate<'_>) -> Option<bool> {
        let key = cache_key(cert);
        let entry = {
            let entries = self.entries.read().expect("ocsp cache lock poisoned");
            entries.get(&key).copied()
        }?;

        if Instant::now() > entry.expires_at {
            let mut entries = self.entries.write().expect("ocsp cache lock poisoned");
            entries.remove(&key);
            return None;
        }
        Some(entry.not_revoked)
    }

    /// Store a verdict for the certificate
    pub fn set(&self, cert: &X509Certificate<'_>, not_revoked: bool) {
        let key = cache_key(cert);
        let entry = CacheEntry {
            not_revoked,
            expires_at: Instant::now() + self.ttl,
        };
        let mut entries = self.entries.write().expect("ocsp cache lock poisoned");
        entries.insert(key, entry);
    }

    /// Drop all cached verdicts
    pub fn clear(&self) {
        let mut entries = self.entries.write().expect("ocsp cache lock poisoned");
        entries.clear();
    }

    /// Number of cached verdicts, including not-yet-evicted expired ones
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("ocsp cache lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(cert: &X509Certificate<'_>) -> (String, String) {
    (
        cert.issuer().to_string(),
        cert.tbs_certificate.serial.to_string(),
    )
}

/// OCSP responder URLs listed in the certificate's authority information
/// access extension
#[must_use]
pub fn responder_urls(cert: &X509Certificate<'_>) -> Vec<String> {
    // id-ad-ocsp
    const OID_AD_OCSP: &str = "1.3.6.1.5.5.7.48.1";

    let mut urls = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::AuthorityInfoAccess(aia) = ext.parsed_extension() {
            for desc in &aia.accessdescs {
                if desc.access_method.to_id_string() == OID_AD_OCSP {
                    if let GeneralName::URI(uri) = &desc.access_location {
                        urls.push((*uri).to_string());
                    }
                }
            }
        }
    }
    urls
}

/// Query the certificate's OCSP responders in declaration order.
///
/// Returns `not_revoked`. The first non-error outcome wins; an `Unknown`
/// status is an error, and if every responder fails the last error is
/// propagated.
pub async fn check_ocsp(
    http: &OcspHttpClient,
    cert: &X509Certificate<'_>,
    issuer: &X509Certificate<'_>,
) -> ProcessorResult<bool> {
    let urls = responder_urls(cert);
    if urls.is_empty() {
        return Err(ProcessorError::OcspUnavailable(
            "no OCSP responder URL in certificate".to_string(),
        ));
    }

    let cert_id = CertId::new(cert, issuer);
    let request = ocsp_wire::encode_request(&cert_id);

    let mut last_err = None;
    for url in &urls {
        log::debug!("OCSP query -> {url}");
        match query_responder(http, url, &request, &cert_id, issuer).await {
            Ok(not_revoked) => return Ok(not_revoked),
            Err(e) => {
                log::warn!("OCSP responder {url} failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        ProcessorError::OcspUnavailable("all OCSP responders failed".to_string())
    }))
}

async fn query_responder(
    http: &OcspHttpClient,
    url: &str,
    request: &[u8],
    cert_id: &CertId,
    issuer: &X509Certificate<'_>,
) -> ProcessorResult<bool> {
    let body = http.post_request(url, request).await?;
    match ocsp_wire::parse_response(&body, cert_id, issuer)? {
        CertStatus::Good => Ok(true),
        CertStatus::Revoked => Ok(false),
        CertStatus::Unknown => Err(ProcessorError::OcspUnavailable(
            "OCSP status unknown".to_string(),
        )),
    }
}
