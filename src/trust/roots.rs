//! Embedded Vietnam National Root CA certificates.
//!
//! All e-invoice signing CAs chain to one of these roots. G3 is the current
//! generation, G2 the legacy one; the TSA root is reserved for timestamp
//! verification and is not part of the chain-verification pool.

use x509_parser::pem::Pem;

use crate::infra::error::{ProcessorError, ProcessorResult};

const G3_PEM: &[u8] = include_bytes!("certs/vietnam-nrca-sha256-g3.pem");
const G2_PEM: &[u8] = include_bytes!("certs/vietnam-nrca-sha256-g2.pem");
const TSA_PEM: &[u8] = include_bytes!("certs/vietnam-nrca-tsa.pem");

/// Metadata about an embedded root certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootCertInfo {
    pub name: &'static str,
    pub file: &'static str,
    pub validity: &'static str,
    pub purpose: &'static str,
}

/// Metadata for the embedded roots, queryable at runtime
#[must_use]
pub fn embedded_root_info() -> Vec<RootCertInfo> {
    vec![
        RootCertInfo {
            name: "Vietnam National Root CA G3",
            file: "certs/vietnam-nrca-sha256-g3.pem",
            validity: "2024-2049",
            purpose: "Current root for new e-invoices",
        },
        RootCertInfo {
            name: "Vietnam National Root CA (SHA-256)",
            file: "certs/vietnam-nrca-sha256-g2.pem",
            validity: "2014-2039",
            purpose: "Legacy root for older e-invoices",
        },
        RootCertInfo {
            name: "Vietnam National Root CA - TSA",
            file: "certs/vietnam-nrca-tsa.pem",
            validity: "2025-2050",
            purpose: "Timestamp verification",
        },
    ]
}

/// DER certificates for the chain-verification pool (G3 then G2).
/// Failure to decode an embedded root is a fatal initialization error.
pub fn verification_roots_der() -> ProcessorResult<Vec<Vec<u8>>> {
    Ok(vec![decode_single_pem(G3_PEM)?, decode_single_pem(G2_PEM)?])
}

/// DER certificate of the TSA root
pub fn tsa_root_der() -> ProcessorResult<Vec<u8>> {
    decode_single_pem(TSA_PEM)
}

/// Decode exactly one CERTIFICATE block and check it parses as X.509
fn decode_single_pem(pem_data: &[u8]) -> ProcessorResult<Vec<u8>> {
    let pem = Pem::iter_from_buffer(pem_data)
        .next()
        .ok_or_else(|| ProcessorError::Certificate("no PEM block in embedded root".to_string()))?
        .map_err(|e| ProcessorError::Certificate(format!("embedded root PEM: {e}")))?;
    if pem.label != "CERTIFICATE" {
        return Err(ProcessorError::Certificate(format!(
            "unexpected PEM label in embedded root: {}",
            pem.label
        )));
    }
    pem.parse_x509()
        .map_err(|e| ProcessorError::Certificate(format!("embedded root X.509: {e}")))?;
    Ok(pem.contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use x509_parser::certificate::X509Certificate;
    use x509_parser::prelude::FromDer;

    #[test]
    fn test_embedded_roots_load() {
        let roots = verification_roots_der().unwrap();
        assert_eq!(roots.len(), 2);
        for der in &roots {
            let (_, cert) = X509Certificate::from_der(der).unwrap();
            let bc = cert.basic_constraints().unwrap().expect("basic constraints");
            assert!(bc.value.ca);
        }
    }

    #[test]
    fn test_g3_subject() {
        let roots = verification_roots_der().unwrap();
        let (_, g3) = X509Certificate::from_der(&roots[0]).unwrap();
        let cn = g3
            .subject()
            .iter_common_name()
            .next()
            .and_then(|a| a.as_str().ok())
            .unwrap();
        assert_eq!(cn, "Vietnam National Root CA G3");
    }

    #[test]
    fn test_tsa_root_is_separate() {
        let tsa = tsa_root_der().unwrap();
        let (_, cert) = X509Certificate::from_der(&tsa).unwrap();
        let cn = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|a| a.as_str().ok())
            .unwrap();
        assert!(cn.contains("TSA"));

        let pool = verification_roots_der().unwrap();
        assert!(!pool.contains(&tsa));
    }

    #[test]
    fn test_root_metadata() {
        let info = embedded_root_info();
        assert_eq!(info.len(), 3);
        assert_eq!(info[0].validity, "2024-2049");
        assert_eq!(info[2].purpose, "Timestamp verification");
    }
}
