//! OCSP request/response DER codec (RFC 6960 subset).
//!
//! Encodes an unsigned OCSPRequest with a single SHA-256 CertID and parses
//! the corresponding OCSPResponse far enough to recover the certificate
//! status and verify the responder signature over tbsResponseData.

use sha2::{Digest, Sha256};
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use super::keys::{hash_for_signature_oid, verify_rsa_pkcs1, HashAlgorithm};
use crate::infra::error::{ProcessorError, ProcessorResult};

// DER tags
const TAG_SEQUENCE: u8 = 0x30;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_NULL: u8 = 0x05;
const TAG_INTEGER: u8 = 0x02;
const TAG_ENUMERATED: u8 = 0x0A;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_CTX_0: u8 = 0xA0;
const TAG_CTX_1: u8 = 0xA1;
const TAG_GOOD: u8 = 0x80;
const TAG_REVOKED: u8 = 0xA1;
const TAG_UNKNOWN: u8 = 0x82;

/// id-sha256
const OID_SHA256: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];
/// id-sha1
const OID_SHA1: &[u8] = &[0x2B, 0x0E, 0x03, 0x02, 0x1A];
/// id-pkix-ocsp-basic
const OID_OCSP_BASIC: &[u8] = &[0x2B, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01, 0x01];

/// Certificate status reported by the responder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStatus {
    Good,
    Revoked,
    Unknown,
}

/// CertID material for request building and response matching
#[derive(Debug, Clone)]
pub struct CertId {
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial: Vec<u8>,
}

impl CertId {
    /// SHA-256 CertID for `cert` issued by `issuer`
    #[must_use]
    pub fn new(cert: &X509Certificate<'_>, issuer: &X509Certificate<'_>) -> Self {
        CertId {
            issuer_name_hash: Sha256::digest(issuer.subject().as_raw()).to_vec(),
            issuer_key_hash: Sha256::digest(&issuer.public_key().subject_public_key.data).to_vec(),
            serial: cert.tbs_certificate.raw_serial().to_vec(),
        }
    }
}

/// Encode an unsigned OCSPRequest for a single certificate
#[must_use]
pub fn encode_request(cert_id: &CertId) -> Vec<u8> {
    let algorithm = der_seq(&[der_tlv(TAG_OID, OID_SHA256), der_tlv(TAG_NULL, &[])]);
    let cert_id_der = der_seq(&[
        algorithm,
        der_tlv(TAG_OCTET_STRING, &cert_id.issuer_name_hash),
        der_tlv(TAG_OCTET_STRING, &cert_id.issuer_key_hash),
        der_tlv(TAG_INTEGER, &cert_id.serial),
    ]);
    let request = der_seq(&[cert_id_der]);
    let request_list = der_seq(&[request]);
    let tbs_request = der_seq(&[request_list]);
    der_seq(&[tbs_request])
}

/// Parse an OCSPResponse, verify the responder signature against `issuer`,
/// and return the status for the certificate identified by `cert_id`.
pub fn parse_response(
    data: &[u8],
    cert_id: &CertId,
    issuer: &X509Certificate<'_>,
) -> ProcessorResult<CertStatus> {
    let mut outer = DerCursor::new(data);
    let (tag, response, _) = outer.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "OCSPResponse")?;

    let mut response = DerCursor::new(response);
    let (tag, status, _) = response.read_tlv()?;
    expect_tag(tag, TAG_ENUMERATED, "responseStatus")?;
    if status != [0u8].as_slice() {
        return Err(ProcessorError::OcspUnavailable(format!(
            "responder status {}",
            status.first().copied().unwrap_or(0xFF)
        )));
    }

    let (tag, response_bytes, _) = response.read_tlv()?;
    expect_tag(tag, TAG_CTX_0, "responseBytes")?;

    let mut response_bytes = DerCursor::new(response_bytes);
    let (tag, inner, _) = response_bytes.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "ResponseBytes")?;

    let mut inner = DerCursor::new(inner);
    let (tag, response_type, _) = inner.read_tlv()?;
    expect_tag(tag, TAG_OID, "responseType")?;
    if response_type != OID_OCSP_BASIC {
        return Err(ProcessorError::OcspUnavailable(
            "unsupported OCSP response type".to_string(),
        ));
    }
    let (tag, basic_der, _) = inner.read_tlv()?;
    expect_tag(tag, TAG_OCTET_STRING, "response")?;

    parse_basic_response(basic_der, cert_id, issuer)
}

fn parse_basic_response(
    data: &[u8],
    cert_id: &CertId,
    issuer: &X509Certificate<'_>,
) -> ProcessorResult<CertStatus> {
    let mut outer = DerCursor::new(data);
    let (tag, basic, _) = outer.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "BasicOCSPResponse")?;

    let mut basic = DerCursor::new(basic);
    let (tag, tbs_content, tbs_full) = basic.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "tbsResponseData")?;

    let (tag, sig_alg, _) = basic.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "signatureAlgorithm")?;
    let (tag, sig_bits, _) = basic.read_tlv()?;
    expect_tag(tag, TAG_BIT_STRING, "signature")?;

    // Optional [0] certs: a delegated responder certificate issued by the CA
    let delegated_der = if !basic.is_empty() {
        let (tag, certs, _) = basic.read_tlv()?;
        if tag == TAG_CTX_0 {
            let mut wrapper = DerCursor::new(certs);
            let (tag, cert_list, _) = wrapper.read_tlv()?;
            expect_tag(tag, TAG_SEQUENCE, "certs")?;
            let mut cert_list = DerCursor::new(cert_list);
            if cert_list.is_empty() {
                None
            } else {
                let (tag, _, first_cert) = cert_list.read_tlv()?;
                expect_tag(tag, TAG_SEQUENCE, "responder certificate")?;
                Some(first_cert.to_vec())
            }
        } else {
            None
        }
    } else {
        None
    };

    verify_response_signature(tbs_full, sig_alg, sig_bits, delegated_der.as_deref(), issuer)?;

    // ResponseData: [0] version? responderID ([1]|[2]) producedAt responses
    let mut tbs = DerCursor::new(tbs_content);
    let (tag, _, _) = tbs.peek_tlv()?;
    if tag == TAG_CTX_0 {
        tbs.read_tlv()?;
    }
    let (tag, _, _) = tbs.read_tlv()?; // responderID
    if tag != TAG_CTX_1 && tag != 0xA2 {
        return Err(ProcessorError::OcspUnavailable(
            "malformed responderID".to_string(),
        ));
    }
    tbs.read_tlv()?; // producedAt

    let (tag, responses, _) = tbs.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "responses")?;

    let mut responses = DerCursor::new(responses);
    while !responses.is_empty() {
        let (tag, single, _) = responses.read_tlv()?;
        expect_tag(tag, TAG_SEQUENCE, "SingleResponse")?;
        if let Some(status) = parse_single_response(single, cert_id, issuer)? {
            return Ok(status);
        }
    }

    Err(ProcessorError::OcspUnavailable(
        "no matching certificate status in response".to_string(),
    ))
}

/// Parse one SingleResponse; `None` when its CertID targets another cert
fn parse_single_response(
    data: &[u8],
    cert_id: &CertId,
    issuer: &X509Certificate<'_>,
) -> ProcessorResult<Option<CertStatus>> {
    let mut single = DerCursor::new(data);
    let (tag, id_content, _) = single.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "certID")?;

    let mut id = DerCursor::new(id_content);
    let (tag, alg_seq, _) = id.read_tlv()?;
    expect_tag(tag, TAG_SEQUENCE, "hashAlgorithm")?;
    let mut alg = DerCursor::new(alg_seq);
    let (tag, alg_oid, _) = alg.read_tlv()?;
    expect_tag(tag, TAG_OID, "hashAlgorithm OID")?;

    let (tag, name_hash, _) = id.read_tlv()?;
    expect_tag(tag, TAG_OCTET_STRING, "issuerNameHash")?;
    let (tag, key_hash, _) = id.read_tlv()?;
    expect_tag(tag, TAG_OCTET_STRING, "issuerKeyHash")?;
    let (tag, serial, _) = id.read_tlv()?;
    expect_tag(tag, TAG_INTEGER, "serialNumber")?;

    if serial != cert_id.serial.as_slice() {
        return Ok(None);
    }

    // Recompute the issuer hashes with the responder's declared algorithm
    let (expected_name, expected_key) = if alg_oid == OID_SHA256 {
        (cert_id.issuer_name_hash.clone(), cert_id.issuer_key_hash.clone())
    } else if alg_oid == OID_SHA1 {
        (
            HashAlgorithm::Sha1.digest(issuer.subject().as_raw()),
            HashAlgorithm::Sha1.digest(&issuer.public_key().subject_public_key.data),
        )
    } else {
        return Ok(None);
    };
    if name_hash != expected_name.as_slice() || key_hash != expected_key.as_slice() {
        return Ok(None);
    }

    let (tag, _, _) = single.read_tlv()?;
    let status = match tag {
        TAG_GOOD => CertStatus::Good,
        TAG_REVOKED => CertStatus::Revoked,
        TAG_UNKNOWN => CertStatus::Unknown,
        other => {
            return Err(ProcessorError::OcspUnavailable(format!(
                "unexpected certStatus tag 0x{other:02X}"
            )))
        }
    };
    Ok(Some(status))
}

/// Verify the responder signature over the raw tbsResponseData TLV.
///
/// Accepts a signature by the issuing CA directly, or by a delegated
/// responder certificate that is itself issued by the CA.
fn verify_response_signature(
    tbs_full: &[u8],
    sig_alg: &[u8],
    sig_bits: &[u8],
    delegated_der: Option<&[u8]>,
    issuer: &X509Certificate<'_>,
) -> ProcessorResult<()> {
    let mut alg = DerCursor::new(sig_alg);
    let (tag, alg_oid, _) = alg.read_tlv()?;
    expect_tag(tag, TAG_OID, "signatureAlgorithm OID")?;
    let oid_string = oid_to_string(alg_oid);
    let algorithm = hash_for_signature_oid(&oid_string).ok_or_else(|| {
        ProcessorError::OcspUnavailable(format!("unsupported signature algorithm {oid_string}"))
    })?;

    // BIT STRING: first byte is the unused-bit count
    let signature = sig_bits
        .split_first()
        .filter(|(unused, _)| **unused == 0)
        .map(|(_, rest)| rest)
        .ok_or_else(|| ProcessorError::OcspUnavailable("malformed signature".to_string()))?;

    if verify_rsa_pkcs1(issuer.public_key(), algorithm, tbs_full, signature).is_ok() {
        return Ok(());
    }

    if let Some(delegated_der) = delegated_der {
        let (_, delegated) = X509Certificate::from_der(delegated_der).map_err(|e| {
            ProcessorError::OcspUnavailable(format!("responder certificate: {e}"))
        })?;
        super::chain::verify_issued_by(&delegated, issuer)
            .map_err(|_| ProcessorError::OcspUnavailable("untrusted responder".to_string()))?;
        return verify_rsa_pkcs1(delegated.public_key(), algorithm, tbs_full, signature)
            .map_err(|_| ProcessorError::OcspUnavailable("response signature invalid".to_string()));
    }

    Err(ProcessorError::OcspUnavailable(
        "response signature invalid".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// DER primitives

fn der_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let significant: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(&significant);
    }
    out.extend_from_slice(content);
    out
}

fn der_seq(parts: &[Vec<u8>]) -> Vec<u8> {
    der_tlv(TAG_SEQUENCE, &parts.concat())
}

fn expect_tag(tag: u8, expected: u8, what: &str) -> ProcessorResult<()> {
    if tag == expected {
        Ok(())
    } else {
        Err(ProcessorError::OcspUnavailable(format!(
            "malformed {what}: tag 0x{tag:02X}, expected 0x{expected:02X}"
        )))
    }
}

/// Dotted representation of an OID's content bytes
fn oid_to_string(content: &[u8]) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some((&first, rest)) = content.split_first() {
        parts.push((first / 40).to_string());
        parts.push((first % 40).to_string());
        let mut value: u64 = 0;
        for &byte in rest {
            value = (value << 7) | u64::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                parts.push(value.to_string());
                value = 0;
            }
        }
    }
    parts.join(".")
}

/// Forward-only reader over a DER byte slice
struct DerCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DerCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        DerCursor { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read the next TLV: (tag, content, full TLV bytes)
    fn read_tlv(&mut self) -> ProcessorResult<(u8, &'a [u8], &'a [u8])> {
        let result = self.peek_tlv()?;
        self.pos += result.2.len();
        Ok(result)
    }

    fn peek_tlv(&self) -> ProcessorResult<(u8, &'a [u8], &'a [u8])> {
        let truncated = || ProcessorError::OcspUnavailable("truncated DER".to_string());
        let start = self.pos;
        let tag = *self.data.get(start).ok_or_else(truncated)?;
        let first_len = *self.data.get(start + 1).ok_or_else(truncated)?;

        let (len, header) = if first_len & 0x80 == 0 {
            (first_len as usize, 2)
        } else {
            let count = (first_len & 0x7F) as usize;
            if count == 0 || count > 4 {
                return Err(ProcessorError::OcspUnavailable(
                    "unsupported DER length".to_string(),
                ));
            }
            let bytes = self
                .data
                .get(start + 2..start + 2 + count)
                .ok_or_else(truncated)?;
            let mut len = 0usize;
            for &b in bytes {
                len = (len << 8) | usize::from(b);
            }
            (len, 2 + count)
        };

        let content = self
            .data
            .get(start + header..start + header + len)
            .ok_or_else(truncated)?;
        let full = &self.data[start..start + header + len];
        Ok((tag, content, full))
    }
}
