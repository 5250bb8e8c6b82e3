//! RSA signature primitives over certificate public keys.
//!
//! Shared by the XMLDSig validator, the chain verifier and the OCSP
//! response check. Only RSA PKCS#1 v1.5 is dispatched here; Vietnamese
//! e-invoice CAs issue RSA certificates exclusively.

use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::infra::error::{ProcessorError, ProcessorResult};

/// Digest algorithms accepted for signature verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Hash `data` with this algorithm
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn pkcs1v15_padding(&self) -> Pkcs1v15Sign {
        match self {
            HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

/// Map an RSA signature-algorithm OID (dotted form) to its digest
#[must_use]
pub fn hash_for_signature_oid(oid: &str) -> Option<HashAlgorithm> {
    match oid {
        "1.2.840.113549.1.1.5" => Some(HashAlgorithm::Sha1),
        "1.2.840.113549.1.1.11" => Some(HashAlgorithm::Sha256),
        "1.2.840.113549.1.1.12" => Some(HashAlgorithm::Sha384),
        "1.2.840.113549.1.1.13" => Some(HashAlgorithm::Sha512),
        _ => None,
    }
}

/// Extract the RSA public key from a certificate's SubjectPublicKeyInfo
pub fn rsa_key_from_spki(spki: &SubjectPublicKeyInfo<'_>) -> ProcessorResult<RsaPublicKey> {
    let parsed = spki
        .parsed()
        .map_err(|e| ProcessorError::Certificate(format!("bad public key: {e}")))?;
    let PublicKey::RSA(rsa_key) = parsed else {
        return Err(ProcessorError::Certificate(
            "not an RSA public key".to_string(),
        ));
    };

    let n = BigUint::from_bytes_be(rsa_key.modulus);
    let e = BigUint::from_bytes_be(rsa_key.exponent);
    RsaPublicKey::new(n, e)
        .map_err(|e| ProcessorError::Certificate(format!("invalid RSA public key: {e}")))
}

/// Verify an RSA PKCS#1 v1.5 signature over `message`
pub fn verify_rsa_pkcs1(
    spki: &SubjectPublicKeyInfo<'_>,
    algorithm: HashAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> ProcessorResult<()> {
    let key = rsa_key_from_spki(spki)?;
    let hashed = algorithm.digest(message);
    key.verify(algorithm.pkcs1v15_padding(), &hashed, signature)
        .map_err(|e| ProcessorError::InvalidSignature(format!("RSA verification failed: {e}")))
}
