//! X.509 chain building against a root pool.
//!
//! Builds the chain by subject/issuer name matching, verifying the RSA
//! signature, validity window and CA constraints at every link. The result
//! is leaf first and ends with the trusted root that anchored it.

use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use super::keys::{hash_for_signature_oid, verify_rsa_pkcs1};
use crate::infra::error::{ProcessorError, ProcessorResult};

/// Upper bound on chain length, counting leaf and root
pub const MAX_CHAIN_DEPTH: usize = 8;

/// Build and verify a certificate chain from `leaf_der` to one of
/// `roots_der`, bridging gaps with `intermediates_der`.
///
/// Returns the DER chain, leaf first, trusted root last.
pub fn verify_chain(
    leaf_der: &[u8],
    intermediates_der: &[Vec<u8>],
    roots_der: &[Vec<u8>],
) -> ProcessorResult<Vec<Vec<u8>>> {
    if leaf_der.is_empty() {
        return Err(ProcessorError::InvalidInput("empty certificate".to_string()));
    }

    let (_, leaf) = X509Certificate::from_der(leaf_der)
        .map_err(|e| ProcessorError::Certificate(format!("failed to parse certificate: {e}")))?;
    check_validity(&leaf)?;

    // The leaf may itself be a trusted root
    if roots_der.iter().any(|r| r.as_slice() == leaf_der) {
        return Ok(vec![leaf_der.to_vec()]);
    }

    let mut chain: Vec<Vec<u8>> = vec![leaf_der.to_vec()];
    let mut current_der = leaf_der.to_vec();

    for _ in 0..MAX_CHAIN_DEPTH {
        let (_, current) = X509Certificate::from_der(&current_der)
            .map_err(|e| ProcessorError::Certificate(format!("failed to parse certificate: {e}")))?;

        // A trusted root closing the chain?
        if let Some(root_der) = find_issuer(&current, roots_der)? {
            let (_, root) = X509Certificate::from_der(root_der)
                .map_err(|e| ProcessorError::Certificate(format!("failed to parse root: {e}")))?;
            check_validity(&root)?;
            chain.push(root_der.to_vec());
            return Ok(chain);
        }

        // Otherwise an intermediate must bridge the gap
        let Some(inter_der) = find_issuer(&current, intermediates_der)? else {
            return Err(ProcessorError::ChainInvalid(format!(
                "no trusted path: issuer not found for {}",
                current.issuer()
            )));
        };

        let (_, inter) = X509Certificate::from_der(inter_der)
            .map_err(|e| ProcessorError::Certificate(format!("failed to parse intermediate: {e}")))?;
        check_validity(&inter)?;
        check_is_ca(&inter)?;

        // Guard against certificate loops
        if chain.iter().any(|c| c.as_slice() == inter_der) {
            return Err(ProcessorError::ChainInvalid(
                "certificate loop detected".to_string(),
            ));
        }

        chain.push(inter_der.to_vec());
        current_der = inter_der.to_vec();
    }

    Err(ProcessorError::ChainInvalid(format!(
        "chain exceeds maximum depth of {MAX_CHAIN_DEPTH}"
    )))
}

/// Find a certificate in `candidates` whose subject matches `child`'s
/// issuer and whose key verifies `child`'s signature
fn find_issuer<'a>(
    child: &X509Certificate<'_>,
    candidates: &'a [Vec<u8>],
) -> ProcessorResult<Option<&'a Vec<u8>>> {
    let issuer_raw = child.issuer().as_raw();
    for candidate_der in candidates {
        let Ok((_, candidate)) = X509Certificate::from_der(candidate_der) else {
            continue;
        };
        if candidate.subject().as_raw() != issuer_raw {
            continue;
        }
        if verify_issued_by(child, &candidate).is_ok() {
            return Ok(Some(candidate_der));
        }
    }
    Ok(None)
}

/// Verify that `child` carries a valid signature from `issuer`'s key
pub fn verify_issued_by(
    child: &X509Certificate<'_>,
    issuer: &X509Certificate<'_>,
) -> ProcessorResult<()> {
    let oid = child.signature_algorithm.algorithm.to_id_string();
    let algorithm = hash_for_signature_oid(&oid).ok_or_else(|| {
        ProcessorError::Certificate(format!("unsupported signature algorithm: {oid}"))
    })?;

    verify_rsa_pkcs1(
        issuer.public_key(),
        algorithm,
        child.tbs_certificate.as_ref(),
        &child.signature_value.data,
    )
    .map_err(|_| {
        ProcessorError::ChainInvalid(format!(
            "signature of {} not issued by {}",
            child.subject(),
            issuer.subject()
        ))
    })
}

/// Validity window check against the current time
fn check_validity(cert: &X509Certificate<'_>) -> ProcessorResult<()> {
    let validity = cert.validity();
    let now = chrono::Utc::now().timestamp();
    if now < validity.not_before.timestamp() {
        return Err(ProcessorError::CertNotYetValid(cert.subject().to_string()));
    }
    if now > validity.not_after.timestamp() {
        return Err(ProcessorError::CertExpired(cert.subject().to_string()));
    }
    Ok(())
}

/// Issuing certificates must carry CA basic constraints
fn check_is_ca(cert: &X509Certificate<'_>) -> ProcessorResult<()> {
    let is_ca = cert
        .basic_constraints()
        .map_err(|e| ProcessorError::Certificate(format!("basic constraints: {e}")))?
        .map(|bc| bc.value.ca)
        .unwrap_or(false);
    if is_ca {
        Ok(())
    } else {
        Err(ProcessorError::ChainInvalid(format!(
            "{} is not a CA but is used as issuer",
            cert.subject()
        )))
    }
}
