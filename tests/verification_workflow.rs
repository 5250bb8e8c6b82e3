//! End-to-end verification: signed fixtures through the workflow, result
//! invariants and the JSON wire shape.

use std::sync::Arc;

use einvoice_processor::{TrustStore, VerificationResult, VerifyWorkflow};

fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(path).unwrap()
}

fn workflow_with_fixture_root() -> VerifyWorkflow {
    let mut store = TrustStore::empty();
    store
        .add_certificates_from_pem(&fixture("xml_root.pem"))
        .unwrap();
    VerifyWorkflow::new(Arc::new(store))
}

fn assert_validity_invariant(result: &VerificationResult) {
    let expected = result.signature_found
        && result.signature_valid
        && result.cert_chain_valid
        && result.not_revoked
        && result.errors.is_empty();
    assert_eq!(result.valid, expected, "validity invariant violated");
}

#[tokio::test]
async fn valid_signed_invoice_end_to_end() {
    env_logger::try_init().ok();
    let workflow = workflow_with_fixture_root();
    let result = workflow.run(&fixture("signed_invoice.xml")).await.unwrap();

    assert!(result.valid, "errors: {:?}", result.errors);
    assert!(result.signature_found);
    assert!(result.signature_valid);
    assert!(result.cert_chain_valid);
    assert!(result.not_revoked);
    assert_eq!(result.format, "xml");
    assert_validity_invariant(&result);

    let signer = result.signer.as_ref().expect("signer");
    assert_eq!(signer.name, "NGUYEN VAN A");
    assert_eq!(signer.issuer, "Fixture E-Invoice Root CA");
    assert!(signer.valid_from < signer.valid_to);
    assert!(result.signed_at.is_some());

    // chain: signer first, trusted root last
    assert_eq!(result.cert_chain.len(), 2);
}

#[tokio::test]
async fn tampered_invoice_is_rejected_with_diagnostics() {
    let workflow = workflow_with_fixture_root();
    let tampered = String::from_utf8(fixture("signed_invoice.xml"))
        .unwrap()
        .replace("XYZ Corp", "XXX Corp");
    let result = workflow.run(tampered.as_bytes()).await.unwrap();

    assert!(!result.valid);
    assert!(result.signature_found);
    assert!(!result.signature_valid);
    assert!(!result.errors.is_empty());
    // diagnostics survive the failure
    assert!(result.signer.is_some());
    assert_validity_invariant(&result);
}

#[tokio::test]
async fn signer_outside_trust_store_fails_chain() {
    let workflow = VerifyWorkflow::new(Arc::new(TrustStore::empty()));
    let result = workflow.run(&fixture("signed_invoice.xml")).await.unwrap();

    assert!(!result.valid);
    assert!(result.signature_valid, "crypto is fine, trust is not");
    assert!(!result.cert_chain_valid);
    assert!(!result.warnings.is_empty());
    assert_validity_invariant(&result);
}

#[tokio::test]
async fn unsigned_xml_reports_no_signature() {
    let workflow = workflow_with_fixture_root();
    let result = workflow
        .run(b"<HDon><DLHDon><TTChung><SHDon>1</SHDon></TTChung></DLHDon></HDon>")
        .await
        .unwrap();

    assert!(!result.valid);
    assert!(!result.signature_found);
    assert_validity_invariant(&result);
}

#[tokio::test]
async fn unknown_format_is_an_error() {
    let workflow = workflow_with_fixture_root();
    let err = workflow.run(b"plain text document").await.unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn json_shape_follows_the_wire_contract() {
    let workflow = workflow_with_fixture_root();
    let result = workflow.run(&fixture("signed_invoice.xml")).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    for field in [
        "valid",
        "signature_found",
        "signature_valid",
        "cert_chain_valid",
        "not_revoked",
        "format",
        "warnings",
        "errors",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}");
    }

    // suppressed fields
    assert!(json.get("cert_chain").is_none(), "chain must never serialize");
    assert!(json.get("timestamp_valid").is_none(), "false timestamp_valid is omitted");

    let signer = json.get("signer").expect("signer present");
    for field in ["name", "serial_number", "issuer", "valid_from", "valid_to"] {
        assert!(signer.get(field).is_some(), "missing signer field {field}");
    }

    let signed_at = json.get("signed_at").unwrap().as_str().unwrap();
    assert!(signed_at.starts_with("2026-01-15T10:30:00"));
}

#[tokio::test]
async fn signer_window_matches_certificate() {
    use x509_parser::certificate::X509Certificate;
    use x509_parser::pem::Pem;
    use x509_parser::prelude::FromDer;

    let workflow = workflow_with_fixture_root();
    let result = workflow.run(&fixture("signed_invoice.xml")).await.unwrap();
    let signer = result.signer.expect("signer");

    let pem = Pem::iter_from_buffer(&fixture("xml_signer.pem"))
        .next()
        .unwrap()
        .unwrap();
    let (_, cert) = X509Certificate::from_der(&pem.contents).unwrap();

    assert_eq!(signer.valid_from.timestamp(), cert.validity().not_before.timestamp());
    assert_eq!(signer.valid_to.timestamp(), cert.validity().not_after.timestamp());
    assert_eq!(signer.serial_number, cert.tbs_certificate.serial.to_string());
}
