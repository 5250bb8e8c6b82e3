//! Trust store behavior: chain anchoring, PEM loading and OCSP caching.

use std::time::Duration;

use x509_parser::certificate::X509Certificate;
use x509_parser::pem::Pem;
use x509_parser::prelude::FromDer;

use einvoice_processor::trust::ocsp::OcspCache;
use einvoice_processor::trust::roots;
use einvoice_processor::TrustStore;

fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(path).unwrap()
}

fn fixture_der(name: &str) -> Vec<u8> {
    Pem::iter_from_buffer(&fixture_bytes(name))
        .next()
        .unwrap()
        .unwrap()
        .contents
}

#[test]
fn chain_against_untrusted_root() {
    // "Untrusted Root" signs "End Entity"; with an empty store the chain
    // must not anchor, and adding the root fixes the same call
    let mut store = TrustStore::empty();
    let leaf = fixture_der("end_entity.pem");
    let root = fixture_der("untrusted_root.pem");

    let err = store.verify_chain(&leaf, &[]).unwrap_err();
    assert_eq!(err.code(), "CHAIN_INVALID");

    store.add_certificate_der(root.clone()).unwrap();
    let chain = store.verify_chain(&leaf, &[]).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0], leaf, "leaf first");
    assert_eq!(chain[1], root, "trusted root last");
}

#[test]
fn intermediates_bridge_gaps() {
    let mut store = TrustStore::empty();
    store.add_certificate_der(fixture_der("chain_root.pem")).unwrap();

    let leaf = fixture_der("chain_leaf.pem");
    let intermediate = fixture_der("chain_intermediate.pem");

    assert!(store.verify_chain(&leaf, &[]).is_err());

    let chain = store.verify_chain(&leaf, &[intermediate]).unwrap();
    assert_eq!(chain.len(), 3);
}

#[test]
fn pem_loading_requires_certificate_blocks() {
    let mut store = TrustStore::empty();
    assert_eq!(
        store
            .add_certificates_from_pem(&fixture_bytes("chain_root.pem"))
            .unwrap(),
        1
    );
    let err = store.add_certificates_from_pem(b"garbage").unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn ocsp_cache_expiry() {
    let der = fixture_der("chain_leaf.pem");
    let (_, cert) = X509Certificate::from_der(&der).unwrap();

    let cache = OcspCache::new(Duration::from_millis(10));
    cache.set(&cert, true);
    assert_eq!(cache.get(&cert), Some(true));

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(cache.get(&cert), None, "expired entry must read as a miss");
}

#[test]
fn embedded_roots_metadata() {
    let info = roots::embedded_root_info();
    assert_eq!(info.len(), 3);
    assert!(info.iter().any(|i| i.name.contains("G3")));
    assert!(info.iter().any(|i| i.purpose.contains("Timestamp")));

    // the verification pool holds G3 + G2 and excludes the TSA root
    let store = TrustStore::new().unwrap();
    assert_eq!(store.roots().len(), 2);
    let tsa = store.tsa_root().unwrap().to_vec();
    assert!(!store.roots().contains(&tsa));
}

#[test]
fn custom_ca_file_via_builder() {
    let path = format!("{}/tests/fixtures/xml_root.pem", env!("CARGO_MANIFEST_DIR"));
    let store = TrustStore::builder()
        .without_embedded_roots()
        .custom_ca_file(&path)
        .build()
        .unwrap();
    assert_eq!(store.roots().len(), 1);

    let signer = fixture_der("xml_signer.pem");
    assert_eq!(store.verify_chain(&signer, &[]).unwrap().len(), 2);
}
