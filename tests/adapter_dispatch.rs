//! Adapter dispatch and parsing across the five provider schemas.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use einvoice_processor::adapters::xml::AdapterRegistry;
use einvoice_processor::{parse_invoice, ProcessingPipeline, Provider, SignatureExtractor};

#[test]
fn tct_happy_path() {
    let xml = b"<Invoice><InvoiceNo>0000001</InvoiceNo><InvoiceSeries>KK23</InvoiceSeries>\
<InvoiceDate>2026-01-15</InvoiceDate><Seller><TaxID>0123456789</TaxID><Name>ABC Company</Name></Seller>\
<Buyer><TaxID>9876543210</TaxID><Name>XYZ Corp</Name></Buyer>\
<TotalAmount>1100000</TotalAmount><TaxAmount>100000</TaxAmount></Invoice>";

    let registry = AdapterRegistry::new();
    let adapter = registry.detect(xml).unwrap();
    assert_eq!(adapter.provider(), Provider::TCT);

    let invoice = adapter.parse(xml).unwrap();
    assert_eq!(invoice.number, "0000001");
    assert_eq!(invoice.series, "KK23");
    assert_eq!(
        invoice.date,
        Some(Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap())
    );
    assert_eq!(invoice.seller.tax_id, "0123456789");
    assert_eq!(invoice.total_amount, Decimal::new(1_100_000, 0));
    assert_eq!(invoice.tax_amount, Decimal::new(100_000, 0));
}

#[test]
fn viettel_nested_layout() {
    let xml = b"<HDon><DLHDon><TTChung><SHDon>0000004</SHDon></TTChung>\
<NDHDon><NBan><MST>0100100100</MST></NBan></NDHDon></DLHDon></HDon>";

    let invoice = parse_invoice(xml).unwrap();
    assert_eq!(invoice.provider, Provider::Viettel);
    assert_eq!(invoice.number, "0000004");
    assert_eq!(invoice.seller.tax_id, "0100100100");
}

#[test]
fn date_tolerance() {
    let expected = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    for date in ["2026-01-15", "15/01/2026"] {
        let xml = format!(
            "<Invoice><InvoiceNo>1</InvoiceNo><InvoiceDate>{date}</InvoiceDate>\
<Seller><TaxID>0123456789</TaxID></Seller></Invoice>"
        );
        let invoice = parse_invoice(xml.as_bytes()).unwrap();
        assert_eq!(invoice.date, Some(expected), "input date {date}");
    }

    let xml = "<Invoice><InvoiceNo>1</InvoiceNo><InvoiceDate>2026-01-15T10:30:00</InvoiceDate>\
<Seller><TaxID>0123456789</TaxID></Seller></Invoice>";
    let invoice = parse_invoice(xml.as_bytes()).unwrap();
    assert_eq!(
        invoice.date,
        Some(Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).unwrap())
    );

    // an invalid date is tolerated, not an error
    let xml = "<Invoice><InvoiceNo>1</InvoiceNo><InvoiceDate>yesterday</InvoiceDate>\
<Seller><TaxID>0123456789</TaxID></Seller></Invoice>";
    let invoice = parse_invoice(xml.as_bytes()).unwrap();
    assert_eq!(invoice.date, None);
}

#[test]
fn signature_extraction_across_depths() {
    let xml = b"<Invoice><Body><Inner><Signature>sig</Signature></Inner></Body>\
<TaxID>0123456789</TaxID></Invoice>";
    let extraction = SignatureExtractor::new().extract(xml).unwrap();
    assert_eq!(extraction.signature.text(), "sig");
    // provider still derives from the root element
    assert_eq!(extraction.provider, Provider::TCT);
}

#[test]
fn no_buffer_satisfies_two_adapters_out_of_order() {
    let registry = AdapterRegistry::new();
    let cases: [(&[u8], Provider); 5] = [
        (b"<SInvoice><InvoiceNo>1</InvoiceNo></SInvoice>", Provider::VNPT),
        (
            b"<HDon><TTChung><SHDon>9</SHDon></TTChung></HDon>",
            Provider::Viettel,
        ),
        (b"<EInvoice><Header></Header></EInvoice>", Provider::FPT),
        (
            b"<Invoice><SellerInfo><MST>0500500500</MST></SellerInfo></Invoice>",
            Provider::MISA,
        ),
        (
            b"<Invoice><Seller><TaxID>0123456789</TaxID></Seller></Invoice>",
            Provider::TCT,
        ),
    ];
    for (content, expected) in cases {
        assert_eq!(registry.detect(content).unwrap().provider(), expected);
    }
}

#[test]
fn raw_bytes_roundtrip_for_every_adapter() {
    let inputs: [&[u8]; 5] = [
        b"<SInvoice><InvoiceNo>1</InvoiceNo></SInvoice>",
        b"<HDon><TTChung><SHDon>2</SHDon></TTChung></HDon>",
        b"<EInvoice><Header><InvoiceNumber>3</InvoiceNumber></Header></EInvoice>",
        b"<Invoice><InvoiceData><InvoiceNumber>4</InvoiceNumber></InvoiceData>\
<SellerInfo><MST>0500500500</MST></SellerInfo></Invoice>",
        b"<Invoice><InvoiceNo>5</InvoiceNo><Seller><TaxID>0123456789</TaxID></Seller></Invoice>",
    ];
    let registry = AdapterRegistry::new();
    for input in inputs {
        let invoice = registry.parse(input).unwrap();
        assert_eq!(invoice.raw_xml, input.to_vec(), "raw bytes must be retained");
    }
}

#[test]
fn pipeline_reports_format_and_provider() {
    let pipeline = ProcessingPipeline::new();
    let processed = pipeline
        .process(b"<SInvoice><InvoiceNo>88</InvoiceNo></SInvoice>")
        .unwrap();
    assert_eq!(processed.provider, Provider::VNPT);
    assert_eq!(processed.invoice.number, "88");
}
