//! FPT eInvoice adapter (`<EInvoice>` root).
//!
//! FPT documents may carry both a seller and a buyer signature; the seller
//! signature is the legally significant one and is the one surfaced.

use serde::Deserialize;

use super::fields::{parse_date, parse_decimal, parse_invoice_type, parse_vat_rate};
use super::{contains_bytes, ProviderAdapter};
use crate::domain::invoice::{EmbeddedSignature, Invoice, LineItem, Party, Provider};
use crate::infra::error::{ProcessorError, ProcessorResult};

#[derive(Debug, Default, Deserialize)]
struct FptInvoice {
    #[serde(rename = "Header", default)]
    header: FptHeader,
    #[serde(rename = "Seller", default)]
    seller: FptCompany,
    #[serde(rename = "Buyer", default)]
    buyer: FptCompany,
    #[serde(rename = "Details", default)]
    details: FptDetails,
    #[serde(rename = "Totals", default)]
    totals: FptTotals,
    #[serde(rename = "Signatures", default)]
    signatures: Option<FptSignatures>,
}

#[derive(Debug, Default, Deserialize)]
struct FptHeader {
    #[serde(rename = "InvoiceNumber", default)]
    invoice_number: String,
    #[serde(rename = "InvoiceSeries", default)]
    invoice_series: String,
    #[serde(rename = "InvoiceDate", default)]
    invoice_date: String,
    #[serde(rename = "InvoiceType", default)]
    invoice_type: String,
    #[serde(rename = "CurrencyCode", default)]
    currency_code: String,
    #[serde(rename = "ExchangeRate", default)]
    exchange_rate: String,
    #[serde(rename = "Notes", default)]
    notes: String,
}

#[derive(Debug, Default, Deserialize)]
struct FptCompany {
    #[serde(rename = "CompanyName", default)]
    company_name: String,
    #[serde(rename = "TaxCode", default)]
    tax_code: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "PhoneNumber", default)]
    phone_number: String,
    #[serde(rename = "EmailAddress", default)]
    email_address: String,
    #[serde(rename = "BankAccountNo", default)]
    bank_account_no: String,
    #[serde(rename = "BankName", default)]
    bank_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct FptDetails {
    #[serde(rename = "Line", default)]
    lines: Vec<FptLine>,
}

#[derive(Debug, Default, Deserialize)]
struct FptLine {
    #[serde(rename = "LineNumber", default)]
    line_number: i32,
    #[serde(rename = "ProductCode", default)]
    product_code: String,
    #[serde(rename = "ProductName", default)]
    product_name: String,
    #[serde(rename = "ProductDesc", default)]
    product_desc: String,
    #[serde(rename = "UnitOfMeasure", default)]
    unit_of_measure: String,
    #[serde(rename = "Quantity", default)]
    quantity: String,
    #[serde(rename = "UnitPrice", default)]
    unit_price: String,
    #[serde(rename = "DiscountRate", default)]
    discount_rate: String,
    #[serde(rename = "DiscountAmount", default)]
    discount_amount: String,
    #[serde(rename = "LineAmount", default)]
    line_amount: String,
    #[serde(rename = "VATRatePercent", default)]
    vat_rate_percent: String,
    #[serde(rename = "VATAmount", default)]
    vat_amount: String,
    #[serde(rename = "LineTotal", default)]
    line_total: String,
}

#[derive(Debug, Default, Deserialize)]
struct FptTotals {
    #[serde(rename = "SubTotal", default)]
    sub_total: String,
    #[serde(rename = "TotalVAT", default)]
    total_vat: String,
    #[serde(rename = "GrandTotal", default)]
    grand_total: String,
}

#[derive(Debug, Default, Deserialize)]
struct FptSignatures {
    #[serde(rename = "SellerSignature", default)]
    seller_signature: Option<FptSignature>,
    #[serde(rename = "BuyerSignature", default)]
    buyer_signature: Option<FptSignature>,
}

#[derive(Debug, Default, Deserialize)]
struct FptSignature {
    #[serde(rename = "SignatureValue", default)]
    signature_value: String,
    #[serde(rename = "SignedDateTime", default)]
    signed_date_time: String,
    #[serde(rename = "SignerFullName", default)]
    signer_full_name: String,
    #[serde(rename = "SignerJobTitle", default)]
    signer_job_title: String,
    #[serde(rename = "CertificateSerial", default)]
    certificate_serial: String,
}

/// Adapter for the FPT eInvoice format
pub struct FptAdapter;

impl ProviderAdapter for FptAdapter {
    fn can_parse(&self, content: &[u8]) -> bool {
        contains_bytes(content, b"<EInvoice>")
            || contains_bytes(content, b"fpt")
            || contains_bytes(content, b"FPT")
    }

    fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice> {
        let text = std::str::from_utf8(content)
            .map_err(|e| ProcessorError::parse(Provider::FPT, "content", e.to_string()))?;
        let inv: FptInvoice = quick_xml::de::from_str(text)
            .map_err(|e| ProcessorError::parse(Provider::FPT, "xml", e.to_string()))?;
        Ok(convert_invoice(&inv, content))
    }

    fn provider(&self) -> Provider {
        Provider::FPT
    }
}

fn convert_invoice(inv: &FptInvoice, raw_xml: &[u8]) -> Invoice {
    let mut result = Invoice::new(Provider::FPT, raw_xml.to_vec());
    result.number = inv.header.invoice_number.clone();
    result.series = inv.header.invoice_series.clone();
    result.date = parse_date(&inv.header.invoice_date);
    result.invoice_type = parse_invoice_type(&inv.header.invoice_type);
    result.currency = inv.header.currency_code.clone();
    result.exchange_rate = parse_decimal(&inv.header.exchange_rate);
    result.remarks = inv.header.notes.clone();
    result.seller = convert_company(&inv.seller);
    result.buyer = convert_company(&inv.buyer);
    result.items = inv.details.lines.iter().map(convert_line).collect();
    result.subtotal_amount = parse_decimal(&inv.totals.sub_total);
    result.tax_amount = parse_decimal(&inv.totals.total_vat);
    result.total_amount = parse_decimal(&inv.totals.grand_total);

    if let Some(signatures) = &inv.signatures {
        result.signature = signatures
            .seller_signature
            .as_ref()
            .or(signatures.buyer_signature.as_ref())
            .map(convert_signature);
    }
    result
}

fn convert_company(c: &FptCompany) -> Party {
    Party {
        name: c.company_name.clone(),
        tax_id: c.tax_code.clone(),
        address: c.address.clone(),
        phone: c.phone_number.clone(),
        email: c.email_address.clone(),
        bank_account: c.bank_account_no.clone(),
        bank_name: c.bank_name.clone(),
    }
}

fn convert_line(line: &FptLine) -> LineItem {
    LineItem {
        number: line.line_number,
        code: line.product_code.clone(),
        name: line.product_name.clone(),
        description: line.product_desc.clone(),
        unit: line.unit_of_measure.clone(),
        quantity: parse_decimal(&line.quantity),
        unit_price: parse_decimal(&line.unit_price),
        discount: parse_decimal(&line.discount_rate),
        discount_amount: parse_decimal(&line.discount_amount),
        amount: parse_decimal(&line.line_amount),
        vat_rate: parse_vat_rate(&line.vat_rate_percent),
        vat_amount: parse_decimal(&line.vat_amount),
        total: parse_decimal(&line.line_total),
    }
}

fn convert_signature(sig: &FptSignature) -> EmbeddedSignature {
    EmbeddedSignature {
        value: sig.signature_value.clone(),
        date: parse_date(&sig.signed_date_time),
        signer_name: sig.signer_full_name.clone(),
        signer_position: sig.signer_job_title.clone(),
        cert_serial: sig.certificate_serial.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const SAMPLE: &str = r#"<EInvoice>
        <Header>
            <InvoiceNumber>0000003</InvoiceNumber>
            <InvoiceSeries>FP25</InvoiceSeries>
            <InvoiceDate>2026-03-10</InvoiceDate>
            <InvoiceType>Adjustment</InvoiceType>
            <CurrencyCode>VND</CurrencyCode>
        </Header>
        <Seller><CompanyName>FPT Seller</CompanyName><TaxCode>0300300300</TaxCode></Seller>
        <Buyer><CompanyName>Buyer Co</CompanyName><TaxCode>0400400400</TaxCode></Buyer>
        <Details>
            <Line>
                <LineNumber>1</LineNumber>
                <ProductName>Phan mem</ProductName>
                <Quantity>3</Quantity>
                <UnitPrice>400000</UnitPrice>
                <VATRatePercent>8</VATRatePercent>
                <LineTotal>1296000</LineTotal>
            </Line>
        </Details>
        <Totals>
            <SubTotal>1200000</SubTotal>
            <TotalVAT>96000</TotalVAT>
            <GrandTotal>1296000</GrandTotal>
        </Totals>
        <Signatures>
            <SellerSignature>
                <SignerFullName>Le Van C</SignerFullName>
                <SignedDateTime>2026-03-10T09:00:00</SignedDateTime>
            </SellerSignature>
            <BuyerSignature>
                <SignerFullName>Pham Thi D</SignerFullName>
            </BuyerSignature>
        </Signatures>
    </EInvoice>"#;

    #[test]
    fn test_parse_fpt_invoice() {
        let inv = FptAdapter.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(inv.number, "0000003");
        assert_eq!(inv.series, "FP25");
        assert_eq!(inv.invoice_type, crate::domain::invoice::InvoiceType::Adjustment);
        assert_eq!(inv.seller.tax_id, "0300300300");
        assert_eq!(inv.total_amount, Decimal::new(1_296_000, 0));
        // Non-standard VAT rate is kept as stored
        assert_eq!(inv.items[0].vat_rate.0, 8);
        assert!(!inv.items[0].vat_rate.is_standard());
        assert_eq!(inv.raw_xml, SAMPLE.as_bytes());
    }

    #[test]
    fn test_seller_signature_preferred() {
        let inv = FptAdapter.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(inv.signature.unwrap().signer_name, "Le Van C");
    }

    #[test]
    fn test_sniff() {
        assert!(FptAdapter.can_parse(SAMPLE.as_bytes()));
        assert!(!FptAdapter.can_parse(b"<SInvoice/>"));
    }
}
