//! VNPT invoice adapter (`<SInvoice>` root).

use serde::Deserialize;

use super::fields::{parse_date, parse_decimal, parse_invoice_type, parse_vat_rate};
use super::{contains_bytes, ProviderAdapter};
use crate::domain::invoice::{EmbeddedSignature, Invoice, LineItem, Party, Provider};
use crate::infra::error::{ProcessorError, ProcessorResult};

#[derive(Debug, Default, Deserialize)]
struct VnptInvoice {
    #[serde(rename = "InvoiceNo", default)]
    invoice_no: String,
    #[serde(rename = "InvoiceSeries", default)]
    invoice_series: String,
    #[serde(rename = "InvoiceDate", default)]
    invoice_date: String,
    #[serde(rename = "InvoiceType", default)]
    invoice_type: String,
    #[serde(rename = "Currency", default)]
    currency: String,
    #[serde(rename = "ExchangeRate", default)]
    exchange_rate: String,
    #[serde(rename = "Seller", default)]
    seller: VnptSeller,
    #[serde(rename = "Buyer", default)]
    buyer: VnptBuyer,
    #[serde(rename = "Products", default)]
    products: VnptProducts,
    #[serde(rename = "Summary", default)]
    summary: VnptSummary,
    #[serde(rename = "PaymentTerms", default)]
    payment_terms: String,
    #[serde(rename = "Note", default)]
    note: String,
    #[serde(rename = "SignInfo", default)]
    sign_info: Option<VnptSign>,
}

#[derive(Debug, Default, Deserialize)]
struct VnptSeller {
    #[serde(rename = "SellerName", default)]
    name: String,
    #[serde(rename = "SellerTaxCode", default)]
    tax_code: String,
    #[serde(rename = "SellerAddress", default)]
    address: String,
    #[serde(rename = "SellerPhone", default)]
    phone: String,
    #[serde(rename = "SellerEmail", default)]
    email: String,
    #[serde(rename = "SellerBankAcc", default)]
    bank_acc: String,
    #[serde(rename = "SellerBankName", default)]
    bank_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct VnptBuyer {
    #[serde(rename = "BuyerName", default)]
    name: String,
    #[serde(rename = "BuyerTaxCode", default)]
    tax_code: String,
    #[serde(rename = "BuyerAddress", default)]
    address: String,
    #[serde(rename = "BuyerPhone", default)]
    phone: String,
    #[serde(rename = "BuyerEmail", default)]
    email: String,
    #[serde(rename = "BuyerBankAcc", default)]
    bank_acc: String,
    #[serde(rename = "BuyerBankName", default)]
    bank_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct VnptProducts {
    #[serde(rename = "Product", default)]
    products: Vec<VnptProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct VnptProduct {
    #[serde(rename = "LineNo", default)]
    line_no: i32,
    #[serde(rename = "ProdCode", default)]
    prod_code: String,
    #[serde(rename = "ProdName", default)]
    prod_name: String,
    #[serde(rename = "ProdUnit", default)]
    prod_unit: String,
    #[serde(rename = "ProdQuantity", default)]
    prod_quantity: String,
    #[serde(rename = "ProdPrice", default)]
    prod_price: String,
    #[serde(rename = "Discount", default)]
    discount: String,
    #[serde(rename = "DiscountAmt", default)]
    discount_amt: String,
    #[serde(rename = "Amount", default)]
    amount: String,
    #[serde(rename = "VATRate", default)]
    vat_rate: String,
    #[serde(rename = "VATAmount", default)]
    vat_amount: String,
    #[serde(rename = "Total", default)]
    total: String,
}

#[derive(Debug, Default, Deserialize)]
struct VnptSummary {
    #[serde(rename = "TotalAmount", default)]
    total_amount: String,
    #[serde(rename = "TotalVATAmount", default)]
    total_vat_amount: String,
    #[serde(rename = "TotalPayment", default)]
    total_payment: String,
}

#[derive(Debug, Default, Deserialize)]
struct VnptSign {
    #[serde(rename = "SignatureValue", default)]
    signature_value: String,
    #[serde(rename = "SignedDate", default)]
    signed_date: String,
    #[serde(rename = "SignerName", default)]
    signer_name: String,
    #[serde(rename = "SignerTitle", default)]
    signer_title: String,
    #[serde(rename = "CertSerial", default)]
    cert_serial: String,
}

/// Adapter for the VNPT invoice format
pub struct VnptAdapter;

impl ProviderAdapter for VnptAdapter {
    fn can_parse(&self, content: &[u8]) -> bool {
        contains_bytes(content, b"<SInvoice>")
            || contains_bytes(content, b"vnpt")
            || contains_bytes(content, b"VNPT")
    }

    fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice> {
        let text = std::str::from_utf8(content)
            .map_err(|e| ProcessorError::parse(Provider::VNPT, "content", e.to_string()))?;
        let inv: VnptInvoice = quick_xml::de::from_str(text)
            .map_err(|e| ProcessorError::parse(Provider::VNPT, "xml", e.to_string()))?;
        Ok(convert_invoice(&inv, content))
    }

    fn provider(&self) -> Provider {
        Provider::VNPT
    }
}

fn convert_invoice(inv: &VnptInvoice, raw_xml: &[u8]) -> Invoice {
    let mut result = Invoice::new(Provider::VNPT, raw_xml.to_vec());
    result.number = inv.invoice_no.clone();
    result.series = inv.invoice_series.clone();
    result.date = parse_date(&inv.invoice_date);
    result.invoice_type = parse_invoice_type(&inv.invoice_type);
    result.currency = inv.currency.clone();
    result.exchange_rate = parse_decimal(&inv.exchange_rate);
    result.payment_terms = inv.payment_terms.clone();
    result.remarks = inv.note.clone();

    result.seller = Party {
        name: inv.seller.name.clone(),
        tax_id: inv.seller.tax_code.clone(),
        address: inv.seller.address.clone(),
        phone: inv.seller.phone.clone(),
        email: inv.seller.email.clone(),
        bank_account: inv.seller.bank_acc.clone(),
        bank_name: inv.seller.bank_name.clone(),
    };
    result.buyer = Party {
        name: inv.buyer.name.clone(),
        tax_id: inv.buyer.tax_code.clone(),
        address: inv.buyer.address.clone(),
        phone: inv.buyer.phone.clone(),
        email: inv.buyer.email.clone(),
        bank_account: inv.buyer.bank_acc.clone(),
        bank_name: inv.buyer.bank_name.clone(),
    };

    result.items = inv.products.products.iter().map(convert_product).collect();
    result.subtotal_amount = parse_decimal(&inv.summary.total_amount);
    result.tax_amount = parse_decimal(&inv.summary.total_vat_amount);
    result.total_amount = parse_decimal(&inv.summary.total_payment);
    result.signature = inv.sign_info.as_ref().map(convert_signature);
    result
}

fn convert_product(prod: &VnptProduct) -> LineItem {
    LineItem {
        number: prod.line_no,
        code: prod.prod_code.clone(),
        name: prod.prod_name.clone(),
        description: String::new(),
        unit: prod.prod_unit.clone(),
        quantity: parse_decimal(&prod.prod_quantity),
        unit_price: parse_decimal(&prod.prod_price),
        discount: parse_decimal(&prod.discount),
        discount_amount: parse_decimal(&prod.discount_amt),
        amount: parse_decimal(&prod.amount),
        vat_rate: parse_vat_rate(&prod.vat_rate),
        vat_amount: parse_decimal(&prod.vat_amount),
        total: parse_decimal(&prod.total),
    }
}

fn convert_signature(sig: &VnptSign) -> EmbeddedSignature {
    EmbeddedSignature {
        value: sig.signature_value.clone(),
        date: parse_date(&sig.signed_date),
        signer_name: sig.signer_name.clone(),
        signer_position: sig.signer_title.clone(),
        cert_serial: sig.cert_serial.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const SAMPLE: &str = r#"<SInvoice>
        <InvoiceNo>0000002</InvoiceNo>
        <InvoiceSeries>AB24</InvoiceSeries>
        <InvoiceDate>2026-02-01</InvoiceDate>
        <Currency>VND</Currency>
        <Seller>
            <SellerName>Cong ty TNHH ABC</SellerName>
            <SellerTaxCode>0312345678</SellerTaxCode>
        </Seller>
        <Buyer>
            <BuyerName>Khach hang XYZ</BuyerName>
            <BuyerTaxCode>0398765432</BuyerTaxCode>
        </Buyer>
        <Products>
            <Product>
                <LineNo>1</LineNo>
                <ProdName>Dich vu tu van</ProdName>
                <ProdQuantity>1</ProdQuantity>
                <ProdPrice>5000000</ProdPrice>
                <VATRate>10</VATRate>
                <Total>5500000</Total>
            </Product>
        </Products>
        <Summary>
            <TotalAmount>5000000</TotalAmount>
            <TotalVATAmount>500000</TotalVATAmount>
            <TotalPayment>5500000</TotalPayment>
        </Summary>
        <SignInfo>
            <SignerName>Nguyen Van A</SignerName>
            <SignedDate>2026-02-01T08:00:00</SignedDate>
            <CertSerial>5401F1</CertSerial>
        </SignInfo>
    </SInvoice>"#;

    #[test]
    fn test_parse_vnpt_invoice() {
        let inv = VnptAdapter.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(inv.number, "0000002");
        assert_eq!(inv.series, "AB24");
        assert_eq!(inv.provider, Provider::VNPT);
        assert_eq!(inv.currency, "VND");
        assert_eq!(inv.seller.tax_id, "0312345678");
        assert_eq!(inv.buyer.name, "Khach hang XYZ");
        assert_eq!(inv.subtotal_amount, Decimal::new(5_000_000, 0));
        assert_eq!(inv.total_amount, Decimal::new(5_500_000, 0));
        assert_eq!(inv.items.len(), 1);
        assert_eq!(inv.items[0].vat_rate.0, 10);
        assert_eq!(inv.raw_xml, SAMPLE.as_bytes());
    }

    #[test]
    fn test_embedded_signature_descriptor() {
        let inv = VnptAdapter.parse(SAMPLE.as_bytes()).unwrap();
        let sig = inv.signature.expect("signature block present");
        assert_eq!(sig.signer_name, "Nguyen Van A");
        assert_eq!(sig.cert_serial, "5401F1");
        assert!(sig.date.is_some());
    }

    #[test]
    fn test_sniff() {
        assert!(VnptAdapter.can_parse(b"<SInvoice><InvoiceNo>1</InvoiceNo></SInvoice>"));
        assert!(VnptAdapter.can_parse(b"<Doc source=\"vnpt\"/>"));
        assert!(!VnptAdapter.can_parse(b"<HDon></HDon>"));
    }
}
