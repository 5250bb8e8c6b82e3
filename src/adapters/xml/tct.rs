//! TCT (tax authority standard) adapter.
//!
//! The most generic of the five schemas; its sniff must run last in the
//! registry because `<Invoice>`/`<TaxID>` also appear in other exports.
//! Documents come either as a single `<Invoice>` or an `<Invoices>` batch;
//! for batches the first invoice is parsed.

use serde::Deserialize;

use super::fields::{parse_date, parse_decimal, parse_invoice_type};
use super::{contains_bytes, ProviderAdapter};
use crate::domain::invoice::{EmbeddedSignature, Invoice, LineItem, Party, Provider, VATRate};
use crate::infra::error::{ProcessorError, ProcessorResult};

#[derive(Debug, Default, Deserialize)]
struct TctInvoices {
    #[serde(rename = "Invoice", default)]
    invoices: Vec<TctInvoice>,
}

#[derive(Debug, Default, Deserialize)]
struct TctInvoice {
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
    seller: TctParty,
    #[serde(rename = "Buyer", default)]
    buyer: TctParty,
    #[serde(rename = "Items", default)]
    items: TctItems,
    #[serde(rename = "SubtotalAmount", default)]
    subtotal_amount: String,
    #[serde(rename = "TaxAmount", default)]
    tax_amount: String,
    #[serde(rename = "TotalAmount", default)]
    total_amount: String,
    #[serde(rename = "PaymentTerms", default)]
    payment_terms: String,
    #[serde(rename = "Remarks", default)]
    remarks: String,
    #[serde(rename = "Signature", default)]
    signature: Option<TctSignature>,
}

#[derive(Debug, Default, Deserialize)]
struct TctParty {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "TaxID", default)]
    tax_id: String,
    #[serde(rename = "PhoneNumber", default)]
    phone_number: String,
    #[serde(rename = "Email", default)]
    email: String,
    #[serde(rename = "BankAccount", default)]
    bank_account: String,
    #[serde(rename = "BankName", default)]
    bank_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct TctItems {
    #[serde(rename = "Item", default)]
    items: Vec<TctItem>,
}

#[derive(Debug, Default, Deserialize)]
struct TctItem {
    #[serde(rename = "ItemNo", default)]
    item_no: i32,
    #[serde(rename = "ItemCode", default)]
    item_code: String,
    #[serde(rename = "ItemName", default)]
    item_name: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "UnitOfMeasure", default)]
    unit_of_measure: String,
    #[serde(rename = "Quantity", default)]
    quantity: String,
    #[serde(rename = "UnitPrice", default)]
    unit_price: String,
    #[serde(rename = "Discount", default)]
    discount: String,
    #[serde(rename = "Amount", default)]
    amount: String,
    #[serde(rename = "TaxRatePercent", default)]
    tax_rate_percent: i32,
    #[serde(rename = "TaxAmount", default)]
    tax_amount: String,
    #[serde(rename = "LineTotal", default)]
    line_total: String,
}

#[derive(Debug, Default, Deserialize)]
struct TctSignature {
    #[serde(rename = "SignatureValue", default)]
    signature_value: String,
    #[serde(rename = "SignatureDate", default)]
    signature_date: String,
    #[serde(rename = "SignerName", default)]
    signer_name: String,
    #[serde(rename = "SignerPosition", default)]
    signer_position: String,
    #[serde(rename = "CertificateNo", default)]
    certificate_no: String,
}

/// Adapter for the tax authority standard format
pub struct TctAdapter;

impl ProviderAdapter for TctAdapter {
    fn can_parse(&self, content: &[u8]) -> bool {
        contains_bytes(content, b"<Invoice>")
            && contains_bytes(content, b"<TaxID>")
            && !contains_bytes(content, b"vnpt")
            && !contains_bytes(content, b"<MST>")
            && !contains_bytes(content, b"<SInvoice>")
    }

    fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice> {
        let text = std::str::from_utf8(content)
            .map_err(|e| ProcessorError::parse(Provider::TCT, "content", e.to_string()))?;

        // Single invoice first, then the batched layout
        if let Ok(single) = quick_xml::de::from_str::<TctInvoice>(text) {
            if !single.invoice_no.is_empty() {
                return Ok(convert_invoice(&single, content));
            }
        }

        let multi: TctInvoices = quick_xml::de::from_str(text)
            .map_err(|e| ProcessorError::parse(Provider::TCT, "xml", e.to_string()))?;
        let first = multi
            .invoices
            .first()
            .ok_or_else(|| ProcessorError::parse(Provider::TCT, "invoices", "no invoices found"))?;
        Ok(convert_invoice(first, content))
    }

    fn provider(&self) -> Provider {
        Provider::TCT
    }
}

fn convert_invoice(inv: &TctInvoice, raw_xml: &[u8]) -> Invoice {
    let mut result = Invoice::new(Provider::TCT, raw_xml.to_vec());
    result.number = inv.invoice_no.clone();
    result.series = inv.invoice_series.clone();
    result.date = parse_date(&inv.invoice_date);
    result.invoice_type = parse_invoice_type(&inv.invoice_type);
    result.currency = inv.currency.clone();
    result.exchange_rate = parse_decimal(&inv.exchange_rate);
    result.seller = convert_party(&inv.seller);
    result.buyer = convert_party(&inv.buyer);
    result.items = inv.items.items.iter().map(convert_item).collect();
    result.subtotal_amount = parse_decimal(&inv.subtotal_amount);
    result.tax_amount = parse_decimal(&inv.tax_amount);
    result.total_amount = parse_decimal(&inv.total_amount);
    result.payment_terms = inv.payment_terms.clone();
    result.remarks = inv.remarks.clone();
    result.signature = inv.signature.as_ref().map(convert_signature);
    result
}

fn convert_party(p: &TctParty) -> Party {
    Party {
        name: p.name.clone(),
        tax_id: p.tax_id.clone(),
        address: p.address.clone(),
        phone: p.phone_number.clone(),
        email: p.email.clone(),
        bank_account: p.bank_account.clone(),
        bank_name: p.bank_name.clone(),
    }
}

fn convert_item(item: &TctItem) -> LineItem {
    LineItem {
        number: item.item_no,
        code: item.item_code.clone(),
        name: item.item_name.clone(),
        description: item.description.clone(),
        unit: item.unit_of_measure.clone(),
        quantity: parse_decimal(&item.quantity),
        unit_price: parse_decimal(&item.unit_price),
        discount: parse_decimal(&item.discount),
        discount_amount: Default::default(),
        amount: parse_decimal(&item.amount),
        vat_rate: VATRate(item.tax_rate_percent),
        vat_amount: parse_decimal(&item.tax_amount),
        total: parse_decimal(&item.line_total),
    }
}

fn convert_signature(sig: &TctSignature) -> EmbeddedSignature {
    EmbeddedSignature {
        value: sig.signature_value.clone(),
        date: parse_date(&sig.signature_date),
        signer_name: sig.signer_name.clone(),
        signer_position: sig.signer_position.clone(),
        cert_serial: sig.certificate_no.clone(),
    }
}
