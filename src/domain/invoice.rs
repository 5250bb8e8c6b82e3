//! Unified invoice model shared by all provider adapters.
//!
//! Every provider schema is mapped into these types; downstream consumers
//! (validation, serialization, verification) never see provider-specific
//! structures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// E-invoice providers recognized by the parsing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Tax authority standard format (Tổng cục Thuế)
    TCT,
    VNPT,
    MISA,
    Viettel,
    FPT,
    Unknown,
}

impl Default for Provider {
    fn default() -> Self {
        Provider::Unknown
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Provider::TCT => "TCT",
            Provider::VNPT => "VNPT",
            Provider::MISA => "MISA",
            Provider::Viettel => "Viettel",
            Provider::FPT => "FPT",
            Provider::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

impl Provider {
    /// Map a document root element name to its provider (authoritative table)
    #[must_use]
    pub fn from_root_tag(tag: &str) -> Provider {
        match tag {
            "SInvoice" => Provider::VNPT,
            "HDon" => Provider::Viettel,
            "EInvoice" => Provider::FPT,
            "HoaDon" => Provider::MISA,
            "Invoice" | "Invoices" => Provider::TCT,
            _ => Provider::Unknown,
        }
    }
}

/// Invoice classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    #[default]
    Normal,
    Replacement,
    Adjustment,
}

/// VAT rate in percent. Vietnam uses 0, 5 and 10; out-of-range values are
/// kept as parsed so that business validation can report them later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VATRate(pub i32);

impl VATRate {
    pub const ZERO: VATRate = VATRate(0);
    pub const FIVE: VATRate = VATRate(5);
    pub const TEN: VATRate = VATRate(10);

    /// Whether the rate is one of the standard Vietnamese VAT rates
    #[must_use]
    pub fn is_standard(&self) -> bool {
        matches!(self.0, 0 | 5 | 10)
    }
}

/// A party on the invoice (seller or buyer)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    /// Vietnamese tax identifier (MST), 10 or 13 digits
    pub tax_id: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub bank_account: String,
    pub bank_name: String,
}

/// A single invoice line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub number: i32,
    pub code: String,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Discount percentage
    pub discount: Decimal,
    pub discount_amount: Decimal,
    /// Line amount before tax
    pub amount: Decimal,
    pub vat_rate: VATRate,
    pub vat_amount: Decimal,
    /// Line total including tax
    pub total: Decimal,
}

/// Signature descriptor embedded in the provider XML (declared metadata,
/// distinct from the cryptographic XMLDSig verification path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedSignature {
    /// Raw signature value as stored in the document (usually base64)
    pub value: String,
    pub date: Option<DateTime<Utc>>,
    pub signer_name: String,
    pub signer_position: String,
    pub cert_serial: String,
}

/// Unified invoice produced by any provider adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    /// 2-5 character alphanumeric series code, e.g. "KK23"
    pub series: String,
    pub date: Option<DateTime<Utc>>,
    pub invoice_type: InvoiceType,
    pub provider: Provider,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub seller: Party,
    pub buyer: Party,
    pub items: Vec<LineItem>,
    pub subtotal_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_terms: String,
    pub remarks: String,
    pub signature: Option<EmbeddedSignature>,
    /// Original input bytes, kept so the signed octets can be re-verified
    /// later without refetching. Never serialized.
    #[serde(skip)]
    pub raw_xml: Vec<u8>,
}

impl Invoice {
    /// New invoice for the given provider with raw bytes retained
    #[must_use]
    pub fn new(provider: Provider, raw_xml: Vec<u8>) -> Self {
        Invoice {
            provider,
            raw_xml,
            ..Invoice::default()
        }
    }
}
