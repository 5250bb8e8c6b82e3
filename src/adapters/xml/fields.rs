//! Tolerant field parsing shared by the provider adapters.
//!
//! Provider exports are inconsistent about dates and numbers; a value that
//! cannot be parsed becomes the zero value instead of failing the invoice.
//! Business validation of the parsed values is a separate concern.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::invoice::{InvoiceType, VATRate};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a date in any of the formats seen in provider exports.
/// Returns `None` for unparseable input.
#[must_use]
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}

/// Parse a decimal amount, zero on failure
#[must_use]
pub fn parse_decimal(s: &str) -> Decimal {
    s.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Derive the VAT rate by truncating the numeric rate to an integer.
/// Out-of-range values are kept as parsed.
#[must_use]
pub fn parse_vat_rate(s: &str) -> VATRate {
    match s.trim().parse::<Decimal>() {
        Ok(rate) => VATRate(rate.trunc().to_i32().unwrap_or(0)),
        Err(_) => VATRate(0),
    }
}

/// Map an invoice-type string, case-insensitively. Unknown values are Normal.
#[must_use]
pub fn parse_invoice_type(s: &str) -> InvoiceType {
    let s = s.trim();
    if s.eq_ignore_ascii_case("replacement") {
        InvoiceType::Replacement
    } else if s.eq_ignore_ascii_case("adjustment") {
        InvoiceType::Adjustment
    } else {
        InvoiceType::Normal
    }
}
