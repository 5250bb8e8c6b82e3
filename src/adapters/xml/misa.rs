//! MISA adapter.
//!
//! MISA exports use an `<Invoice>` root like TCT but Vietnamese field names
//! (`MST`, `TenHang`, ...). The `<MST>` sniff must therefore run before the
//! TCT fallback in the registry.

use serde::Deserialize;

use super::fields::{parse_date, parse_decimal, parse_invoice_type, parse_vat_rate};
use super::{contains_bytes, ProviderAdapter};
use crate::domain::invoice::{EmbeddedSignature, Invoice, LineItem, Party, Provider};
use crate::infra::error::{ProcessorError, ProcessorResult};

#[derive(Debug, Default, Deserialize)]
struct MisaInvoice {
    #[serde(rename = "InvoiceData", default)]
    invoice_data: MisaInvoiceData,
    #[serde(rename = "SellerInfo", default)]
    seller_info: MisaParty,
    #[serde(rename = "BuyerInfo", default)]
    buyer_info: MisaParty,
    #[serde(rename = "InvoiceDetail", default)]
    invoice_detail: MisaDetails,
    #[serde(rename = "TotalSection", default)]
    total_section: MisaTotals,
    #[serde(rename = "SignatureInfo", default)]
    signature_info: Option<MisaSignature>,
}

#[derive(Debug, Default, Deserialize)]
struct MisaInvoiceData {
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
    #[serde(rename = "PaymentTerms", default)]
    payment_terms: String,
    #[serde(rename = "Description", default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct MisaParty {
    /// Tax ID
    #[serde(rename = "MST", default)]
    mst: String,
    #[serde(rename = "CompanyName", default)]
    company_name: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Phone", default)]
    phone: String,
    #[serde(rename = "Email", default)]
    email: String,
    #[serde(rename = "BankAccount", default)]
    bank_account: String,
    #[serde(rename = "BankName", default)]
    bank_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct MisaDetails {
    #[serde(rename = "Item", default)]
    items: Vec<MisaItem>,
}

#[derive(Debug, Default, Deserialize)]
struct MisaItem {
    #[serde(rename = "STT", default)]
    stt: i32,
    #[serde(rename = "MaHang", default)]
    ma_hang: String,
    #[serde(rename = "TenHang", default)]
    ten_hang: String,
    #[serde(rename = "MoTa", default)]
    mo_ta: String,
    #[serde(rename = "DVT", default)]
    dvt: String,
    #[serde(rename = "SoLuong", default)]
    so_luong: String,
    #[serde(rename = "DonGia", default)]
    don_gia: String,
    #[serde(rename = "ChietKhau", default)]
    chiet_khau: String,
    #[serde(rename = "TienCK", default)]
    tien_ck: String,
    #[serde(rename = "ThanhTien", default)]
    thanh_tien: String,
    #[serde(rename = "ThueSuat", default)]
    thue_suat: String,
    #[serde(rename = "TienThue", default)]
    tien_thue: String,
    #[serde(rename = "TongCong", default)]
    tong_cong: String,
}

#[derive(Debug, Default, Deserialize)]
struct MisaTotals {
    #[serde(rename = "TongTienHang", default)]
    tong_tien_hang: String,
    #[serde(rename = "TongTienThue", default)]
    tong_tien_thue: String,
    #[serde(rename = "TongThanhToan", default)]
    tong_thanh_toan: String,
}

#[derive(Debug, Default, Deserialize)]
struct MisaSignature {
    #[serde(rename = "GiaTriChuKy", default)]
    gia_tri_chu_ky: String,
    #[serde(rename = "NgayKy", default)]
    ngay_ky: String,
    #[serde(rename = "NguoiKy", default)]
    nguoi_ky: String,
    #[serde(rename = "ChucDanh", default)]
    chuc_danh: String,
    #[serde(rename = "SoChungThu", default)]
    so_chung_thu: String,
}

/// Adapter for the MISA invoice format
pub struct MisaAdapter;

impl ProviderAdapter for MisaAdapter {
    fn can_parse(&self, content: &[u8]) -> bool {
        contains_bytes(content, b"<MST>")
            || contains_bytes(content, b"<TenHang>")
            || contains_bytes(content, b"MISA")
            || contains_bytes(content, b"misa")
    }

    fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice> {
        let text = std::str::from_utf8(content)
            .map_err(|e| ProcessorError::parse(Provider::MISA, "content", e.to_string()))?;
        let inv: MisaInvoice = quick_xml::de::from_str(text)
            .map_err(|e| ProcessorError::parse(Provider::MISA, "xml", e.to_string()))?;
        Ok(convert_invoice(&inv, content))
    }

    fn provider(&self) -> Provider {
        Provider::MISA
    }
}

fn convert_invoice(inv: &MisaInvoice, raw_xml: &[u8]) -> Invoice {
    let mut result = Invoice::new(Provider::MISA, raw_xml.to_vec());
    result.number = inv.invoice_data.invoice_number.clone();
    result.series = inv.invoice_data.invoice_series.clone();
    result.date = parse_date(&inv.invoice_data.invoice_date);
    result.invoice_type = parse_invoice_type(&inv.invoice_data.invoice_type);
    result.currency = inv.invoice_data.currency_code.clone();
    result.exchange_rate = parse_decimal(&inv.invoice_data.exchange_rate);
    result.payment_terms = inv.invoice_data.payment_terms.clone();
    result.remarks = inv.invoice_data.description.clone();
    result.seller = convert_party(&inv.seller_info);
    result.buyer = convert_party(&inv.buyer_info);
    result.items = inv.invoice_detail.items.iter().map(convert_item).collect();
    result.subtotal_amount = parse_decimal(&inv.total_section.tong_tien_hang);
    result.tax_amount = parse_decimal(&inv.total_section.tong_tien_thue);
    result.total_amount = parse_decimal(&inv.total_section.tong_thanh_toan);
    result.signature = inv.signature_info.as_ref().map(convert_signature);
    result
}

fn convert_party(p: &MisaParty) -> Party {
    Party {
        name: p.company_name.clone(),
        tax_id: p.mst.clone(),
        address: p.address.clone(),
        phone: p.phone.clone(),
        email: p.email.clone(),
        bank_account: p.bank_account.clone(),
        bank_name: p.bank_name.clone(),
    }
}

fn convert_item(item: &MisaItem) -> LineItem {
    LineItem {
        number: item.stt,
        code: item.ma_hang.clone(),
        name: item.ten_hang.clone(),
        description: item.mo_ta.clone(),
        unit: item.dvt.clone(),
        quantity: parse_decimal(&item.so_luong),
        unit_price: parse_decimal(&item.don_gia),
        discount: parse_decimal(&item.chiet_khau),
        discount_amount: parse_decimal(&item.tien_ck),
        amount: parse_decimal(&item.thanh_tien),
        vat_rate: parse_vat_rate(&item.thue_suat),
        vat_amount: parse_decimal(&item.tien_thue),
        total: parse_decimal(&item.tong_cong),
    }
}

fn convert_signature(sig: &MisaSignature) -> EmbeddedSignature {
    EmbeddedSignature {
        value: sig.gia_tri_chu_ky.clone(),
        date: parse_date(&sig.ngay_ky),
        signer_name: sig.nguoi_ky.clone(),
        signer_position: sig.chuc_danh.clone(),
        cert_serial: sig.so_chung_thu.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const SAMPLE: &str = r#"<Invoice>
        <InvoiceData>
            <InvoiceNumber>0000005</InvoiceNumber>
            <InvoiceSeries>MI24</InvoiceSeries>
            <InvoiceDate>10/02/2026</InvoiceDate>
            <CurrencyCode>VND</CurrencyCode>
        </InvoiceData>
        <SellerInfo><CompanyName>MISA Seller</CompanyName><MST>0500500500</MST></SellerInfo>
        <BuyerInfo><CompanyName>Buyer Ltd</CompanyName><MST>0600600600</MST></BuyerInfo>
        <InvoiceDetail>
            <Item>
                <STT>1</STT>
                <TenHang>Giay in</TenHang>
                <DVT>Thung</DVT>
                <SoLuong>10</SoLuong>
                <DonGia>55000</DonGia>
                <ThueSuat>5</ThueSuat>
                <TongCong>577500</TongCong>
            </Item>
        </InvoiceDetail>
        <TotalSection>
            <TongTienHang>550000</TongTienHang>
            <TongTienThue>27500</TongTienThue>
            <TongThanhToan>577500</TongThanhToan>
        </TotalSection>
    </Invoice>"#;

    #[test]
    fn test_parse_misa_invoice() {
        let inv = MisaAdapter.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(inv.number, "0000005");
        assert_eq!(inv.series, "MI24");
        assert_eq!(inv.seller.tax_id, "0500500500");
        assert_eq!(inv.items.len(), 1);
        assert_eq!(inv.items[0].name, "Giay in");
        assert_eq!(inv.items[0].vat_rate.0, 5);
        assert_eq!(inv.total_amount, Decimal::new(577_500, 0));
        assert_eq!(inv.raw_xml, SAMPLE.as_bytes());
    }

    #[test]
    fn test_day_first_date() {
        let inv = MisaAdapter.parse(SAMPLE.as_bytes()).unwrap();
        use chrono::Datelike;
        let date = inv.date.unwrap();
        assert_eq!(date.day(), 10);
        assert_eq!(date.month(), 2);
        assert_eq!(date.year(), 2026);
    }

    #[test]
    fn test_sniff() {
        assert!(MisaAdapter.can_parse(SAMPLE.as_bytes()));
        assert!(MisaAdapter.can_parse(b"<X><TenHang>a</TenHang></X>"));
        assert!(!MisaAdapter.can_parse(b"<Invoice><TaxID>1</TaxID></Invoice>"));
    }
}
