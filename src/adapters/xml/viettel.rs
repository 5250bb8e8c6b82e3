//! Viettel S-Invoice adapter (`<HDon>` root, Vietnamese abbreviated tags).
//!
//! Two layouts exist in the wild: the legacy flat layout with `TTChung`,
//! `NBan`, `NMua` etc. directly under the root, and the newer layout that
//! wraps the payload in `DLHDon`/`NDHDon`. The nested wrapper is probed
//! first; both then map identically.

use serde::Deserialize;

use super::fields::{parse_date, parse_decimal, parse_invoice_type, parse_vat_rate};
use super::{contains_bytes, ProviderAdapter};
use crate::domain::invoice::{EmbeddedSignature, Invoice, LineItem, Party, Provider};
use crate::infra::error::{ProcessorError, ProcessorResult};

#[derive(Debug, Default, Deserialize)]
struct ViettelInvoice {
    /// Newer layout: `<HDon><DLHDon>...</DLHDon></HDon>`
    #[serde(rename = "DLHDon", default)]
    data_layer: Option<ViettelDataLayer>,

    // Legacy flat layout
    #[serde(rename = "TTChung", default)]
    invoice_info: ViettelInvoiceInfo,
    #[serde(rename = "NBan", default)]
    seller: ViettelParty,
    #[serde(rename = "NMua", default)]
    buyer: ViettelParty,
    #[serde(rename = "DSHHDVu", default)]
    products: ViettelProducts,
    #[serde(rename = "TToan", default)]
    summary: ViettelSummary,
    #[serde(rename = "DSCKS", default)]
    signature_block: Option<ViettelSignBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelDataLayer {
    #[serde(rename = "TTChung", default)]
    invoice_info: ViettelInvoiceInfo,
    #[serde(rename = "NDHDon", default)]
    content: Option<ViettelContent>,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelContent {
    #[serde(rename = "NBan", default)]
    seller: ViettelParty,
    #[serde(rename = "NMua", default)]
    buyer: ViettelParty,
    #[serde(rename = "DSHHDVu", default)]
    products: ViettelProducts,
    #[serde(rename = "TToan", default)]
    summary: ViettelSummary,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelInvoiceInfo {
    /// Invoice series
    #[serde(rename = "KHMSHDon", default)]
    khmshdon: String,
    /// Invoice number
    #[serde(rename = "SHDon", default)]
    shdon: String,
    /// Issue date
    #[serde(rename = "NLap", default)]
    nlap: String,
    /// Invoice type
    #[serde(rename = "LHDon", default)]
    lhdon: String,
    /// Currency
    #[serde(rename = "DVTTe", default)]
    dvtte: String,
    /// Exchange rate
    #[serde(rename = "TGia", default)]
    tgia: String,
    /// Notes
    #[serde(rename = "GChu", default)]
    gchu: String,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelParty {
    #[serde(rename = "MST", default)]
    mst: String,
    #[serde(rename = "Ten", default)]
    ten: String,
    #[serde(rename = "DChi", default)]
    dchi: String,
    #[serde(rename = "SDThoai", default)]
    sdthoai: String,
    #[serde(rename = "DCTDTu", default)]
    dctdtu: String,
    #[serde(rename = "STKNHang", default)]
    stknhang: String,
    #[serde(rename = "TNHang", default)]
    tnhang: String,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelProducts {
    #[serde(rename = "HHDVu", default)]
    items: Vec<ViettelItem>,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelItem {
    #[serde(rename = "STT", default)]
    stt: i32,
    #[serde(rename = "MHHDVu", default)]
    mhhdvu: String,
    #[serde(rename = "THHDVu", default)]
    thhdvu: String,
    #[serde(rename = "DVTinh", default)]
    dvtinh: String,
    #[serde(rename = "SLuong", default)]
    sluong: String,
    #[serde(rename = "DGia", default)]
    dgia: String,
    #[serde(rename = "TLCKhau", default)]
    tlckhau: String,
    #[serde(rename = "STCKhau", default)]
    stckhau: String,
    #[serde(rename = "ThTien", default)]
    thtien: String,
    #[serde(rename = "TSuat", default)]
    tsuat: String,
    #[serde(rename = "TThue", default)]
    tthue: String,
    #[serde(rename = "TgTToan", default)]
    tgttoan: String,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelSummary {
    /// Total before tax
    #[serde(rename = "TgTCThue", default)]
    tgtcthue: String,
    /// Total VAT
    #[serde(rename = "TgTThue", default)]
    tgtthue: String,
    /// Total payment
    #[serde(rename = "TgTTTBSo", default)]
    tgtttbso: String,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelSignBlock {
    #[serde(rename = "CKS", default)]
    signatures: Vec<ViettelSignature>,
}

#[derive(Debug, Default, Deserialize)]
struct ViettelSignature {
    #[serde(rename = "GTCKy", default)]
    gtcky: String,
    #[serde(rename = "NKy", default)]
    nky: String,
    #[serde(rename = "TNguoiKy", default)]
    tnguoiky: String,
    #[serde(rename = "CDanhKy", default)]
    cdanhky: String,
    #[serde(rename = "SHCThu", default)]
    shcthu: String,
}

/// Adapter for the Viettel S-Invoice format
pub struct ViettelAdapter;

impl ProviderAdapter for ViettelAdapter {
    fn can_parse(&self, content: &[u8]) -> bool {
        contains_bytes(content, b"<HDon>")
            || contains_bytes(content, b"<KHMSHDon>")
            || contains_bytes(content, b"viettel")
            || contains_bytes(content, b"sinvoice")
    }

    fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice> {
        let text = std::str::from_utf8(content)
            .map_err(|e| ProcessorError::parse(Provider::Viettel, "content", e.to_string()))?;
        let inv: ViettelInvoice = quick_xml::de::from_str(text)
            .map_err(|e| ProcessorError::parse(Provider::Viettel, "xml", e.to_string()))?;
        Ok(convert_invoice(&inv, content))
    }

    fn provider(&self) -> Provider {
        Provider::Viettel
    }
}

fn convert_invoice(inv: &ViettelInvoice, raw_xml: &[u8]) -> Invoice {
    // Nested wrapper first, then the flat layout
    let (info, seller, buyer, products, summary) = match &inv.data_layer {
        Some(layer) => {
            let content = layer.content.as_ref();
            (
                &layer.invoice_info,
                content.map_or(&inv.seller, |c| &c.seller),
                content.map_or(&inv.buyer, |c| &c.buyer),
                content.map_or(&inv.products, |c| &c.products),
                content.map_or(&inv.summary, |c| &c.summary),
            )
        }
        None => (
            &inv.invoice_info,
            &inv.seller,
            &inv.buyer,
            &inv.products,
            &inv.summary,
        ),
    };

    let mut result = Invoice::new(Provider::Viettel, raw_xml.to_vec());
    result.number = info.shdon.clone();
    result.series = info.khmshdon.clone();
    result.date = parse_date(&info.nlap);
    result.invoice_type = parse_invoice_type(&info.lhdon);
    result.currency = info.dvtte.clone();
    result.exchange_rate = parse_decimal(&info.tgia);
    result.remarks = info.gchu.clone();
    result.seller = convert_party(seller);
    result.buyer = convert_party(buyer);
    result.items = products.items.iter().map(convert_item).collect();
    result.subtotal_amount = parse_decimal(&summary.tgtcthue);
    result.tax_amount = parse_decimal(&summary.tgtthue);
    result.total_amount = parse_decimal(&summary.tgtttbso);

    if let Some(block) = &inv.signature_block {
        result.signature = block.signatures.first().map(convert_signature);
    }
    result
}

fn convert_party(p: &ViettelParty) -> Party {
    Party {
        name: p.ten.clone(),
        tax_id: p.mst.clone(),
        address: p.dchi.clone(),
        phone: p.sdthoai.clone(),
        email: p.dctdtu.clone(),
        bank_account: p.stknhang.clone(),
        bank_name: p.tnhang.clone(),
    }
}

fn convert_item(item: &ViettelItem) -> LineItem {
    LineItem {
        number: item.stt,
        code: item.mhhdvu.clone(),
        name: item.thhdvu.clone(),
        description: String::new(),
        unit: item.dvtinh.clone(),
        quantity: parse_decimal(&item.sluong),
        unit_price: parse_decimal(&item.dgia),
        discount: parse_decimal(&item.tlckhau),
        discount_amount: parse_decimal(&item.stckhau),
        amount: parse_decimal(&item.thtien),
        vat_rate: parse_vat_rate(&item.tsuat),
        vat_amount: parse_decimal(&item.tthue),
        total: parse_decimal(&item.tgttoan),
    }
}

fn convert_signature(sig: &ViettelSignature) -> EmbeddedSignature {
    EmbeddedSignature {
        value: sig.gtcky.clone(),
        date: parse_date(&sig.nky),
        signer_name: sig.tnguoiky.clone(),
        signer_position: sig.cdanhky.clone(),
        cert_serial: sig.shcthu.clone(),
    }
}
