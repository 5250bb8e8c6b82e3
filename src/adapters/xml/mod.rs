//! Provider-specific XML parsing adapters.
//!
//! Each adapter maps one vendor schema into the unified [`Invoice`] model
//! and advertises a cheap content sniff. The registry dispatches a buffer
//! to the first matching adapter; ordering is significant because the TCT
//! adapter is the most generic fallback.

pub mod fields;
pub mod fpt;
pub mod misa;
pub mod tct;
pub mod viettel;
pub mod vnpt;

use crate::domain::invoice::{Invoice, Provider};
use crate::infra::error::{ProcessorError, ProcessorResult};

pub use fpt::FptAdapter;
pub use misa::MisaAdapter;
pub use tct::TctAdapter;
pub use viettel::ViettelAdapter;
pub use vnpt::VnptAdapter;

/// Byte-substring sniff used by the adapter `can_parse` predicates
pub(crate) fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// A parser for one provider's XML schema
pub trait ProviderAdapter: Send + Sync {
    /// Cheap content sniff, no full parse
    fn can_parse(&self, content: &[u8]) -> bool;

    /// Parse the content into the unified invoice model.
    /// The returned invoice retains `content` byte-for-byte in `raw_xml`.
    fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice>;

    fn provider(&self) -> Provider;
}

/// Ordered adapter dispatch, most specific first
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Registry with all built-in adapters.
    ///
    /// Order matters: VNPT, Viettel and FPT have unique roots, MISA matches
    /// Vietnamese field names, and TCT is the generic fallback probed last.
    #[must_use]
    pub fn new() -> Self {
        AdapterRegistry {
            adapters: vec![
                Box::new(VnptAdapter),
                Box::new(ViettelAdapter),
                Box::new(FptAdapter),
                Box::new(MisaAdapter),
                Box::new(TctAdapter),
            ],
        }
    }

    /// Identify the adapter for the given content
    pub fn detect(&self, content: &[u8]) -> ProcessorResult<&dyn ProviderAdapter> {
        self.adapters
            .iter()
            .map(|a| a.as_ref())
            .find(|a| a.can_parse(content))
            .ok_or_else(|| {
                ProcessorError::parse(
                    Provider::Unknown,
                    "root",
                    "unknown XML format, no matching adapter found",
                )
            })
    }

    /// Detect and parse in one step
    pub fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice> {
        self.detect(content)?.parse(content)
    }

    /// Register a custom adapter. Prepended so it overrides built-ins.
    pub fn register(&mut self, adapter: Box<dyn ProviderAdapter>) {
        self.adapters.insert(0, adapter);
    }

    /// Adapter for a specific provider, if registered
    #[must_use]
    pub fn adapter_for(&self, provider: Provider) -> Option<&dyn ProviderAdapter> {
        self.adapters
            .iter()
            .map(|a| a.as_ref())
            .find(|a| a.provider() == provider)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dispatch_order() {
        let registry = AdapterRegistry::new();

        let vnpt = b"<SInvoice><InvoiceNo>1</InvoiceNo></SInvoice>";
        assert_eq!(registry.detect(vnpt).unwrap().provider(), Provider::VNPT);

        let viettel = b"<HDon><DLHDon></DLHDon></HDon>";
        assert_eq!(registry.detect(viettel).unwrap().provider(), Provider::Viettel);

        let fpt = b"<EInvoice><Header></Header></EInvoice>";
        assert_eq!(registry.detect(fpt).unwrap().provider(), Provider::FPT);

        let misa = b"<Invoice><SellerInfo><MST>0123</MST></SellerInfo></Invoice>";
        assert_eq!(registry.detect(misa).unwrap().provider(), Provider::MISA);

        let tct = b"<Invoice><Seller><TaxID>0123</TaxID></Seller></Invoice>";
        assert_eq!(registry.detect(tct).unwrap().provider(), Provider::TCT);
    }

    #[test]
    fn test_registry_unknown_content() {
        let registry = AdapterRegistry::new();
        let err = match registry.detect(b"<Unrelated/>") {
            Err(e) => e,
            Ok(_) => panic!("expected detect to fail for unrelated content"),
        };
        assert_eq!(err.code(), "PARSE_ERROR");
    }

    #[test]
    fn test_custom_adapter_takes_priority() {
        struct GreedyAdapter;
        impl ProviderAdapter for GreedyAdapter {
            fn can_parse(&self, _content: &[u8]) -> bool {
                true
            }
            fn parse(&self, content: &[u8]) -> ProcessorResult<Invoice> {
                Ok(Invoice::new(Provider::Unknown, content.to_vec()))
            }
            fn provider(&self) -> Provider {
                Provider::Unknown
            }
        }

        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(GreedyAdapter));
        let adapter = registry.detect(b"<SInvoice/>").unwrap();
        assert_eq!(adapter.provider(), Provider::Unknown);
    }

    #[test]
    fn test_adapter_for_provider() {
        let registry = AdapterRegistry::new();
        assert!(registry.adapter_for(Provider::MISA).is_some());
        assert!(registry.adapter_for(Provider::Unknown).is_none());
    }
}
