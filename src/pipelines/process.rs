//! Extraction pipeline: bytes → format detection → adapter dispatch →
//! unified invoice.
//!
//! PDF and image inputs are routed to external collaborators (OCR/LLM
//! extraction) and are rejected here.

use crate::adapters::xml::{AdapterRegistry, ProviderAdapter};
use crate::domain::format::{detect_format, DocumentFormat};
use crate::domain::invoice::{Invoice, Provider};
use crate::infra::error::{ProcessorError, ProcessorResult};

/// Parsed invoice with the detection context that produced it
#[derive(Debug, Clone)]
pub struct ProcessedInvoice {
    pub invoice: Invoice,
    pub format: DocumentFormat,
    pub provider: Provider,
}

/// Top-level extraction pipeline
pub struct ProcessingPipeline {
    adapters: AdapterRegistry,
}

impl ProcessingPipeline {
    #[must_use]
    pub fn new() -> Self {
        ProcessingPipeline {
            adapters: AdapterRegistry::new(),
        }
    }

    /// Detect the input format and parse XML into the unified model
    pub fn process(&self, data: &[u8]) -> ProcessorResult<ProcessedInvoice> {
        let format = detect_format(data);
        match format {
            DocumentFormat::Xml => {
                let invoice = self.adapters.parse(data)?;
                let provider = invoice.provider;
                Ok(ProcessedInvoice {
                    invoice,
                    format,
                    provider,
                })
            }
            DocumentFormat::Pdf | DocumentFormat::Image => Err(ProcessorError::UnsupportedFormat(
                format!("{format} extraction requires the OCR/LLM pipeline"),
            )),
            DocumentFormat::Unknown => {
                Err(ProcessorError::UnsupportedFormat("unknown".to_string()))
            }
        }
    }

    /// Identify the provider without a full parse
    pub fn detect_provider(&self, data: &[u8]) -> ProcessorResult<Provider> {
        Ok(self.adapters.detect(data)?.provider())
    }

    /// Register a custom adapter, overriding built-ins
    pub fn register_adapter(&mut self, adapter: Box<dyn ProviderAdapter>) {
        self.adapters.register(adapter);
    }

    #[must_use]
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }
}

impl Default for ProcessingPipeline {
    fn default() -> Self {
        Self::new()
    }
}
