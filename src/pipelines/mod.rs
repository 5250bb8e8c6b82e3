//! Workflow pipelines orchestrating stateless services.

pub mod process;
pub mod verify;

pub use process::{ProcessedInvoice, ProcessingPipeline};
pub use verify::VerifyWorkflow;
