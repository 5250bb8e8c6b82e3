//! Adapter layer for external formats and systems.
//!
//! Provides adapters for:
//! - the five provider XML schemas (TCT, VNPT, MISA, Viettel, FPT)
//! - OCSP responder HTTP exchanges
//! - the external `pdfsig` tool

pub mod ocsp_http;
pub mod pdfsig;
pub mod xml;
