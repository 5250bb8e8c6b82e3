//! Infrastructure layer for cross-cutting concerns.
//!
//! Error handling and result types, plus configuration file management.

pub mod config;
pub mod error;
