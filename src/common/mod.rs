//! Common types and utilities shared across the crate.
//!
//! This module provides the unified error type, XML text helpers and the
//! random identifiers used for documents and runs.

// Submodule declarations
pub mod error;
pub mod id;
pub mod xml;

// Re-exports for convenience
pub use error::{Error, ErrorKind, Result, Severity};
pub use id::{DocumentId, Guid, RunId};
