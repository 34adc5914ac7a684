//! Unified error types for formwright.
//!
//! This module provides the single error type surfaced by document loading,
//! edit sessions and orchestration runs, together with its severity taxonomy.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, ErrorKind, Result, Severity};
