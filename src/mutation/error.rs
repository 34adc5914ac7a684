//! Mutation engine errors.

use thiserror::Error;

use crate::common::error::ErrorKind;

/// Why an edit operation was rejected.
///
/// Every variant except [`MutationError::Invariant`] is recoverable: the
/// document is untouched and another operation can be tried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("No row in sheet '{sheet}' matches {selector}")]
    RowNotFound { sheet: String, selector: String },

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Choice list '{list}' already has an entry named '{key}'")]
    DuplicateChoiceKey { list: String, key: String },

    #[error("Column '{column}' not found in sheet '{sheet}'")]
    ColumnNotFound { sheet: String, column: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Sheet '{sheet}' is outside the session scope '{scope}'")]
    OutOfScope { sheet: String, scope: String },

    #[error("Renaming '{field}' left {} unresolved reference(s): {}", .locations.len(), .locations.join(", "))]
    UnresolvedReferences { field: String, locations: Vec<String> },

    /// The edited document no longer round-trips; never recoverable
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl MutationError {
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, MutationError::Invariant(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::UnknownSheet(_) => ErrorKind::UnknownSheet,
            MutationError::RowNotFound { .. } => ErrorKind::RowNotFound,
            MutationError::FieldNotFound(_) => ErrorKind::FieldNotFound,
            MutationError::DuplicateChoiceKey { .. } => ErrorKind::DuplicateChoiceKey,
            MutationError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
            MutationError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            MutationError::OutOfScope { .. } => ErrorKind::OutOfScope,
            MutationError::UnresolvedReferences { .. } => ErrorKind::UnresolvedReferences,
            MutationError::Invariant(_) => ErrorKind::Invariant,
        }
    }
}
