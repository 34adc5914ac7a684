//! Unified error types for formwright.
//!
//! Every failure a run can observe is expressed as a variant of [`Error`]. The
//! orchestration loop decides between retrying, giving up and aborting by
//! looking at [`Error::severity`] alone.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::id::DocumentId;
use crate::mutation::MutationError;

/// Main error type for formwright operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The markup is not well-formed or could not be decoded
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// An edit operation was rejected by the mutation engine
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// The instruction matches more than one sheet or field equally well
    #[error("Ambiguous {subject}: candidates are {}", .candidates.join(", "))]
    AmbiguousTarget {
        subject: String,
        candidates: Vec<String>,
    },

    /// The oracle did not answer within the configured timeout
    #[error("Oracle did not answer within {0:?}")]
    OracleTimeout(Duration),

    /// The oracle could not be reached
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The oracle gave up without a prior operation failure to report
    #[error("Oracle cannot proceed: {0}")]
    CannotProceed(String),

    /// The loop reached its iteration cap
    #[error("Maximum number of iterations ({0}) exceeded")]
    MaxIterationsExceeded(usize),

    /// Another edit session is open against the same document
    #[error("Document {0} already has an open edit session")]
    SessionBusy(DocumentId),

    /// The run was cancelled by the caller
    #[error("Run cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A summary or report could not be rendered
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// How the orchestration loop reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Logged and fed back to the reasoning step, subject to the retry budget
    Recoverable,
    /// Terminates the run immediately
    Fatal,
    /// Terminates the run with the distinct aborted status
    LoopFatal,
}

/// Stable, serializable name of an error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedDocument,
    UnknownSheet,
    RowNotFound,
    FieldNotFound,
    DuplicateChoiceKey,
    ColumnNotFound,
    InvalidOperation,
    OutOfScope,
    UnresolvedReferences,
    Invariant,
    AmbiguousTarget,
    OracleTimeout,
    OracleUnavailable,
    CannotProceed,
    MaxIterationsExceeded,
    SessionBusy,
    Cancelled,
    Config,
    Serialization,
}

impl Error {
    /// Classify the error for the orchestration loop.
    pub fn severity(&self) -> Severity {
        match self {
            Error::MalformedDocument(_) => Severity::Fatal,
            Error::Mutation(err) if err.is_fatal() => Severity::Fatal,
            Error::Mutation(_) => Severity::Recoverable,
            Error::AmbiguousTarget { .. }
            | Error::OracleTimeout(_)
            | Error::OracleUnavailable(_) => Severity::Recoverable,
            Error::MaxIterationsExceeded(_) => Severity::LoopFatal,
            Error::CannotProceed(_)
            | Error::SessionBusy(_)
            | Error::Cancelled
            | Error::Config(_)
            | Error::Serialization(_) => Severity::Fatal,
        }
    }

    /// Variant name used in run summaries and log entries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedDocument(_) => ErrorKind::MalformedDocument,
            Error::Mutation(err) => err.kind(),
            Error::AmbiguousTarget { .. } => ErrorKind::AmbiguousTarget,
            Error::OracleTimeout(_) => ErrorKind::OracleTimeout,
            Error::OracleUnavailable(_) => ErrorKind::OracleUnavailable,
            Error::CannotProceed(_) => ErrorKind::CannotProceed,
            Error::MaxIterationsExceeded(_) => ErrorKind::MaxIterationsExceeded,
            Error::SessionBusy(_) => ErrorKind::SessionBusy,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config(_) => ErrorKind::Config,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }

    #[inline]
    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Recoverable
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::MalformedDocument => "malformed_document",
            ErrorKind::UnknownSheet => "unknown_sheet",
            ErrorKind::RowNotFound => "row_not_found",
            ErrorKind::FieldNotFound => "field_not_found",
            ErrorKind::DuplicateChoiceKey => "duplicate_choice_key",
            ErrorKind::ColumnNotFound => "column_not_found",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::OutOfScope => "out_of_scope",
            ErrorKind::UnresolvedReferences => "unresolved_references",
            ErrorKind::Invariant => "invariant",
            ErrorKind::AmbiguousTarget => "ambiguous_target",
            ErrorKind::OracleTimeout => "oracle_timeout",
            ErrorKind::OracleUnavailable => "oracle_unavailable",
            ErrorKind::CannotProceed => "cannot_proceed",
            ErrorKind::MaxIterationsExceeded => "max_iterations_exceeded",
            ErrorKind::SessionBusy => "session_busy",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
            ErrorKind::Serialization => "serialization",
        };
        f.write_str(name)
    }
}

/// Result type for formwright operations.
pub type Result<T> = std::result::Result<T, Error>;
