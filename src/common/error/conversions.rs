//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from library and
//! boundary error types to the unified Error type.

use super::types::Error;

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::MalformedDocument(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::MalformedDocument(format!("invalid UTF-8: {}", err))
    }
}

impl From<crate::orchestrator::OracleError> for Error {
    fn from(err: crate::orchestrator::OracleError) -> Self {
        match err {
            crate::orchestrator::OracleError::Unavailable(reason) => {
                Error::OracleUnavailable(reason)
            },
            crate::orchestrator::OracleError::Malformed(reason) => Error::CannotProceed(reason),
        }
    }
}
