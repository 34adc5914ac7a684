use std::fmt;

use serde::Serialize;

use crate::common::error::{Error, ErrorKind, Result};
use crate::common::id::{DocumentId, RunId};
use crate::session::{EditHistory, OperationLog, SessionStatus};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step succeeded and the document was committed
    Succeeded,
    /// A fatal error, or a recoverable one past its retry budget
    Failed,
    /// The iteration cap was reached
    Aborted,
    Cancelled,
    /// The run never started, e.g. another session held the document
    Rejected,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Aborted => "aborted",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Rejected => "rejected",
        })
    }
}

/// The error that ended a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for RunFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Everything the caller learns about a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub document_id: DocumentId,
    pub status: RunStatus,
    /// `None` when no session was opened
    pub session_status: Option<SessionStatus>,
    pub attempts: OperationLog,
    pub history: EditHistory,
    /// Operations applied to the working copy
    pub applied: usize,
    /// Reasoning steps taken, never more than the iteration cap
    pub iterations: usize,
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub oracle_notes: Vec<String>,
}

impl RunSummary {
    /// A run turned away before it opened a session.
    pub(crate) fn rejected(run_id: RunId, document_id: DocumentId, err: &Error) -> Self {
        Self {
            run_id,
            document_id,
            status: RunStatus::Rejected,
            session_status: None,
            attempts: OperationLog::new(),
            history: EditHistory::default(),
            applied: 0,
            iterations: 0,
            narrative: format!("Run rejected: {}", err),
            failure: Some(RunFailure::from(err)),
            oracle_notes: Vec::new(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to render run summary: {}", e)))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} {} after {} iteration(s), {} operation(s) applied",
            self.run_id, self.status, self.iterations, self.applied
        )?;
        if let Some(failure) = &self.failure {
            write!(f, ": {}", failure.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_summary() {
        let document_id = DocumentId::new_random();
        let summary = RunSummary::rejected(
            RunId::new_random(),
            document_id,
            &Error::SessionBusy(document_id),
        );
        assert_eq!(summary.status, RunStatus::Rejected);
        assert_eq!(summary.session_status, None);
        assert_eq!(summary.failure.as_ref().unwrap().kind, ErrorKind::SessionBusy);
        assert!(!summary.is_success());

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["failure"]["kind"], "session_busy");
        assert!(json["session_status"].is_null());
        assert!(json.get("oracle_notes").is_none());
    }
}
