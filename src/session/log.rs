//! Ordered record of every attempt made in a session.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::error::{Error, ErrorKind};
use crate::mutation::{ApplyReport, ChangeSummary, EditOperation};

/// Where an attempted operation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Pre-approved by the planner
    Plan,
    /// Proposed by the oracle
    Oracle,
    /// A planning failure with no operation attached
    Planner,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Applied {
        rows_affected: usize,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
        change: ChangeSummary,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub sequence: usize,
    pub at: DateTime<Utc>,
    pub origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<EditOperation>,
    pub outcome: AttemptOutcome,
}

impl LogEntry {
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Failed { .. })
    }

    /// One-line rendering for narratives and oracle prompts.
    pub fn describe(&self) -> String {
        let what = self
            .operation
            .as_ref()
            .map_or_else(|| "planning".to_string(), EditOperation::describe);
        match &self.outcome {
            AttemptOutcome::Applied { rows_affected, .. } => {
                format!("#{} {}: ok, {} row(s) affected", self.sequence, what, rows_affected)
            },
            AttemptOutcome::Failed { kind, message } => {
                format!("#{} {}: failed ({}): {}", self.sequence, what, kind, message)
            },
        }
    }
}

/// Attempt counts over a log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditHistory {
    pub total_edits: usize,
    pub successful_edits: usize,
    pub failed_edits: usize,
}

/// Attempts in the order they were made.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, origin: Origin, operation: Option<EditOperation>, outcome: AttemptOutcome) {
        self.entries.push(LogEntry {
            sequence: self.entries.len() + 1,
            at: Utc::now(),
            origin,
            operation,
            outcome,
        });
    }

    pub(crate) fn record_applied(&mut self, origin: Origin, operation: EditOperation, report: &ApplyReport) {
        self.push(
            origin,
            Some(operation),
            AttemptOutcome::Applied {
                rows_affected: report.rows_affected,
                warnings: report.warnings.clone(),
                change: report.change.clone(),
            },
        );
    }

    pub(crate) fn record_failed(
        &mut self,
        origin: Origin,
        operation: Option<EditOperation>,
        error: &Error,
    ) {
        self.push(
            origin,
            operation,
            AttemptOutcome::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        );
    }

    #[inline]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Number of operations that were applied.
    pub fn applied(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_failure()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.is_failure())
    }

    pub fn history(&self) -> EditHistory {
        let successful_edits = self.applied();
        EditHistory {
            total_edits: self.entries.len(),
            successful_edits,
            failed_edits: self.entries.len() - successful_edits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{MutationError, OperationKind};

    fn report() -> ApplyReport {
        ApplyReport {
            kind: OperationKind::AddRow,
            rows_affected: 1,
            warnings: Vec::new(),
            change: ChangeSummary::default(),
        }
    }

    #[test]
    fn test_sequence_and_counts() {
        let mut log = OperationLog::new();
        let op = EditOperation::Other {
            description: "noop".into(),
        };
        log.record_applied(Origin::Plan, op.clone(), &report());
        log.record_failed(
            Origin::Oracle,
            Some(op),
            &Error::Mutation(MutationError::UnknownSheet("x".into())),
        );
        log.record_failed(
            Origin::Planner,
            None,
            &Error::AmbiguousTarget {
                subject: "field".into(),
                candidates: vec!["a".into(), "b".into()],
            },
        );

        assert_eq!(log.len(), 3);
        assert_eq!(log.applied(), 1);
        assert_eq!(log.failures().count(), 2);
        let sequences: Vec<usize> = log.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert!(log.last().unwrap().describe().starts_with("#3 planning: failed"));
        assert_eq!(
            log.history(),
            EditHistory {
                total_edits: 3,
                successful_edits: 1,
                failed_edits: 2,
            }
        );
    }

    #[test]
    fn test_serializes_as_list() {
        let mut log = OperationLog::new();
        log.record_failed(
            Origin::Oracle,
            None,
            &Error::OracleUnavailable("down".into()),
        );
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["origin"], "oracle");
        assert_eq!(json[0]["outcome"]["status"], "failed");
        assert_eq!(json[0]["outcome"]["kind"], "oracle_unavailable");
        assert!(json[0].get("operation").is_none());
    }
}
