//! The transactional scope of one run.

use serde::Serialize;
use tracing::{debug, info};

use crate::common::error::{Error, Result};
use crate::common::id::{DocumentId, RunId};
use crate::document::{Document, SharedDocument};
use crate::mutation::{ApplyReport, EditOperation, EditOptions, MutationError, apply_with};

use super::lease::SessionLease;
use super::log::{OperationLog, Origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Committed,
    RolledBack,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionStatus::Open => "open",
            SessionStatus::Committed => "committed",
            SessionStatus::RolledBack => "rolled_back",
        })
    }
}

/// What is left of a closed session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    /// The working copy on commit, the base document on rollback
    pub document: Document,
    pub log: OperationLog,
}

/// Working copy, base snapshot and attempt log of one edit run.
///
/// Operations only ever touch the working copy. The shared document changes
/// once, on [`commit`](Self::commit); dropping or rolling back the session
/// leaves it as it was.
#[derive(Debug)]
pub struct EditSession {
    id: RunId,
    instruction: String,
    scope: Option<String>,
    base: Document,
    working: Document,
    log: OperationLog,
    options: EditOptions,
    lease: SessionLease,
}

impl EditSession {
    /// Open a session over `base`, holding `lease` until it closes.
    pub fn open(
        lease: SessionLease,
        base: Document,
        instruction: impl Into<String>,
        scope: Option<String>,
        options: EditOptions,
    ) -> Self {
        let id = RunId::new_random();
        debug!(session = %id, document = %lease.document_id(), scope = scope.as_deref().unwrap_or("-"), "opened edit session");
        Self {
            id,
            instruction: instruction.into(),
            scope,
            working: base.clone(),
            base,
            log: OperationLog::new(),
            options,
            lease,
        }
    }

    #[inline]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[inline]
    pub fn document_id(&self) -> DocumentId {
        self.lease.document_id()
    }

    #[inline]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    #[inline]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    #[inline]
    pub fn working(&self) -> &Document {
        &self.working
    }

    #[inline]
    pub fn base(&self) -> &Document {
        &self.base
    }

    #[inline]
    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    fn check_scope(&self, op: &EditOperation) -> std::result::Result<(), MutationError> {
        if let Some(scope) = &self.scope
            && op.is_row_level()
            && let Some(sheet) = op.sheet()
            && sheet != scope
        {
            return Err(MutationError::OutOfScope {
                sheet: sheet.to_string(),
                scope: scope.clone(),
            });
        }
        Ok(())
    }

    /// Apply `op` to the working copy and log the attempt either way.
    pub fn apply(&mut self, origin: Origin, op: EditOperation) -> Result<ApplyReport> {
        let result = self
            .check_scope(&op)
            .and_then(|_| apply_with(&self.working, &op, &self.options));
        match result {
            Ok(applied) => {
                self.working = applied.document;
                self.log.record_applied(origin, op, &applied.report);
                Ok(applied.report)
            },
            Err(err) => {
                let err = Error::from(err);
                self.log.record_failed(origin, Some(op), &err);
                Err(err)
            },
        }
    }

    /// Log a failure that happened outside the engine.
    pub fn record_failure(&mut self, origin: Origin, operation: Option<EditOperation>, error: &Error) {
        self.log.record_failed(origin, operation, error);
    }

    /// Publish the working copy to `shared` and close the session.
    pub fn commit(self, shared: &SharedDocument) -> Result<SessionOutcome> {
        shared.replace(&self.lease, self.working.clone())?;
        info!(session = %self.id, document = %shared.id(), applied = self.log.applied(), "committed edit session");
        Ok(SessionOutcome {
            status: SessionStatus::Committed,
            document: self.working,
            log: self.log,
        })
    }

    /// Discard the working copy and close the session.
    pub fn roll_back(self) -> SessionOutcome {
        info!(session = %self.id, document = %self.lease.document_id(), attempts = self.log.len(), "rolled back edit session");
        SessionOutcome {
            status: SessionStatus::RolledBack,
            document: self.base,
            log: self.log,
        }
    }
}
