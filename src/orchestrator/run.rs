//! The act/observe loop.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info, warn};

use crate::common::error::{Error, Severity};
use crate::common::id::RunId;
use crate::document::SharedDocument;
use crate::mutation::{EditOperation, OperationKind};
use crate::planner::{PlanOutcome, TaskPlanner};
use crate::session::{EditSession, Origin, SessionStatus};

use super::cancel::CancelToken;
use super::config::OrchestratorConfig;
use super::oracle::{OracleReply, OracleRequest, ReasoningOracle};
use super::summary::{RunFailure, RunStatus, RunSummary};

/// Loop states, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Reasoning,
    Executing,
    Evaluating,
    Terminated,
    Aborted,
}

/// Failures are budgeted per kind of attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AttemptKind {
    Operation(OperationKind),
    Planning,
    Oracle,
}

/// How the loop ended.
enum End {
    Succeeded,
    Failed(Error),
    Aborted(Error),
    Cancelled,
}

/// What to do after a failed attempt.
enum Verdict {
    Retry,
    Stop(End),
}

/// Per-run bookkeeping.
struct Run {
    id: RunId,
    iterations: usize,
    failures: HashMap<AttemptKind, usize>,
    plan: VecDeque<EditOperation>,
    following_plan: bool,
    /// Latest failure, cleared by a successful apply
    last_error: Option<Error>,
    narrative: Vec<String>,
    notes: Vec<String>,
}

impl Run {
    fn transition(&self, state: State) {
        debug!(run = %self.id, iteration = self.iterations, state = ?state, "loop transition");
    }
}

/// Drives edit runs against shared documents.
///
/// # Example
///
/// ```
/// use formwright::document::{SharedDocument, parse};
/// use formwright::orchestrator::{NoOracle, Orchestrator, RunStatus};
///
/// # tokio_test_block(async {
/// let markup = r#"<Workbook xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
///  <Worksheet ss:Name="choices">
///   <Table>
///    <Row><Cell><Data ss:Type="String">list_name</Data></Cell><Cell><Data ss:Type="String">name</Data></Cell><Cell><Data ss:Type="String">label</Data></Cell></Row>
///   </Table>
///  </Worksheet>
/// </Workbook>"#;
/// let shared = SharedDocument::new(parse(markup).unwrap());
/// let orchestrator = Orchestrator::new(NoOracle);
///
/// let summary = orchestrator
///     .run_edit(&shared, "Add choices A, B, C to list MYLIST", None)
///     .await;
/// assert_eq!(summary.status, RunStatus::Succeeded);
/// assert_eq!(shared.snapshot().sheet("choices").unwrap().len(), 3);
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread()
/// #         .enable_all()
/// #         .build()
/// #         .unwrap()
/// #         .block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct Orchestrator<O> {
    oracle: O,
    planner: TaskPlanner,
    config: OrchestratorConfig,
}

impl<O: ReasoningOracle> Orchestrator<O> {
    /// An orchestrator with the rule-based planner and default limits.
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            planner: TaskPlanner::new(),
            config: OrchestratorConfig::default(),
        }
    }

    #[inline]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn with_planner(mut self, planner: TaskPlanner) -> Self {
        self.planner = planner;
        self
    }

    #[inline]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    #[inline]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Carry out `instruction` on `shared`, optionally scoped to one sheet.
    pub async fn run_edit(
        &self,
        shared: &SharedDocument,
        instruction: &str,
        target_sheet: Option<&str>,
    ) -> RunSummary {
        self.run_edit_with_cancel(shared, instruction, target_sheet, &CancelToken::new())
            .await
    }

    /// [`run_edit`](Self::run_edit), stopping early once `cancel` fires.
    pub async fn run_edit_with_cancel(
        &self,
        shared: &SharedDocument,
        instruction: &str,
        target_sheet: Option<&str>,
        cancel: &CancelToken,
    ) -> RunSummary {
        let run_id = RunId::new_random();
        if let Err(err) = self.config.validate() {
            return RunSummary::rejected(run_id, shared.id(), &err);
        }

        // Init
        let lease = match shared.try_begin_session() {
            Ok(lease) => lease,
            Err(err) => {
                warn!(run = %run_id, document = %shared.id(), "run rejected: {}", err);
                return RunSummary::rejected(run_id, shared.id(), &err);
            },
        };
        info!(run = %run_id, document = %shared.id(), scope = target_sheet.unwrap_or("-"), "starting edit run");
        let mut session = EditSession::open(
            lease,
            shared.snapshot(),
            instruction,
            target_sheet.map(str::to_string),
            self.config.edit,
        );
        let mut run = Run {
            id: run_id,
            iterations: 0,
            failures: HashMap::new(),
            plan: VecDeque::new(),
            following_plan: false,
            last_error: None,
            narrative: Vec::new(),
            notes: Vec::new(),
        };
        run.transition(State::Init);

        let summary = session.working().describe(self.config.summary_key_limit);
        let mut early_end = None;
        match self.planner.plan(instruction, &summary, target_sheet) {
            PlanOutcome::Plan(ops) => {
                run.narrative
                    .push(format!("Planned {} operation(s) from the instruction.", ops.len()));
                run.plan = ops.into();
                run.following_plan = true;
            },
            PlanOutcome::Ambiguous {
                subject,
                candidates,
            } => {
                let err = Error::AmbiguousTarget {
                    subject,
                    candidates,
                };
                session.record_failure(Origin::Planner, None, &err);
                run.narrative.push(format!("{}; asking the oracle.", err));
                if let Verdict::Stop(end) = self.evaluate(&mut run, AttemptKind::Planning, err) {
                    early_end = Some(end);
                }
            },
            PlanOutcome::Defer => {
                run.narrative
                    .push("No deterministic plan; asking the oracle.".to_string());
            },
        }

        let end = match early_end {
            Some(end) => end,
            None => self.drive(&mut run, &mut session, cancel).await,
        };
        self.close(run, session, shared, end)
    }

    /// Reasoning, executing and evaluating until the run ends.
    async fn drive(&self, run: &mut Run, session: &mut EditSession, cancel: &CancelToken) -> End {
        loop {
            run.transition(State::Reasoning);
            if cancel.is_cancelled() {
                return End::Cancelled;
            }

            let planned = if run.following_plan {
                match run.plan.pop_front() {
                    Some(op) => Some(op),
                    None => return End::Succeeded,
                }
            } else {
                None
            };

            if run.iterations >= self.config.max_iterations {
                return End::Aborted(Error::MaxIterationsExceeded(self.config.max_iterations));
            }
            run.iterations += 1;

            let (origin, op) = match planned {
                Some(op) => (Origin::Plan, op),
                None => match self.consult(run, session).await {
                    Ok(OracleReply::Propose {
                        operation,
                        rationale,
                    }) => {
                        run.notes.extend(rationale);
                        (Origin::Oracle, operation)
                    },
                    Ok(OracleReply::Complete { note }) => {
                        run.notes.extend(note);
                        run.narrative.push("The oracle reported the instruction complete.".to_string());
                        return End::Succeeded;
                    },
                    Ok(OracleReply::CannotProceed { reason }) => {
                        run.narrative.push(format!("The oracle gave up: {}", reason));
                        run.notes.push(reason.clone());
                        // Report the failure the oracle could not get past
                        return End::Failed(
                            run.last_error.take().unwrap_or(Error::CannotProceed(reason)),
                        );
                    },
                    Err(err) => {
                        session.record_failure(Origin::Oracle, None, &err);
                        match self.evaluate(run, AttemptKind::Oracle, err) {
                            Verdict::Retry => continue,
                            Verdict::Stop(end) => return end,
                        }
                    },
                },
            };

            run.transition(State::Executing);
            let kind = op.kind();
            let description = op.describe();
            let result = session.apply(origin, op);

            run.transition(State::Evaluating);
            match result {
                Ok(report) => {
                    run.last_error = None;
                    run.narrative.push(format!(
                        "Applied: {} ({} row(s) affected).",
                        description, report.rows_affected
                    ));
                    for warning in report.warnings {
                        run.narrative.push(format!("Warning: {}", warning));
                    }
                },
                Err(err) => {
                    run.narrative.push(format!("Failed: {}: {}", description, err));
                    if origin == Origin::Plan && err.is_recoverable() {
                        run.plan.clear();
                        run.following_plan = false;
                        if !self.config.fallback_to_oracle {
                            return End::Failed(err);
                        }
                        run.narrative
                            .push("Abandoning the plan; asking the oracle.".to_string());
                    }
                    if let Verdict::Stop(end) = self.evaluate(run, AttemptKind::Operation(kind), err) {
                        return end;
                    }
                },
            }
        }
    }

    /// Decide whether a failed attempt may be retried.
    fn evaluate(&self, run: &mut Run, kind: AttemptKind, err: Error) -> Verdict {
        run.last_error = Some(err.clone());
        match err.severity() {
            Severity::Recoverable => {
                let failures = run.failures.entry(kind).or_insert(0);
                *failures += 1;
                if *failures > self.config.max_retries {
                    debug!(run = %run.id, kind = ?kind, failures = *failures, "retry budget spent");
                    Verdict::Stop(End::Failed(err))
                } else {
                    debug!(run = %run.id, kind = ?kind, failures = *failures, "retrying after recoverable failure");
                    Verdict::Retry
                }
            },
            Severity::Fatal => Verdict::Stop(End::Failed(err)),
            Severity::LoopFatal => Verdict::Stop(End::Aborted(err)),
        }
    }

    /// One oracle call under the configured timeout.
    async fn consult(&self, run: &Run, session: &EditSession) -> Result<OracleReply, Error> {
        let request = OracleRequest {
            instruction: session.instruction().to_string(),
            target_sheet: session.scope().map(str::to_string),
            summary: session.working().describe(self.config.summary_key_limit),
            log: session.log().clone(),
            iteration: run.iterations,
        };
        debug!(run = %run.id, iteration = run.iterations, "calling oracle");
        match tokio::time::timeout(self.config.oracle_timeout, self.oracle.propose_next(&request)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => {
                warn!(run = %run.id, "oracle call failed: {}", err);
                Err(Error::from(err))
            },
            Err(_) => {
                warn!(run = %run.id, timeout = ?self.config.oracle_timeout, "oracle call timed out");
                Err(Error::OracleTimeout(self.config.oracle_timeout))
            },
        }
    }

    /// Commit or roll back, and build the summary.
    fn close(&self, mut run: Run, session: EditSession, shared: &SharedDocument, end: End) -> RunSummary {
        let attempts = session.log().clone();
        let (status, session_status, failure) = match end {
            End::Succeeded => match session.commit(shared) {
                Ok(outcome) => (RunStatus::Succeeded, outcome.status, None),
                Err(err) => (RunStatus::Failed, SessionStatus::RolledBack, Some(err)),
            },
            End::Failed(err) => {
                run.transition(State::Terminated);
                (RunStatus::Failed, session.roll_back().status, Some(err))
            },
            End::Aborted(err) => {
                run.transition(State::Aborted);
                (RunStatus::Aborted, session.roll_back().status, Some(err))
            },
            End::Cancelled => (
                RunStatus::Cancelled,
                session.roll_back().status,
                Some(Error::Cancelled),
            ),
        };

        match &failure {
            Some(err) => run.narrative.push(format!("Run {}: {}", status, err)),
            None => run.narrative.push(format!("Run {}.", status)),
        }
        info!(
            run = %run.id,
            status = %status,
            iterations = run.iterations,
            applied = attempts.applied(),
            "finished edit run"
        );

        RunSummary {
            run_id: run.id,
            document_id: shared.id(),
            status,
            session_status: Some(session_status),
            applied: attempts.applied(),
            history: attempts.history(),
            attempts,
            iterations: run.iterations,
            narrative: run.narrative.join("\n"),
            failure: failure.as_ref().map(RunFailure::from),
            oracle_notes: run.notes,
        }
    }
}
