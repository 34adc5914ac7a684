//! Task planner.
//!
//! Turns a free-text instruction and a [`DocumentSummary`] into an ordered list
//! of [`EditOperation`]s when the request is simple enough to plan without the
//! oracle. Strategies are tried in order; the first that does not defer wins.
//!
//! # Example
//!
//! ```
//! use formwright::document::parse;
//! use formwright::planner::{PlanOutcome, TaskPlanner};
//!
//! let markup = r#"<Workbook xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
//!  <Worksheet ss:Name="choices">
//!   <Table>
//!    <Row><Cell><Data ss:Type="String">list_name</Data></Cell><Cell><Data ss:Type="String">name</Data></Cell><Cell><Data ss:Type="String">label</Data></Cell></Row>
//!   </Table>
//!  </Worksheet>
//! </Workbook>"#;
//! let summary = parse(markup)?.describe(50);
//!
//! let planner = TaskPlanner::new();
//! match planner.plan("Add choices A, B, C to list MYLIST", &summary, None) {
//!     PlanOutcome::Plan(ops) => assert_eq!(ops.len(), 1),
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! # Ok::<(), formwright::Error>(())
//! ```

mod rules;
mod target;

pub use rules::RuleBasedStrategy;

use tracing::debug;

use crate::document::DocumentSummary;
use crate::mutation::EditOperation;

/// What a strategy makes of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// Pre-approved operations, applied in order
    Plan(Vec<EditOperation>),
    /// The instruction fits more than one target equally well
    Ambiguous {
        subject: String,
        candidates: Vec<String>,
    },
    /// Leave the instruction to the oracle
    Defer,
}

/// Everything a strategy gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub instruction: &'a str,
    pub summary: &'a DocumentSummary,
    /// Sheet the caller scoped the run to
    pub target_sheet: Option<&'a str>,
}

/// A way of planning instructions.
pub trait PlanningStrategy {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Plan `request`, or return [`PlanOutcome::Defer`].
    fn plan(&self, request: &PlanRequest<'_>) -> PlanOutcome;
}

/// Ordered list of planning strategies.
pub struct TaskPlanner {
    strategies: Vec<Box<dyn PlanningStrategy + Send + Sync>>,
}

impl Default for TaskPlanner {
    fn default() -> Self {
        Self {
            strategies: vec![Box::new(RuleBasedStrategy)],
        }
    }
}

impl std::fmt::Debug for TaskPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("TaskPlanner").field("strategies", &names).finish()
    }
}

impl TaskPlanner {
    /// A planner with the rule-based strategy.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// A planner that always defers.
    #[inline]
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy, tried after the existing ones.
    pub fn with_strategy(mut self, strategy: impl PlanningStrategy + Send + Sync + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn plan(
        &self,
        instruction: &str,
        summary: &DocumentSummary,
        target_sheet: Option<&str>,
    ) -> PlanOutcome {
        let request = PlanRequest {
            instruction,
            summary,
            target_sheet,
        };
        for strategy in &self.strategies {
            match strategy.plan(&request) {
                PlanOutcome::Defer => continue,
                PlanOutcome::Plan(ops) if ops.is_empty() => continue,
                outcome => {
                    debug!(strategy = strategy.name(), outcome = ?outcome, "planned instruction");
                    return outcome;
                },
            }
        }
        debug!("instruction deferred to oracle");
        PlanOutcome::Defer
    }
}
