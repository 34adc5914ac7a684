//! Orchestration loop.
//!
//! A run moves through `Init → Reasoning → Executing → Evaluating` and back to
//! `Reasoning` until the plan is exhausted, the oracle reports completion, a
//! failure ends it, or the iteration cap is hit. Only a successful run touches
//! the shared document, and it does so once, at commit.

mod cancel;
mod config;
mod oracle;
mod run;
mod summary;


pub use cancel::CancelToken;
pub use config::OrchestratorConfig;
pub use oracle::{NoOracle, OracleError, OracleReply, OracleRequest, ReasoningOracle};
pub use run::Orchestrator;
pub use summary::{RunFailure, RunStatus, RunSummary};
