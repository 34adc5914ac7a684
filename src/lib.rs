//! Formwright - Schema-agnostic editing of XML spreadsheet form definitions
//!
//! This library edits form definitions stored as XML Spreadsheet 2003 markup
//! (a `Workbook` of named `Worksheet`s, as used by XLSForm) from free-text
//! instructions, without touching any byte it was not asked to change.
//!
//! # Features
//!
//! - **Document model**: Sheets, rows and typed cells discovered at load time,
//!   with no fixed template
//! - **Round-trip fidelity**: Unmodified regions are written back byte for byte
//! - **Typed edit operations**: Atomic row, cell, choice-list, rename and
//!   field-removal edits, with optional highlighting of what changed
//! - **Rule-based planner**: Common requests are planned without an oracle
//! - **Bounded loop**: Retries, an iteration cap, cancellation and
//!   all-or-nothing commit for each run
//!
//! # Example - Applying an operation directly
//!
//! ```
//! use formwright::{EditOperation, RowPredicate, load_document, mutation};
//!
//! # fn main() -> Result<(), formwright::Error> {
//! let bytes = br#"<Workbook xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
//!  <Worksheet ss:Name="survey">
//!   <Table>
//!    <Row><Cell><Data ss:Type="String">type</Data></Cell><Cell><Data ss:Type="String">name</Data></Cell></Row>
//!    <Row><Cell><Data ss:Type="String">text</Data></Cell><Cell><Data ss:Type="String">age</Data></Cell></Row>
//!   </Table>
//!  </Worksheet>
//! </Workbook>"#;
//! let doc = load_document(bytes)?;
//!
//! let op = EditOperation::DeleteRows {
//!     sheet: "survey".to_string(),
//!     predicate: RowPredicate::equals("name", "age"),
//! };
//! let applied = mutation::apply(&doc, &op)?;
//! assert_eq!(applied.report.rows_affected, 1);
//! assert!(applied.document.sheet("survey").unwrap().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Running an instruction
//!
//! ```no_run
//! use formwright::{NoOracle, Orchestrator, SharedDocument, load_document};
//!
//! # async fn run() -> Result<(), formwright::Error> {
//! let bytes = std::fs::read("form.xml").map_err(|e| formwright::Error::Config(e.to_string()))?;
//! let shared = SharedDocument::new(load_document(&bytes)?);
//!
//! let summary = Orchestrator::new(NoOracle)
//!     .run_edit(&shared, "Add choices red, green and blue to list colors", None)
//!     .await;
//! println!("{}", summary);
//! std::fs::write("form.xml", shared.to_markup()).ok();
//! # Ok(())
//! # }
//! ```

/// Common types shared by every module: errors, identifiers and XML text helpers
pub mod common;

/// Parsing, describing and serializing form documents
pub mod document;

/// Typed edit operations and the engine that applies them
pub mod mutation;

/// Turning instructions into planned operations
pub mod planner;

/// Edit sessions, their leases and operation logs
pub mod session;

/// The run loop, its configuration and the oracle boundary
pub mod orchestrator;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use common::{DocumentId, Error, ErrorKind, Result, RunId, Severity};
pub use document::{Document, DocumentSummary, SharedDocument, describe, load_document, parse, serialize};
pub use mutation::{ChoiceEntry, ColumnValue, EditOperation, EditOptions, RowPredicate, RowSelector};
pub use orchestrator::{
    CancelToken, NoOracle, OracleReply, OracleRequest, Orchestrator, OrchestratorConfig,
    ReasoningOracle, RunStatus, RunSummary,
};
pub use planner::{PlanOutcome, TaskPlanner};
