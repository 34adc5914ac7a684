//! Mutation engine.
//!
//! Turns typed [`EditOperation`]s into document changes. Every apply works on
//! a copy: either the whole operation lands in the returned [`Applied`]
//! document or the caller's document is left exactly as it was.
//!
//! # Example
//!
//! ```
//! use formwright::document::parse;
//! use formwright::mutation::{ChoiceEntry, EditOperation, apply};
//!
//! let markup = r#"<Workbook xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
//!  <Worksheet ss:Name="choices">
//!   <Table>
//!    <Row><Cell><Data ss:Type="String">list_name</Data></Cell><Cell><Data ss:Type="String">name</Data></Cell><Cell><Data ss:Type="String">label</Data></Cell></Row>
//!   </Table>
//!  </Worksheet>
//! </Workbook>"#;
//! let doc = parse(markup)?;
//! let op = EditOperation::AddChoiceEntries {
//!     list_name: "colors".to_string(),
//!     entries: vec![ChoiceEntry::new("red"), ChoiceEntry::new("blue")],
//!     sheet: None,
//! };
//! let applied = apply(&doc, &op)?;
//! assert_eq!(applied.report.rows_affected, 2);
//! assert_eq!(applied.document.sheet("choices").unwrap().len(), 2);
//! # Ok::<(), formwright::Error>(())
//! ```

// Submodule declarations
mod engine;
mod error;
mod operation;
mod options;
mod references;

// Re-exports
pub use engine::{Applied, ApplyReport, ChangeSummary, apply, apply_with};
pub use error::MutationError;
pub use operation::{
    ChoiceEntry, ColumnValue, EditOperation, OperationKind, RowPredicate, RowSelector,
};
pub use options::EditOptions;
