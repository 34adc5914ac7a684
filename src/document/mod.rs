//! Schema-agnostic document model.
//!
//! A [`Document`] is parsed from XML Spreadsheet style markup. Sheets, their
//! columns and roles are discovered from the markup itself: the first row of
//! a table names its columns, and the role of a sheet (fields, choices,
//! settings) is inferred from those names.
//!
//! Every byte that is not part of a recognized table is kept verbatim, and so
//! is every row and cell that has not been edited, so that
//! `serialize(parse(x)) == x` for an unmodified document.
//!
//! # Example
//!
//! ```
//! use formwright::document::parse;
//!
//! let markup = r#"<Workbook xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
//!  <Worksheet ss:Name="survey">
//!   <Table>
//!    <Row><Cell><Data ss:Type="String">type</Data></Cell><Cell><Data ss:Type="String">name</Data></Cell></Row>
//!    <Row><Cell><Data ss:Type="String">text</Data></Cell><Cell><Data ss:Type="String">q1</Data></Cell></Row>
//!   </Table>
//!  </Worksheet>
//! </Workbook>"#;
//!
//! let doc = parse(markup)?;
//! assert_eq!(doc.sheet("survey").unwrap().text(0, 1), "q1");
//! assert_eq!(doc.to_markup(), markup);
//! # Ok::<(), formwright::Error>(())
//! ```

// Submodule declarations
mod cell;
mod highlight;
mod model;
mod parser;
mod row;
pub mod schema;
mod shared;
mod sheet;
mod summary;
mod tree;
mod writer;

// Re-exports
pub use cell::{Cell, CellValue};
pub use highlight::{ADDED_STYLE, MODIFIED_STYLE};
pub(crate) use highlight::highlight_changes;
pub use model::Document;
pub use parser::{load_document, parse};
pub use row::Row;
pub use schema::SheetRole;
pub use shared::SharedDocument;
pub use sheet::Sheet;
pub use summary::{DocumentSummary, SheetSummary};
pub use tree::Span;
pub use writer::serialize;

/// Describe `doc` with at most `key_limit` keys per sheet.
#[inline]
pub fn describe(doc: &Document, key_limit: usize) -> DocumentSummary {
    doc.describe(key_limit)
}
