//! Sheets: a header row, data rows and the markup needed to re-emit them.

use smallvec::SmallVec;

use super::row::{Gap, Row};
use super::schema::{self, SheetRole};
use super::tree::Span;

/// Tag and attribute names learned from the source markup, plus the
/// indentation used when rows and cells have to be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dialect {
    pub row_tag: String,
    pub cell_tag: String,
    /// Element holding a cell's value; `None` when cells carry text directly
    pub data_tag: Option<String>,
    pub type_attr: String,
    pub index_attr: String,
    pub style_attr: String,
    pub row_indent: String,
    pub cell_indent: String,
    pub row_inner_tail: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            row_tag: "Row".to_string(),
            cell_tag: "Cell".to_string(),
            data_tag: Some("Data".to_string()),
            type_attr: "ss:Type".to_string(),
            index_attr: "ss:Index".to_string(),
            style_attr: "ss:StyleID".to_string(),
            row_indent: String::new(),
            cell_indent: String::new(),
            row_inner_tail: String::new(),
        }
    }
}

/// Row count attribute of the table start tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowCount {
    /// The attribute value, without quotes
    pub value: Span,
    pub original: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TableLayout {
    pub span: Span,
    pub open: Span,
    pub close: Span,
    /// Markup between the last row and the end tag
    pub tail: SmallVec<[Gap; 2]>,
    pub row_count: Option<RowCount>,
    /// Header plus data rows at parse time
    pub original_rows: usize,
}

/// A named table of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub(crate) name: String,
    pub(crate) columns: Vec<String>,
    pub(crate) role: SheetRole,
    pub(crate) header: Row,
    pub(crate) rows: Vec<Row>,
    pub(crate) layout: TableLayout,
    pub(crate) dialect: Dialect,
    pub(crate) dirty: bool,
}

impl Sheet {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column registry: header names, then `col_<n>` for unnamed positions.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn role(&self) -> SheetRole {
        self.role
    }

    #[inline]
    pub fn header(&self) -> &Row {
        &self.header
    }

    /// Data rows, header excluded.
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Resolve a column by exact name, then by normalized name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| schema::find_column(&self.columns, name))
    }

    /// Column holding the row key for this sheet's role.
    #[inline]
    pub fn key_column(&self) -> Option<usize> {
        schema::key_column(self.role, &self.columns)
    }

    /// Text of `column` in data row `row`.
    #[inline]
    pub fn text(&self, row: usize, column: usize) -> &str {
        self.rows.get(row).map_or("", |r| r.text(column))
    }

    /// Distinct non-empty values of a column, in first-seen order.
    pub fn distinct_values(&self, column: usize) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            let text = row.text(column).trim();
            if !text.is_empty() && !out.contains(&text) {
                out.push(text);
            }
        }
        out
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    pub(crate) fn insert_row(&mut self, index: usize, row: Row) {
        let index = index.min(self.rows.len());
        self.rows.insert(index, row);
        self.dirty = true;
    }

    #[inline]
    pub(crate) fn push_row(&mut self, row: Row) {
        self.insert_row(self.rows.len(), row);
    }

    /// Remove every data row matching `predicate`, returning how many went.
    ///
    /// Non-blank markup in front of a removed row (comments, processing
    /// instructions) moves to the next surviving row, or to the table tail.
    pub(crate) fn remove_rows(&mut self, mut predicate: impl FnMut(&Row) -> bool) -> usize {
        let before = self.rows.len();
        let mut carried: SmallVec<[Gap; 2]> = SmallVec::new();
        let mut kept = Vec::with_capacity(before);
        for mut row in std::mem::take(&mut self.rows) {
            if predicate(&row) {
                carried.extend(row.leading.into_iter().filter(|g| !g.blank));
                continue;
            }
            if !carried.is_empty() {
                carried.extend(row.leading.drain(..));
                row.leading = carried.drain(..).collect();
            }
            kept.push(row);
        }
        if !carried.is_empty() {
            carried.extend(self.layout.tail.drain(..));
            self.layout.tail = carried;
        }
        self.rows = kept;
        let removed = before - self.rows.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
