//! Rows of a sheet.

use smallvec::SmallVec;

use super::cell::{Cell, CellValue};
use super::tree::Span;

/// Markup between two siblings, with whether it is whitespace only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Gap {
    pub span: Span,
    pub blank: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RowOrigin {
    /// The whole row element
    pub span: Span,
    pub open: Span,
    /// `None` when the row was an empty element
    pub close: Option<Span>,
    /// Markup between the last cell and the end tag
    pub inner_tail: Span,
    /// Value of the row index attribute, 1-based
    pub index: Option<usize>,
}

/// One row of a sheet, cells ordered by column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(crate) cells: Vec<Cell>,
    pub(crate) origin: Option<RowOrigin>,
    /// Markup emitted before the row
    pub(crate) leading: SmallVec<[Gap; 1]>,
    /// Style written on a generated row
    pub(crate) style: Option<String>,
    pub(crate) dirty: bool,
}

static EMPTY: CellValue = CellValue::Empty;

impl Row {
    /// A row that did not exist in the source markup.
    pub(crate) fn generated(values: impl IntoIterator<Item = (usize, CellValue)>) -> Self {
        let mut cells: Vec<Cell> = values
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(column, value)| Cell::generated(column, value))
            .collect();
        cells.sort_by_key(|c| c.column);
        cells.dedup_by_key(|c| c.column);
        Self {
            cells,
            origin: None,
            leading: SmallVec::new(),
            style: None,
            dirty: true,
        }
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&column, |c| c.column)
            .ok()
            .map(|i| &self.cells[i])
    }

    #[inline]
    pub fn value(&self, column: usize) -> &CellValue {
        self.cell(column).map_or(&EMPTY, |c| &c.value)
    }

    /// Cell text at `column`, empty when there is no cell.
    #[inline]
    pub fn text(&self, column: usize) -> &str {
        self.cell(column).map_or("", |c| c.text.as_str())
    }

    /// Number of column positions spanned by the row.
    pub fn width(&self) -> usize {
        self.cells.last().map_or(0, |c| c.column + c.width())
    }

    #[inline]
    pub fn is_generated(&self) -> bool {
        self.origin.is_none()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Explicit 1-based position carried by the row markup.
    #[inline]
    pub fn explicit_index(&self) -> Option<usize> {
        self.origin.as_ref().and_then(|o| o.index)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.text.trim().is_empty())
    }

    /// Set the value at `column`, returning whether anything changed.
    pub(crate) fn set(&mut self, column: usize, value: CellValue) -> bool {
        let changed = match self.cells.binary_search_by_key(&column, |c| c.column) {
            Ok(i) => self.cells[i].set(value),
            Err(_) if value.is_empty() => false,
            Err(i) => {
                self.cells.insert(i, Cell::generated(column, value));
                true
            },
        };
        self.dirty |= changed;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_row_skips_empty() {
        let row = Row::generated([
            (2, CellValue::Text("c".into())),
            (0, CellValue::Text("a".into())),
            (1, CellValue::Empty),
        ]);
        assert_eq!(row.cells().len(), 2);
        assert_eq!(row.text(0), "a");
        assert_eq!(row.text(1), "");
        assert_eq!(row.text(2), "c");
        assert_eq!(row.width(), 3);
        assert!(row.is_generated());
    }

    #[test]
    fn test_set_inserts_in_order() {
        let mut row = Row::generated([(0, CellValue::Text("a".into()))]);
        row.dirty = false;
        assert!(!row.set(3, CellValue::Empty));
        assert!(!row.is_dirty());
        assert!(row.set(3, CellValue::Text("d".into())));
        assert!(row.set(1, CellValue::Bool(true)));
        let columns: Vec<_> = row.cells().iter().map(|c| c.column()).collect();
        assert_eq!(columns, vec![0, 1, 3]);
        assert!(row.is_dirty());
    }
}
