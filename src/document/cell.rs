//! Cell values.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::tree::Span;

/// Scalar value of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Interpret free-form input text.
    ///
    /// `TRUE`/`FALSE` in any case become booleans, empty input clears the
    /// cell, anything else is kept as text.
    pub fn from_input(input: &str) -> Self {
        if input.is_empty() {
            CellValue::Empty
        } else if input.eq_ignore_ascii_case("true") {
            CellValue::Bool(true)
        } else if input.eq_ignore_ascii_case("false") {
            CellValue::Bool(false)
        } else {
            CellValue::Text(input.to_string())
        }
    }

    /// Interpret cell text according to its markup type attribute.
    pub(crate) fn from_markup(data_type: Option<&str>, text: &str) -> Self {
        if text.is_empty() {
            return CellValue::Empty;
        }
        match data_type {
            Some("Number") => match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => CellValue::Number(n),
                _ => CellValue::Text(text.to_string()),
            },
            Some("Boolean") => match text.trim() {
                "1" => CellValue::Bool(true),
                "0" => CellValue::Bool(false),
                _ => CellValue::Text(text.to_string()),
            },
            _ => CellValue::Text(text.to_string()),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Value of the markup type attribute for this value.
    pub fn data_type(&self) -> &'static str {
        match self {
            CellValue::Number(_) => "Number",
            CellValue::Bool(_) => "Boolean",
            CellValue::Empty | CellValue::Text(_) => "String",
        }
    }

    /// Text as it is written between the data tags.
    pub fn markup_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s),
            CellValue::Bool(true) => Cow::Borrowed("1"),
            CellValue::Bool(false) => Cow::Borrowed("0"),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buffer = itoa::Buffer::new();
        buffer.format(n as i64).to_string()
    } else {
        let mut buffer = ryu::Buffer::new();
        buffer.format(n).to_string()
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.markup_text())
    }
}

/// Where a rewritten value goes inside the source markup of a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ValueSlot {
    /// Character content of the value element, or of the cell itself
    Text(Span),
    /// `/>` closing an empty element named `tag`; becomes `>text</tag>`
    Empty { tail: Span, tag: String },
    /// No value element: one replaces `at`, which is an empty span after the
    /// cell start tag, blank cell content, or the cell's own `/>`
    Insert { at: Span, close_cell: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CellOrigin {
    /// The whole cell element
    pub span: Span,
    /// Markup between the previous cell (or the row start tag) and this cell
    pub leading: Span,
    /// The cell carried an explicit index attribute
    pub explicit_index: bool,
    /// Offset just past the cell tag name, where new attributes go
    pub name_end: usize,
    pub slot: ValueSlot,
    /// Value of the type attribute, without quotes
    pub type_value: Option<Span>,
    /// Value of the style attribute, without quotes
    pub style_value: Option<Span>,
    /// Attributes or children other than index, style and the value element
    pub extras: bool,
}

/// One cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub(crate) column: usize,
    /// Additional columns covered by a merged cell
    pub(crate) merge: usize,
    pub(crate) value: CellValue,
    pub(crate) text: String,
    pub(crate) style: Option<String>,
    pub(crate) origin: Option<CellOrigin>,
    pub(crate) dirty: bool,
}

impl Cell {
    pub(crate) fn generated(column: usize, value: CellValue) -> Self {
        let text = value.markup_text().into_owned();
        Self {
            column,
            merge: 0,
            value,
            text,
            style: None,
            origin: None,
            dirty: true,
        }
    }

    /// Zero-based column position.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Number of columns the cell spans, 1 unless merged across.
    #[inline]
    pub fn width(&self) -> usize {
        1 + self.merge
    }

    #[inline]
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    /// Decoded text of the cell as found in (or written to) the markup.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set(&mut self, value: CellValue) -> bool {
        if self.value == value {
            return false;
        }
        self.text = value.markup_text().into_owned();
        self.value = value;
        self.dirty = true;
        true
    }

    pub(crate) fn set_style(&mut self, style: &str) -> bool {
        if self.style.as_deref() == Some(style) {
            return false;
        }
        self.style = Some(style.to_string());
        self.dirty = true;
        true
    }
}
