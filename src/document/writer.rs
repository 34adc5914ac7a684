//! Document to markup.
//!
//! Clean sheets are copied from the source. In a dirty sheet only the table
//! start tag (row count), dirty rows and, inside them, dirty or shifted cells
//! are written anew; every other byte comes from the source. A changed cell
//! that exists in the source keeps its markup and has only its value spliced.
//!
//! Highlight style definitions, when a document uses them, go into the
//! scaffolding at the anchor found by the parser.

use crate::common::xml::escape_xml;

use super::cell::{Cell, CellOrigin, ValueSlot};
use super::model::{Document, Segment};
use super::row::Row;
use super::sheet::{Dialect, Sheet};
use super::tree::Span;

/// Serialize a document back to markup.
pub fn serialize(doc: &Document) -> String {
    let source = doc.source();
    let mut out = String::with_capacity(source.len() + 256);
    let mut styles = doc.styles.as_ref().filter(|_| doc.highlights.any());
    for segment in &doc.segments {
        match *segment {
            Segment::Verbatim(span) => match styles {
                Some(anchor) if span.start <= anchor.at && anchor.at < span.end => {
                    out.push_str(&source[span.start..anchor.at]);
                    anchor.write(&mut out, doc.highlights);
                    out.push_str(&source[anchor.at..span.end]);
                    styles = None;
                },
                _ => out.push_str(span.slice(source)),
            },
            Segment::Sheet(index) => write_sheet(&mut out, source, &doc.sheets[index]),
        }
    }
    out
}

fn write_sheet(out: &mut String, source: &str, sheet: &Sheet) {
    let layout = &sheet.layout;
    if !sheet.dirty {
        out.push_str(layout.span.slice(source));
        return;
    }

    write_table_open(out, source, sheet);
    write_row(out, source, &sheet.dialect, &sheet.header);
    for row in &sheet.rows {
        write_row(out, source, &sheet.dialect, row);
    }
    for gap in &layout.tail {
        out.push_str(gap.span.slice(source));
    }
    out.push_str(layout.close.slice(source));
}

fn write_table_open(out: &mut String, source: &str, sheet: &Sheet) {
    let layout = &sheet.layout;
    let open = layout.open.slice(source);
    let Some(count) = layout.row_count else {
        out.push_str(open);
        return;
    };

    let current = sheet.rows.len() + 1;
    let shifted = (count.original + current).saturating_sub(layout.original_rows);
    let adjusted = shifted.max(last_row_position(sheet));

    let value_start = count.value.start - layout.open.start;
    let value_end = count.value.end - layout.open.start;
    let mut buffer = itoa::Buffer::new();
    out.push_str(&open[..value_start]);
    out.push_str(buffer.format(adjusted));
    out.push_str(&open[value_end..]);
}

/// 1-based position of the last row, honouring explicit row indices.
fn last_row_position(sheet: &Sheet) -> usize {
    std::iter::once(&sheet.header)
        .chain(sheet.rows.iter())
        .fold(0, |pos, row| match row.explicit_index() {
            Some(index) if index > pos => index,
            _ => pos + 1,
        })
}

fn write_row(out: &mut String, source: &str, dialect: &Dialect, row: &Row) {
    for gap in &row.leading {
        out.push_str(gap.span.slice(source));
    }

    let Some(origin) = row.origin.as_ref() else {
        out.push_str(&dialect.row_indent);
        out.push('<');
        out.push_str(&dialect.row_tag);
        if let Some(style) = &row.style {
            push_style(out, dialect, style);
        }
        out.push('>');
        write_cells(out, source, dialect, &row.cells);
        out.push_str(&dialect.row_inner_tail);
        out.push_str("</");
        out.push_str(&dialect.row_tag);
        out.push('>');
        return;
    };

    if !row.dirty {
        out.push_str(origin.span.slice(source));
        return;
    }

    match origin.close {
        Some(close) => {
            out.push_str(origin.open.slice(source));
            write_cells(out, source, dialect, &row.cells);
            out.push_str(origin.inner_tail.slice(source));
            out.push_str(close.slice(source));
        },
        None => {
            // `<Row/>` that gained cells
            let open = origin.open.slice(source);
            let head = open.strip_suffix("/>").unwrap_or(open).trim_end();
            out.push_str(head);
            out.push('>');
            write_cells(out, source, dialect, &row.cells);
            out.push_str(&dialect.row_inner_tail);
            out.push_str("</");
            out.push_str(&dialect.row_tag);
            out.push('>');
        },
    }
}

fn write_cells(out: &mut String, source: &str, dialect: &Dialect, cells: &[Cell]) {
    let mut next = 0;
    for cell in cells {
        let leading = cell
            .origin
            .as_ref()
            .map_or(dialect.cell_indent.as_str(), |o| o.leading.slice(source));

        match cell.origin.as_ref() {
            Some(origin) if !cell.dirty => {
                out.push_str(leading);
                let markup = origin.span.slice(source);
                if origin.explicit_index || cell.column == next {
                    out.push_str(markup);
                } else {
                    write_with_index(out, dialect, markup, cell.column);
                }
            },
            Some(origin) if !cell.value.is_empty() || origin.extras || cell.style.is_some() => {
                out.push_str(leading);
                let with_index = !origin.explicit_index && cell.column != next;
                write_spliced(out, source, dialect, cell, origin, with_index);
            },
            _ => {
                if cell.value.is_empty() && cell.style.is_none() {
                    continue;
                }
                out.push_str(leading);
                write_cell(out, dialect, cell, cell.column != next);
            },
        }
        next = cell.column + cell.width();
    }
}

/// Re-emit an untouched cell with an index attribute after its tag name.
fn write_with_index(out: &mut String, dialect: &Dialect, markup: &str, column: usize) {
    let name_end = markup
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_whitespace() || *c == '>' || *c == '/')
        .map_or(markup.len(), |(i, _)| i);
    out.push_str(&markup[..name_end]);
    push_index(out, dialect, column);
    out.push_str(&markup[name_end..]);
}

fn push_index(out: &mut String, dialect: &Dialect, column: usize) {
    let mut buffer = itoa::Buffer::new();
    out.push(' ');
    out.push_str(&dialect.index_attr);
    out.push_str("=\"");
    out.push_str(buffer.format(column + 1));
    out.push('"');
}

fn push_style(out: &mut String, dialect: &Dialect, style: &str) {
    out.push(' ');
    out.push_str(&dialect.style_attr);
    out.push_str("=\"");
    out.push_str(&escape_xml(style));
    out.push('"');
}

/// Value element (or bare text) of a cell.
fn push_value(out: &mut String, dialect: &Dialect, cell: &Cell, text: &str) {
    match &dialect.data_tag {
        Some(tag) => {
            out.push('<');
            out.push_str(tag);
            out.push(' ');
            out.push_str(&dialect.type_attr);
            out.push_str("=\"");
            out.push_str(cell.value.data_type());
            out.push_str("\">");
            out.push_str(text);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        },
        None => out.push_str(text),
    }
}

fn write_cell(out: &mut String, dialect: &Dialect, cell: &Cell, with_index: bool) {
    out.push('<');
    out.push_str(&dialect.cell_tag);
    if with_index {
        push_index(out, dialect, cell.column);
    }
    if let Some(style) = &cell.style {
        push_style(out, dialect, style);
    }
    if cell.value.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    push_value(out, dialect, cell, &escape_xml(&cell.text));
    out.push_str("</");
    out.push_str(&dialect.cell_tag);
    out.push('>');
}

/// Re-emit a changed cell from its source markup.
///
/// Only the value text, the type attribute, the style attribute and a
/// needed index attribute change; formulas, links, comments and any other
/// attribute or child are copied.
fn write_spliced(
    out: &mut String,
    source: &str,
    dialect: &Dialect,
    cell: &Cell,
    origin: &CellOrigin,
    with_index: bool,
) {
    let mut edits: Vec<(Span, String)> = Vec::with_capacity(4);
    let after_name = Span::new(origin.name_end, origin.name_end);
    if with_index {
        let mut attr = String::new();
        push_index(&mut attr, dialect, cell.column);
        edits.push((after_name, attr));
    }
    if let Some(style) = cell.style.as_deref() {
        let escaped = escape_xml(style);
        match origin.style_value {
            Some(span) if span.slice(source) == escaped => {},
            Some(span) => edits.push((span, escaped)),
            None => {
                let mut attr = String::new();
                push_style(&mut attr, dialect, style);
                edits.push((after_name, attr));
            },
        }
    }
    if let (false, Some(span)) = (cell.value.is_empty(), origin.type_value) {
        edits.push((span, cell.value.data_type().to_string()));
    }

    let text = escape_xml(&cell.text);
    match &origin.slot {
        ValueSlot::Text(span) => edits.push((*span, text)),
        _ if cell.value.is_empty() => {},
        ValueSlot::Empty { tail, tag } => edits.push((*tail, format!(">{text}</{tag}>"))),
        ValueSlot::Insert { at, close_cell } => {
            let mut value = String::new();
            if *close_cell {
                value.push('>');
            }
            push_value(&mut value, dialect, cell, &text);
            if *close_cell {
                value.push_str("</");
                value.push_str(&dialect.cell_tag);
                value.push('>');
            }
            edits.push((*at, value));
        },
    }

    // Stable: an index attribute stays ahead of a style attribute at the same spot
    edits.sort_by_key(|(span, _)| span.start);
    let mut cursor = origin.span.start;
    for (span, replacement) in edits {
        out.push_str(&source[cursor..span.start]);
        out.push_str(&replacement);
        cursor = span.end;
    }
    out.push_str(&source[cursor..origin.span.end]);
}
