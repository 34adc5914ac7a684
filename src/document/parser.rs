//! Markup to document.
//!
//! Parsing happens in two passes. The first builds a [`SpanTree`] of the
//! whole input; the second looks for table-shaped elements in it. An element
//! is a table when its children contain uniformly shaped row elements (one
//! row tag, one cell tag shared by every row, a header with at least one
//! value) and the element or its direct parent carries a `Name` attribute.
//! Everything that is not a table stays scaffolding.

use std::collections::HashSet;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::common::error::Result;
use crate::common::id::DocumentId;

use super::cell::{Cell, CellOrigin, CellValue, ValueSlot};
use super::highlight::{Highlights, StyleAnchor};
use super::model::{Document, Segment};
use super::row::{Gap, Row, RowOrigin};
use super::schema;
use super::sheet::{Dialect, RowCount, Sheet, TableLayout};
use super::tree::{Node, Span, SpanTree};

const UTF8_BOM: &str = "\u{feff}";

/// Decode `bytes` as UTF-8 and parse them.
///
/// A UTF-8 byte order mark is kept as scaffolding.
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    let markup = std::str::from_utf8(bytes)?;
    parse(markup)
}

/// Parse markup into a [`Document`].
pub fn parse(markup: &str) -> Result<Document> {
    let source: Arc<str> = Arc::from(markup);
    let offset = if markup.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    };
    let tree = SpanTree::build(&source, offset)?;

    let mut tables = Vec::new();
    let mut seen = HashSet::new();
    find_tables(&tree, &source, tree.root, &mut seen, &mut tables);
    tables.sort_by_key(|t| tree.element(t.element).open.start);

    let mut sheets = Vec::with_capacity(tables.len());
    let mut segments = Vec::with_capacity(tables.len() * 2 + 1);
    let mut cursor = 0;
    for shape in &tables {
        let sheet = build_sheet(&tree, &source, shape);
        let span = sheet.layout.span;
        if span.start > cursor {
            segments.push(Segment::Verbatim(Span::new(cursor, span.start)));
        }
        segments.push(Segment::Sheet(sheets.len()));
        cursor = span.end;
        sheets.push(sheet);
    }
    if cursor < source.len() {
        segments.push(Segment::Verbatim(Span::new(cursor, source.len())));
    }

    debug!(
        sheets = sheets.len(),
        bytes = source.len(),
        "parsed document"
    );

    let styles = StyleAnchor::locate(
        &tree,
        &source,
        tables.first().map(|t| t.element),
        "ss:",
    );

    Ok(Document {
        id: DocumentId::new_random(),
        source,
        segments,
        sheets,
        styles,
        highlights: Highlights::default(),
    })
}

/// A table candidate: its element, name and the row elements inside it.
struct TableShape {
    element: usize,
    name: String,
    rows: Vec<usize>,
    cell_local: String,
}

fn find_tables(
    tree: &SpanTree,
    source: &str,
    idx: usize,
    seen: &mut HashSet<String>,
    out: &mut Vec<TableShape>,
) {
    if let Some(shape) = table_shape(tree, source, idx) {
        // A single "row" that is itself a table means we are one level too high
        let nested = shape.rows.len() == 1 && table_shape(tree, source, shape.rows[0]).is_some();
        if !nested {
            if seen.insert(shape.name.clone()) {
                out.push(shape);
            } else {
                debug!(name = %shape.name, "duplicate sheet name left as scaffolding");
            }
            return;
        }
    }
    let children: Vec<usize> = tree.element_children(idx).collect();
    for child in children {
        find_tables(tree, source, child, seen, out);
    }
}

fn table_shape(tree: &SpanTree, source: &str, idx: usize) -> Option<TableShape> {
    let el = tree.element(idx);
    el.close?;
    let name = el
        .attribute("Name")
        .or_else(|| el.parent.and_then(|p| tree.element(p).attribute("Name")))?
        .value
        .clone();
    if name.trim().is_empty() {
        return None;
    }

    let kids: Vec<usize> = tree.element_children(idx).collect();
    let mut candidates: Vec<&str> = Vec::new();
    for &kid in &kids {
        let local = tree.element(kid).local.as_str();
        if !candidates.contains(&local) {
            candidates.push(local);
        }
    }

    let mut best: Option<(Vec<usize>, String)> = None;
    let mut tie = false;
    for row_local in candidates {
        let rows: Vec<usize> = kids
            .iter()
            .copied()
            .filter(|&k| tree.element(k).local == row_local)
            .collect();
        let Some(cell_local) = uniform_cell_tag(tree, &rows) else {
            continue;
        };
        let data = data_local(tree, &rows, &cell_local);
        let header_has_value = tree
            .element_children(rows[0])
            .any(|c| !cell_text(tree, source, c, data.as_deref()).trim().is_empty());
        if !header_has_value {
            continue;
        }
        match best.as_ref().map(|(b, _)| b.len()) {
            Some(n) if n > rows.len() => {},
            Some(n) if n == rows.len() => tie = true,
            _ => {
                tie = false;
                best = Some((rows, cell_local));
            },
        }
    }
    if tie {
        return None;
    }
    let (rows, cell_local) = best?;
    Some(TableShape {
        element: idx,
        name,
        rows,
        cell_local,
    })
}

/// The one cell tag shared by every row, if the rows are uniform.
fn uniform_cell_tag(tree: &SpanTree, rows: &[usize]) -> Option<String> {
    let mut tag: Option<&str> = None;
    for &row in rows {
        for cell in tree.element_children(row) {
            let local = tree.element(cell).local.as_str();
            match tag {
                None => tag = Some(local),
                Some(t) if t == local => {},
                Some(_) => return None,
            }
        }
    }
    tag.map(str::to_string)
}

/// Local name of the value element, learned from the first cell with children.
fn data_local(tree: &SpanTree, rows: &[usize], cell_local: &str) -> Option<String> {
    rows.iter()
        .flat_map(|&r| tree.element_children(r))
        .filter(|&c| tree.element(c).local == cell_local)
        .find_map(|c| tree.element_children(c).next())
        .map(|d| tree.element(d).local.clone())
}

/// The value element of a cell, if it has one.
fn value_element(tree: &SpanTree, cell: usize, data_local: Option<&str>) -> Option<usize> {
    let data_local = data_local?;
    tree.element_children(cell)
        .find(|&c| tree.element(c).local == data_local)
}

fn cell_text(tree: &SpanTree, source: &str, cell: usize, data_local: Option<&str>) -> String {
    if tree.element_children(cell).next().is_none() {
        return tree.text_content(source, cell);
    }
    value_element(tree, cell, data_local)
        .map(|d| tree.text_content(source, d))
        .unwrap_or_default()
}

fn gap(source: &str, start: usize, end: usize) -> Gap {
    let span = Span::new(start, end.max(start));
    Gap {
        span,
        blank: span.slice(source).trim().is_empty(),
    }
}

fn build_sheet(tree: &SpanTree, source: &str, shape: &TableShape) -> Sheet {
    let table = tree.element(shape.element);
    // `table_shape` only accepts elements with an end tag
    let close = table.close.unwrap_or(table.open);
    let data_local = data_local(tree, &shape.rows, &shape.cell_local);
    let mut dialect = learn_dialect(tree, shape, data_local.as_deref());

    let mut rows = Vec::with_capacity(shape.rows.len());
    let mut cursor = table.open.end;
    for &row_idx in &shape.rows {
        let row_el = tree.element(row_idx);
        let leading = gap(source, cursor, row_el.open.start);
        let mut row = build_row(tree, source, row_idx, shape, data_local.as_deref());
        if !leading.span.is_empty() {
            row.leading.push(leading);
        }
        cursor = row_el.span().end;
        rows.push(row);
    }
    let mut tail = SmallVec::new();
    let tail_gap = gap(source, cursor, close.start);
    if !tail_gap.span.is_empty() {
        tail.push(tail_gap);
    }

    let indent_of = |gaps: &[Gap]| -> Option<String> {
        let last = gaps.last()?;
        last.blank.then(|| last.span.slice(source).to_string())
    };
    if let Some(indent) = rows.last().and_then(|r| indent_of(&r.leading)) {
        dialect.row_indent = indent;
    }

    let mut rows = rows.into_iter();
    let header = rows.next().unwrap_or_else(|| Row::generated([]));
    let rows: Vec<Row> = rows.collect();
    if let Some(origin) = header.origin.as_ref() {
        let tail = origin.inner_tail.slice(source);
        if tail.trim().is_empty() {
            dialect.row_inner_tail = tail.to_string();
        }
    }
    if let Some(leading) = header
        .cells
        .first()
        .and_then(|c| c.origin.as_ref())
        .map(|o| o.leading.slice(source))
        .filter(|s| s.trim().is_empty())
    {
        dialect.cell_indent = leading.to_string();
    }

    let columns = column_registry(&header, &rows);
    let role = schema::classify(&columns);
    let original_rows = rows.len() + 1;

    Sheet {
        name: shape.name.clone(),
        columns,
        role,
        header,
        rows,
        layout: TableLayout {
            span: table.span(),
            open: table.open,
            close,
            tail,
            row_count: row_count_attribute(tree, source, shape.element),
            original_rows,
        },
        dialect,
        dirty: false,
    }
}

fn build_row(
    tree: &SpanTree,
    source: &str,
    row_idx: usize,
    shape: &TableShape,
    data_local: Option<&str>,
) -> Row {
    let row_el = tree.element(row_idx);
    let index = row_el
        .attribute("Index")
        .and_then(|a| a.value.trim().parse::<usize>().ok())
        .filter(|&i| i > 0);

    let mut cells: Vec<Cell> = Vec::new();
    let mut cursor = row_el.open.end;
    let mut next_column = 0;
    for node in &row_el.children {
        let Node::Element(cell_idx) = *node else {
            continue;
        };
        let cell_el = tree.element(cell_idx);
        if cell_el.local != shape.cell_local {
            continue;
        }
        let explicit = cell_el
            .attribute("Index")
            .and_then(|a| a.value.trim().parse::<usize>().ok())
            .filter(|&i| i > 0);
        let column = match explicit {
            Some(i) if i - 1 >= next_column => i - 1,
            _ => next_column,
        };
        let merge = cell_el
            .attribute("MergeAcross")
            .and_then(|a| a.value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        next_column = column + 1 + merge;

        let value_el = value_element(tree, cell_idx, data_local);
        let type_attr = match value_el {
            Some(d) => tree.element(d).attribute("Type").map(|a| (d, a)),
            None => None,
        }
        .or_else(|| cell_el.attribute("Type").map(|a| (cell_idx, a)));
        let data_type = type_attr.map(|(_, a)| a.value.as_str());
        let text = cell_text(tree, source, cell_idx, data_local);

        cells.push(Cell {
            column,
            merge,
            value: CellValue::from_markup(data_type, &text),
            text,
            style: cell_el.attribute("StyleID").map(|a| a.value.clone()),
            origin: Some(CellOrigin {
                span: cell_el.span(),
                leading: Span::new(cursor, cell_el.open.start),
                explicit_index: explicit.is_some(),
                name_end: cell_el.open.start + 1 + cell_el.qname.len(),
                slot: value_slot(tree, source, cell_idx, value_el, data_local.is_some()),
                type_value: type_attr.and_then(|(owner, a)| {
                    attribute_value_span(source, tree.element(owner).open, &a.qname)
                }),
                style_value: cell_el
                    .attribute("StyleID")
                    .and_then(|a| attribute_value_span(source, cell_el.open, &a.qname)),
                extras: has_extras(tree, source, cell_idx, value_el),
            }),
            dirty: false,
        });
        cursor = cell_el.span().end;
    }

    let inner_tail = match row_el.close {
        Some(close) => Span::new(cursor, close.start),
        None => Span::new(row_el.open.end, row_el.open.end),
    };

    Row {
        cells,
        origin: Some(RowOrigin {
            span: row_el.span(),
            open: row_el.open,
            close: row_el.close,
            inner_tail,
            index,
        }),
        leading: SmallVec::new(),
        style: None,
        dirty: false,
    }
}

/// The `/>` ending an empty element's tag.
fn self_closing_tail(open: Span) -> Span {
    Span::new(open.end.saturating_sub(2).max(open.start), open.end)
}

fn value_slot(
    tree: &SpanTree,
    source: &str,
    cell: usize,
    value_el: Option<usize>,
    uses_data: bool,
) -> ValueSlot {
    let cell_el = tree.element(cell);
    if let Some(d) = value_el {
        let data_el = tree.element(d);
        return match data_el.close {
            Some(close) => ValueSlot::Text(Span::new(data_el.open.end, close.start)),
            None => ValueSlot::Empty {
                tail: self_closing_tail(data_el.open),
                tag: data_el.qname.clone(),
            },
        };
    }
    match cell_el.close {
        Some(close) if tree.element_children(cell).next().is_none() => {
            let content = Span::new(cell_el.open.end, close.start);
            if uses_data && content.slice(source).trim().is_empty() {
                ValueSlot::Insert {
                    at: content,
                    close_cell: false,
                }
            } else {
                ValueSlot::Text(content)
            }
        },
        Some(_) => ValueSlot::Insert {
            at: Span::new(cell_el.open.end, cell_el.open.end),
            close_cell: false,
        },
        None => ValueSlot::Insert {
            at: self_closing_tail(cell_el.open),
            close_cell: true,
        },
    }
}

/// Whether the cell holds anything a value rewrite must carry along.
fn has_extras(tree: &SpanTree, source: &str, cell: usize, value_el: Option<usize>) -> bool {
    let cell_el = tree.element(cell);
    let attributes = cell_el
        .attributes
        .iter()
        .any(|a| !matches!(a.local.as_str(), "Index" | "StyleID"));
    attributes
        || cell_el.children.iter().any(|node| match *node {
            Node::Element(child) => Some(child) != value_el,
            Node::Text(span) | Node::CData(span) => {
                value_el.is_some() && !span.slice(source).trim().is_empty()
            },
            Node::Markup(_) => true,
        })
}

/// Span of the value of attribute `qname` inside a start tag, quotes excluded.
pub(crate) fn attribute_value_span(source: &str, open: Span, qname: &str) -> Option<Span> {
    let tag = open.slice(source).as_bytes();
    for key in memchr::memmem::find_iter(tag, qname.as_bytes()) {
        if key == 0 || !tag[key - 1].is_ascii_whitespace() {
            continue;
        }
        let mut at = key + qname.len();
        while at < tag.len() && tag[at].is_ascii_whitespace() {
            at += 1;
        }
        if tag.get(at) != Some(&b'=') {
            continue;
        }
        let quote_at = at + 1 + memchr::memchr2(b'"', b'\'', &tag[at + 1..])?;
        let quote = tag[quote_at];
        let value_start = quote_at + 1;
        let value_end = value_start + memchr::memchr(quote, &tag[value_start..])?;
        return Some(Span::new(open.start + value_start, open.start + value_end));
    }
    None
}

fn learn_dialect(tree: &SpanTree, shape: &TableShape, data_local: Option<&str>) -> Dialect {
    let mut dialect = Dialect::default();
    let table = tree.element(shape.element);
    let name_attr = table
        .attribute("Name")
        .or_else(|| table.parent.and_then(|p| tree.element(p).attribute("Name")));
    let prefix = match name_attr.map(|a| a.qname.split_once(':')) {
        Some(Some((p, _))) => format!("{}:", p),
        Some(None) => String::new(),
        None => "ss:".to_string(),
    };
    dialect.type_attr = format!("{}Type", prefix);
    dialect.index_attr = format!("{}Index", prefix);
    dialect.style_attr = format!("{}StyleID", prefix);

    if let Some(&first_row) = shape.rows.first() {
        dialect.row_tag = tree.element(first_row).qname.clone();
    }
    dialect.data_tag = None;
    for &row in &shape.rows {
        for cell in tree.element_children(row) {
            let cell_el = tree.element(cell);
            dialect.cell_tag.clone_from(&cell_el.qname);
            if let Some(attr) = cell_el.attribute("Index") {
                dialect.index_attr.clone_from(&attr.qname);
            }
            if let Some(attr) = cell_el.attribute("StyleID") {
                dialect.style_attr.clone_from(&attr.qname);
            }
            if dialect.data_tag.is_none()
                && let Some(data) = value_element(tree, cell, data_local)
            {
                let data_el = tree.element(data);
                dialect.data_tag = Some(data_el.qname.clone());
                if let Some(attr) = data_el.attribute("Type") {
                    dialect.type_attr.clone_from(&attr.qname);
                }
            }
        }
    }
    dialect
}

fn column_registry(header: &Row, rows: &[Row]) -> Vec<String> {
    let width = rows
        .iter()
        .map(Row::width)
        .chain(std::iter::once(header.width()))
        .max()
        .unwrap_or(0);
    (0..width)
        .map(|i| {
            let name = header.text(i).trim();
            if name.is_empty() {
                format!("col_{}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn row_count_attribute(tree: &SpanTree, source: &str, table: usize) -> Option<RowCount> {
    let el = tree.element(table);
    let attr = el.attribute("ExpandedRowCount")?;
    let original = attr.value.trim().parse::<usize>().ok()?;
    Some(RowCount {
        value: attribute_value_span(source, el.open, &attr.qname)?,
        original,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::Error;
    use crate::document::SheetRole;
    use crate::test_support::{SAMPLE_FORM, sample_document};

    #[test]
    fn test_discovers_sheets_and_roles() {
        let doc = sample_document();
        let names: Vec<_> = doc.sheet_names().collect();
        assert_eq!(names, vec!["survey", "choices", "settings"]);

        let survey = doc.sheet("survey").unwrap();
        assert_eq!(survey.role(), SheetRole::Fields);
        assert_eq!(
            survey.columns(),
            &["type", "name", "label", "relevant", "required"]
        );
        assert_eq!(survey.len(), 4);

        assert_eq!(doc.sheet("choices").unwrap().role(), SheetRole::Choices);
        assert_eq!(doc.sheet("settings").unwrap().role(), SheetRole::Settings);
    }

    #[test]
    fn test_sparse_and_typed_cells() {
        let doc = sample_document();
        let survey = doc.sheet("survey").unwrap();
        let age = survey.row(0).unwrap();
        assert_eq!(age.text(1), "age");
        assert_eq!(age.text(3), "");
        assert_eq!(age.value(4), &CellValue::Bool(true));

        let reason = survey.row(2).unwrap();
        assert_eq!(reason.text(2), "Why & how?");
        assert_eq!(reason.text(3), "${consent} = 'no' and ${age} > 17");
    }

    #[test]
    fn test_dialect_learned() {
        let doc = sample_document();
        let dialect = &doc.sheet("survey").unwrap().dialect;
        assert_eq!(dialect.row_tag, "Row");
        assert_eq!(dialect.cell_tag, "Cell");
        assert_eq!(dialect.data_tag.as_deref(), Some("Data"));
        assert_eq!(dialect.type_attr, "ss:Type");
        assert_eq!(dialect.index_attr, "ss:Index");
        assert_eq!(dialect.row_indent, "\n   ");
        assert_eq!(dialect.cell_indent, "\n    ");
    }

    #[test]
    fn test_row_count_attribute_located() {
        let doc = sample_document();
        let survey = doc.sheet("survey").unwrap();
        let count = survey.layout.row_count.unwrap();
        assert_eq!(count.original, 5);
        assert_eq!(count.value.slice(doc.source()), "5");
        assert_eq!(survey.layout.original_rows, 5);
    }

    #[test]
    fn test_unmodified_round_trip_is_identical() {
        let doc = parse(SAMPLE_FORM).unwrap();
        assert_eq!(doc.to_markup(), SAMPLE_FORM);
    }

    #[test]
    fn test_bom_kept() {
        let markup = format!("{}{}", UTF8_BOM, SAMPLE_FORM);
        let doc = load_document(markup.as_bytes()).unwrap();
        assert_eq!(doc.sheets().len(), 3);
        assert_eq!(doc.to_bytes(), markup.as_bytes());
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = load_document(b"<a>\xff</a>").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
    }

    #[test]
    fn test_duplicate_sheet_name_is_scaffolding() {
        let markup = r#"<Workbook xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
 <Worksheet ss:Name="a"><Table><Row><Cell><Data ss:Type="String">x</Data></Cell></Row></Table></Worksheet>
 <Worksheet ss:Name="a"><Table><Row><Cell><Data ss:Type="String">y</Data></Cell></Row></Table></Worksheet>
</Workbook>"#;
        let doc = parse(markup).unwrap();
        assert_eq!(doc.sheets().len(), 1);
        assert_eq!(doc.sheets()[0].header().text(0), "x");
        assert_eq!(doc.to_markup(), markup);
    }

    #[test]
    fn test_unrecognized_structure_has_no_sheets() {
        let markup = "<root><item>1</item><other/></root>";
        let doc = parse(markup).unwrap();
        assert!(doc.sheets().is_empty());
        assert_eq!(doc.to_markup(), markup);
    }

    #[test]
    fn test_worksheet_with_only_table() {
        let markup = r#"<Workbook><Worksheet ss:Name="s"><Table><Row><Cell><Data ss:Type="String">h</Data></Cell></Row><Row><Cell><Data ss:Type="String">v</Data></Cell></Row></Table></Worksheet></Workbook>"#;
        let doc = parse(markup).unwrap();
        let sheet = doc.sheet("s").unwrap();
        assert_eq!(sheet.columns(), &["h"]);
        assert_eq!(sheet.text(0, 0), "v");
        assert_eq!(sheet.dialect.row_tag, "Row");
    }

    #[test]
    fn test_plain_dialect_without_data_elements() {
        let markup = r#"<book><sheet Name="people"><row><c>name</c><c>age</c></row><row><c>ana</c><c>31</c></row></sheet></book>"#;
        let doc = parse(markup).unwrap();
        let sheet = doc.sheet("people").unwrap();
        assert_eq!(sheet.columns(), &["name", "age"]);
        assert_eq!(sheet.text(0, 1), "31");
        assert_eq!(sheet.dialect.data_tag, None);
        assert_eq!(sheet.dialect.index_attr, "Index");
    }

    #[test]
    fn test_wide_rows_extend_registry() {
        let markup = r#"<W><Worksheet ss:Name="g"><Table><Row><Cell><Data ss:Type="String">a</Data></Cell></Row><Row><Cell><Data ss:Type="String">1</Data></Cell><Cell ss:Index="3"><Data ss:Type="String">3</Data></Cell></Row></Table></Worksheet></W>"#;
        let doc = parse(markup).unwrap();
        let sheet = doc.sheet("g").unwrap();
        assert_eq!(sheet.columns(), &["a", "col_2", "col_3"]);
        assert_eq!(sheet.text(0, 2), "3");
    }

    #[test]
    fn test_merged_cell_spans_columns() {
        let markup = r#"<W xmlns:ss="urn:s"><Worksheet ss:Name="m"><Table>
<Row><Cell ss:MergeAcross="1"><Data ss:Type="String">a</Data></Cell><Cell><Data ss:Type="String">c</Data></Cell></Row>
<Row><Cell><Data ss:Type="String">1</Data></Cell><Cell ss:Index="3"><Data ss:Type="String">3</Data></Cell></Row>
<Row><Cell ss:MergeAcross="1"><Data ss:Type="String">wide</Data></Cell><Cell><Data ss:Type="String">z</Data></Cell></Row>
</Table></Worksheet></W>"#;
        let doc = parse(markup).unwrap();
        let sheet = doc.sheet("m").unwrap();
        assert_eq!(sheet.columns(), &["a", "col_2", "c"]);
        assert_eq!(sheet.header().cell(0).unwrap().width(), 2);
        assert_eq!(sheet.text(0, 2), "3");
        assert_eq!(sheet.text(1, 0), "wide");
        assert_eq!(sheet.text(1, 1), "");
        assert_eq!(sheet.text(1, 2), "z");
        assert_eq!(doc.to_markup(), markup);
    }

    #[test]
    fn test_cell_origin_records_splice_points() {
        let markup = r#"<W xmlns:ss="urn:s"><Worksheet ss:Name="t"><Table>
<Row><Cell><Data ss:Type="String">k</Data></Cell><Cell><Data ss:Type="String">v</Data></Cell></Row>
<Row><Cell ss:StyleID="s1" ss:HRef="https://example.org"><Data ss:Type="Number">4</Data></Cell><Cell><Data ss:Type="String"/></Cell></Row>
</Table></Worksheet></W>"#;
        let doc = parse(markup).unwrap();
        let row = doc.sheet("t").unwrap().row(0).unwrap();

        let linked = row.cell(0).unwrap().origin.as_ref().unwrap();
        assert!(linked.extras);
        assert_eq!(linked.type_value.unwrap().slice(markup), "Number");
        assert_eq!(linked.style_value.unwrap().slice(markup), "s1");
        assert_eq!(&markup[linked.span.start..linked.name_end], "<Cell");
        assert!(matches!(linked.slot, ValueSlot::Text(span) if span.slice(markup) == "4"));

        let empty = row.cell(1).unwrap().origin.as_ref().unwrap();
        assert!(!empty.extras);
        assert!(matches!(&empty.slot, ValueSlot::Empty { tail, tag } if tail.slice(markup) == "/>" && tag == "Data"));
    }
}
