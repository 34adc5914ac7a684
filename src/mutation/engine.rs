//! Applying edit operations to documents.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::debug;

use crate::common::xml::first_illegal_char;
use crate::document::schema::{self, SheetRole};
use crate::document::{CellValue, Document, Row, Sheet, highlight_changes, parse, serialize};

use super::error::MutationError;
use super::operation::{ChoiceEntry, ColumnValue, EditOperation, OperationKind, RowPredicate, RowSelector};
use super::options::EditOptions;
use super::references::{self, BareWord};

/// What an operation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub sheet: Option<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_added: usize,
    pub rows_removed: usize,
    pub cells_changed: usize,
}

/// Outcome of a successful apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    pub kind: OperationKind,
    pub rows_affected: usize,
    pub warnings: Vec<String>,
    pub change: ChangeSummary,
}

/// A successfully edited copy of a document.
#[derive(Debug, Clone)]
pub struct Applied {
    pub document: Document,
    pub report: ApplyReport,
}

/// Apply `op` to a copy of `doc` with default options.
///
/// On error `doc` is untouched and nothing is returned.
#[inline]
pub fn apply(doc: &Document, op: &EditOperation) -> Result<Applied, MutationError> {
    apply_with(doc, op, &EditOptions::default())
}

/// Apply `op` to a copy of `doc`.
pub fn apply_with(
    doc: &Document,
    op: &EditOperation,
    options: &EditOptions,
) -> Result<Applied, MutationError> {
    let mut working = doc.clone();
    let report = match op {
        EditOperation::AddRow { sheet, values } => add_row(&mut working, sheet, values)?,
        EditOperation::UpdateCell {
            sheet,
            selector,
            column,
            value,
        } => update_cell(&mut working, sheet, selector, column, value)?,
        EditOperation::DeleteRows { sheet, predicate } => {
            delete_rows(&mut working, sheet, predicate)?
        },
        EditOperation::AddChoiceEntries {
            list_name,
            entries,
            sheet,
        } => add_choice_entries(&mut working, list_name, entries, sheet.as_deref())?,
        EditOperation::RenameField { from, to, sheet } => {
            rename_field(&mut working, from, to, sheet.as_deref(), options.strict_rename)?
        },
        EditOperation::RemoveField { name, sheet } => {
            remove_field(&mut working, name, sheet.as_deref())?
        },
        EditOperation::Other { description } => ApplyReport {
            kind: OperationKind::Other,
            rows_affected: 0,
            warnings: vec![format!("'{}' has no effect on the document", description)],
            change: ChangeSummary::default(),
        },
    };

    if options.highlight_changes {
        highlight_changes(&mut working);
    }
    if options.verify_round_trip && working.is_modified() {
        verify_round_trip(&working)?;
    }

    debug!(
        op = %report.kind,
        sheet = report.change.sheet.as_deref().unwrap_or("-"),
        rows_affected = report.rows_affected,
        warnings = report.warnings.len(),
        "applied operation"
    );

    Ok(Applied {
        document: working,
        report,
    })
}

fn check_text(value: &str) -> Result<(), MutationError> {
    match first_illegal_char(value) {
        Some(c) => Err(MutationError::InvalidOperation(format!(
            "value contains U+{:04X}, which cannot appear in the document",
            c as u32
        ))),
        None => Ok(()),
    }
}

fn sheet_index(doc: &Document, name: &str) -> Result<usize, MutationError> {
    doc.sheet_index(name)
        .ok_or_else(|| MutationError::UnknownSheet(name.to_string()))
}

fn column_index(sheet: &Sheet, column: &str) -> Result<usize, MutationError> {
    sheet
        .column_index(column)
        .ok_or_else(|| MutationError::ColumnNotFound {
            sheet: sheet.name().to_string(),
            column: column.to_string(),
        })
}

fn change_for(sheet: &Sheet, rows_before: usize) -> ChangeSummary {
    ChangeSummary {
        sheet: Some(sheet.name().to_string()),
        rows_before,
        rows_after: sheet.len(),
        ..ChangeSummary::default()
    }
}

fn add_row(
    doc: &mut Document,
    sheet_name: &str,
    values: &[ColumnValue],
) -> Result<ApplyReport, MutationError> {
    let idx = sheet_index(doc, sheet_name)?;
    let sheet = &doc.sheets()[idx];
    if values.is_empty() {
        return Err(MutationError::InvalidOperation(
            "a new row needs at least one value".to_string(),
        ));
    }

    let mut cells: Vec<(usize, CellValue)> = Vec::with_capacity(values.len());
    for cv in values {
        let column = column_index(sheet, &cv.column)?;
        check_text(&cv.value)?;
        if cells.iter().any(|(c, _)| *c == column) {
            return Err(MutationError::InvalidOperation(format!(
                "column '{}' given twice",
                cv.column
            )));
        }
        cells.push((column, CellValue::from_input(&cv.value)));
    }

    let sheet = doc.sheet_mut(idx);
    let before = sheet.len();
    sheet.push_row(Row::generated(cells));

    Ok(ApplyReport {
        kind: OperationKind::AddRow,
        rows_affected: 1,
        warnings: Vec::new(),
        change: ChangeSummary {
            rows_added: 1,
            cells_changed: values.len(),
            ..change_for(sheet, before)
        },
    })
}

fn update_cell(
    doc: &mut Document,
    sheet_name: &str,
    selector: &RowSelector,
    column: &str,
    value: &str,
) -> Result<ApplyReport, MutationError> {
    let idx = sheet_index(doc, sheet_name)?;
    let sheet = &doc.sheets()[idx];
    let column = column_index(sheet, column)?;
    check_text(value)?;

    let targets: Vec<usize> = match selector {
        RowSelector::Position(i) if *i < sheet.len() => vec![*i],
        RowSelector::Position(_) => Vec::new(),
        RowSelector::Where(predicate) => {
            let compiled = CompiledPredicate::compile(sheet, predicate)?;
            (0..sheet.len())
                .filter(|&i| sheet.row(i).is_some_and(|r| compiled.matches(r)))
                .collect()
        },
    };
    if targets.is_empty() {
        return Err(MutationError::RowNotFound {
            sheet: sheet_name.to_string(),
            selector: selector.to_string(),
        });
    }

    let new_value = CellValue::from_input(value);
    let sheet = doc.sheet_mut(idx);
    let mut cells_changed = 0;
    for &i in &targets {
        if let Some(row) = sheet.row_mut(i)
            && row.set(column, new_value.clone())
        {
            cells_changed += 1;
        }
    }
    if cells_changed > 0 {
        sheet.mark_dirty();
    }

    let warnings = if cells_changed == 0 {
        vec!["every selected cell already had this value".to_string()]
    } else {
        Vec::new()
    };
    let rows = sheet.len();
    Ok(ApplyReport {
        kind: OperationKind::UpdateCell,
        rows_affected: targets.len(),
        warnings,
        change: ChangeSummary {
            cells_changed,
            ..change_for(sheet, rows)
        },
    })
}

fn delete_rows(
    doc: &mut Document,
    sheet_name: &str,
    predicate: &RowPredicate,
) -> Result<ApplyReport, MutationError> {
    let idx = sheet_index(doc, sheet_name)?;
    let compiled = CompiledPredicate::compile(&doc.sheets()[idx], predicate)?;

    let sheet = doc.sheet_mut(idx);
    let before = sheet.len();
    let removed = sheet.remove_rows(|row| compiled.matches(row));

    Ok(ApplyReport {
        kind: OperationKind::DeleteRows,
        rows_affected: removed,
        warnings: Vec::new(),
        change: ChangeSummary {
            rows_removed: removed,
            ..change_for(sheet, before)
        },
    })
}

/// The explicit sheet, or the best-scoring choices sheet.
fn choices_sheet(
    doc: &Document,
    explicit: Option<&str>,
    list_name: &str,
) -> Result<usize, MutationError> {
    if let Some(name) = explicit {
        return sheet_index(doc, name);
    }
    let mut best: Option<(usize, u32)> = None;
    for (i, sheet) in doc.sheets().iter().enumerate() {
        if sheet.role() != SheetRole::Choices {
            continue;
        }
        let score = schema::choice_score(sheet.columns());
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i).ok_or_else(|| {
        MutationError::UnknownSheet(format!("no choices sheet to hold list '{}'", list_name))
    })
}

fn add_choice_entries(
    doc: &mut Document,
    list_name: &str,
    entries: &[ChoiceEntry],
    explicit_sheet: Option<&str>,
) -> Result<ApplyReport, MutationError> {
    let idx = choices_sheet(doc, explicit_sheet, list_name)?;
    let sheet = &doc.sheets()[idx];
    let list_column = schema::list_column(sheet.columns()).ok_or_else(|| {
        MutationError::ColumnNotFound {
            sheet: sheet.name().to_string(),
            column: "list_name".to_string(),
        }
    })?;
    let name_column = column_index(sheet, "name")?;
    let label_column = schema::label_column(sheet.columns());

    if list_name.trim().is_empty() {
        return Err(MutationError::InvalidOperation("empty list name".to_string()));
    }
    if entries.is_empty() {
        return Err(MutationError::InvalidOperation(format!(
            "no entries to add to list '{}'",
            list_name
        )));
    }
    check_text(list_name)?;

    let members: Vec<usize> = (0..sheet.len())
        .filter(|&i| sheet.text(i, list_column).trim() == list_name)
        .collect();
    let mut keys: Vec<&str> = members
        .iter()
        .map(|&i| sheet.text(i, name_column).trim())
        .collect();
    for entry in entries {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(MutationError::InvalidOperation(format!(
                "empty entry name for list '{}'",
                list_name
            )));
        }
        check_text(name)?;
        check_text(entry.label())?;
        if keys.contains(&name) {
            return Err(MutationError::DuplicateChoiceKey {
                list: list_name.to_string(),
                key: name.to_string(),
            });
        }
        keys.push(name);
    }

    // After the last member, unless a later row pins its own position
    let insert_at = match members.last() {
        Some(&last) if sheet.rows()[last + 1..].iter().all(|r| r.explicit_index().is_none()) => {
            last + 1
        },
        _ => sheet.len(),
    };

    let new_rows: Vec<Row> = entries
        .iter()
        .map(|entry| {
            let mut cells = vec![
                (list_column, CellValue::Text(list_name.to_string())),
                (name_column, CellValue::Text(entry.name.trim().to_string())),
            ];
            if let Some(label) = label_column {
                cells.push((label, CellValue::Text(entry.label().to_string())));
            }
            Row::generated(cells)
        })
        .collect();

    let sheet = doc.sheet_mut(idx);
    let before = sheet.len();
    let added = new_rows.len();
    for (offset, row) in new_rows.into_iter().enumerate() {
        sheet.insert_row(insert_at + offset, row);
    }

    let mut warnings = Vec::new();
    if label_column.is_none() && entries.iter().any(|e| e.label.is_some()) {
        warnings.push(format!("sheet '{}' has no label column; labels dropped", sheet.name()));
    }
    Ok(ApplyReport {
        kind: OperationKind::AddChoiceEntries,
        rows_affected: added,
        warnings,
        change: ChangeSummary {
            rows_added: added,
            cells_changed: added * if label_column.is_some() { 3 } else { 2 },
            ..change_for(sheet, before)
        },
    })
}

/// The explicit sheet, or every sheet holding fields.
fn field_sheets(doc: &Document, explicit: Option<&str>) -> Result<Vec<usize>, MutationError> {
    Ok(match explicit {
        Some(name) => vec![sheet_index(doc, name)?],
        None => doc
            .sheets()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.role() == SheetRole::Fields)
            .map(|(i, _)| i)
            .collect(),
    })
}

fn rename_field(
    doc: &mut Document,
    from: &str,
    to: &str,
    explicit_sheet: Option<&str>,
    strict: bool,
) -> Result<ApplyReport, MutationError> {
    let field_sheets = field_sheets(doc, explicit_sheet)?;

    // (sheet, row, name column) of every row keyed `from`, and all field names
    let mut hits: Vec<(usize, usize, usize)> = Vec::new();
    let mut taken = false;
    for &si in &field_sheets {
        let sheet = &doc.sheets()[si];
        let Some(name_column) = schema::name_column(sheet.columns()) else {
            continue;
        };
        for ri in 0..sheet.len() {
            let key = sheet.text(ri, name_column).trim();
            if key == from {
                hits.push((si, ri, name_column));
            } else if key == to {
                taken = true;
            }
        }
    }
    if hits.is_empty() {
        return Err(MutationError::FieldNotFound(from.to_string()));
    }
    if to.is_empty() || to.chars().any(char::is_whitespace) {
        return Err(MutationError::InvalidOperation(format!(
            "'{}' is not a valid field name",
            to
        )));
    }
    if to == from || taken {
        return Err(MutationError::InvalidOperation(format!(
            "a field named '{}' already exists",
            to
        )));
    }
    check_text(to)?;

    // Collect every change before touching the document
    let bare = BareWord::new(from);
    let mut rewrites: Vec<(usize, usize, usize, String)> = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();
    for (si, sheet) in doc.sheets().iter().enumerate() {
        for (ri, row) in sheet.rows().iter().enumerate() {
            for cell in row.cells() {
                let column = cell.column();
                if hits.contains(&(si, ri, column)) {
                    continue;
                }
                let text = cell.text();
                let rewritten = references::rewrite(text, from, to);
                let scanned = rewritten.as_deref().unwrap_or(text);
                let column_name = sheet.columns().get(column).map_or("", String::as_str);
                if (references::is_expression_column(column_name) || scanned.contains("${"))
                    && bare.as_ref().is_some_and(|b| b.occurs_in(scanned))
                {
                    unresolved.push(format!("{}/{} row {}", sheet.name(), column_name, ri + 1));
                }
                if let Some(new_text) = rewritten {
                    rewrites.push((si, ri, column, new_text));
                }
            }
        }
    }
    if strict && !unresolved.is_empty() {
        return Err(MutationError::UnresolvedReferences {
            field: from.to_string(),
            locations: unresolved,
        });
    }

    let first_sheet = hits[0].0;
    let before = doc.sheets()[first_sheet].len();
    let cells_changed = hits.len() + rewrites.len();
    for &(si, ri, column) in &hits {
        set_cell(doc, si, ri, column, CellValue::Text(to.to_string()));
    }
    for (si, ri, column, text) in rewrites {
        set_cell(doc, si, ri, column, CellValue::Text(text));
    }

    let warnings = unresolved
        .into_iter()
        .map(|location| format!("'{}' mentioned without ${{}} at {}; left unchanged", from, location))
        .collect();
    Ok(ApplyReport {
        kind: OperationKind::RenameField,
        rows_affected: hits.len(),
        warnings,
        change: ChangeSummary {
            cells_changed,
            ..change_for(&doc.sheets()[first_sheet], before)
        },
    })
}

/// Remove every row keyed `name`, then clean up after it.
///
/// Cells elsewhere that refer to `${name}` are cleared. A choice list named
/// by the field's select type goes too, unless a remaining field uses it.
fn remove_field(
    doc: &mut Document,
    name: &str,
    explicit_sheet: Option<&str>,
) -> Result<ApplyReport, MutationError> {
    let name = name.trim();
    let field_sheets = field_sheets(doc, explicit_sheet)?;

    let mut hits: Vec<(usize, usize)> = Vec::new();
    let mut lists: Vec<String> = Vec::new();
    for &si in &field_sheets {
        let sheet = &doc.sheets()[si];
        let Some(name_column) = schema::name_column(sheet.columns()) else {
            continue;
        };
        let type_column = schema::type_column(sheet.columns());
        for ri in 0..sheet.len() {
            if name.is_empty() || sheet.text(ri, name_column).trim() != name {
                continue;
            }
            hits.push((si, ri));
            if let Some(list) = type_column.and_then(|c| references::select_list(sheet.text(ri, c)))
                && !lists.iter().any(|l| l == list)
            {
                lists.push(list.to_string());
            }
        }
    }
    if hits.is_empty() {
        return Err(MutationError::FieldNotFound(name.to_string()));
    }

    let mut warnings = Vec::new();
    lists.retain(|list| {
        let shared = doc
            .sheets()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.role() == SheetRole::Fields)
            .any(|(si, sheet)| {
                schema::type_column(sheet.columns()).is_some_and(|tc| {
                    (0..sheet.len()).any(|ri| {
                        !hits.contains(&(si, ri))
                            && references::select_list(sheet.text(ri, tc)) == Some(list.as_str())
                    })
                })
            });
        if shared {
            warnings.push(format!(
                "choice list '{}' is still used by another field; kept",
                list
            ));
        }
        !shared
    });

    let mut cleared: Vec<(usize, usize, usize)> = Vec::new();
    for (si, sheet) in doc.sheets().iter().enumerate() {
        for (ri, row) in sheet.rows().iter().enumerate() {
            if hits.contains(&(si, ri)) {
                continue;
            }
            for cell in row.cells() {
                if references::mentions(cell.text(), name) {
                    let column_name = sheet.columns().get(cell.column()).map_or("", String::as_str);
                    warnings.push(format!(
                        "cleared {}/{} row {}, which referred to ${{{}}}",
                        sheet.name(),
                        column_name,
                        ri + 1,
                        name
                    ));
                    cleared.push((si, ri, cell.column()));
                }
            }
        }
    }

    let first_sheet = hits[0].0;
    let before = doc.sheets()[first_sheet].len();
    for &(si, ri, column) in &cleared {
        set_cell(doc, si, ri, column, CellValue::Empty);
    }

    for list in &lists {
        let mut removed = 0;
        for si in 0..doc.sheets().len() {
            let sheet = &doc.sheets()[si];
            if sheet.role() != SheetRole::Choices {
                continue;
            }
            let Some(list_column) = schema::list_column(sheet.columns()) else {
                continue;
            };
            removed += doc
                .sheet_mut(si)
                .remove_rows(|row| row.text(list_column).trim() == list.as_str());
        }
        if removed > 0 {
            warnings.push(format!("removed {} entries of choice list '{}'", removed, list));
        }
    }

    for &si in &field_sheets {
        let targets: Vec<usize> = hits.iter().filter(|(s, _)| *s == si).map(|&(_, ri)| ri).collect();
        if targets.is_empty() {
            continue;
        }
        let mut position = 0;
        doc.sheet_mut(si).remove_rows(|_| {
            let hit = targets.contains(&position);
            position += 1;
            hit
        });
    }

    Ok(ApplyReport {
        kind: OperationKind::RemoveField,
        rows_affected: hits.len(),
        warnings,
        change: ChangeSummary {
            rows_removed: hits.iter().filter(|(s, _)| *s == first_sheet).count(),
            cells_changed: cleared.len(),
            ..change_for(&doc.sheets()[first_sheet], before)
        },
    })
}

fn set_cell(doc: &mut Document, sheet: usize, row: usize, column: usize, value: CellValue) {
    let sheet = doc.sheet_mut(sheet);
    if let Some(r) = sheet.row_mut(row)
        && r.set(column, value)
    {
        sheet.mark_dirty();
    }
}

/// Re-parse the serialized document and compare its structure.
fn verify_round_trip(doc: &Document) -> Result<(), MutationError> {
    let markup = serialize(doc);
    let reparsed = parse(&markup)
        .map_err(|e| MutationError::Invariant(format!("edited markup does not parse: {}", e)))?;

    let expected: Vec<(&str, usize)> = doc.sheets().iter().map(|s| (s.name(), s.len())).collect();
    let actual: Vec<(&str, usize)> = reparsed
        .sheets()
        .iter()
        .map(|s| (s.name(), s.len()))
        .collect();
    if expected != actual {
        return Err(MutationError::Invariant(format!(
            "edited markup re-parses as {:?}, expected {:?}",
            actual, expected
        )));
    }
    Ok(())
}

/// A [`RowPredicate`] resolved against one sheet's columns.
enum CompiledPredicate {
    All,
    Equals(usize, String),
    Contains(usize, String),
    Matches(usize, Regex),
    Any(Vec<CompiledPredicate>),
    Every(Vec<CompiledPredicate>),
}

impl CompiledPredicate {
    fn compile(sheet: &Sheet, predicate: &RowPredicate) -> Result<Self, MutationError> {
        Ok(match predicate {
            RowPredicate::All => CompiledPredicate::All,
            RowPredicate::Equals { column, value } => {
                CompiledPredicate::Equals(column_index(sheet, column)?, value.clone())
            },
            RowPredicate::Contains { column, needle } => {
                CompiledPredicate::Contains(column_index(sheet, column)?, needle.to_lowercase())
            },
            RowPredicate::Matches { column, pattern } => {
                let column = column_index(sheet, column)?;
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        MutationError::InvalidOperation(format!("bad pattern '{}': {}", pattern, e))
                    })?;
                CompiledPredicate::Matches(column, regex)
            },
            RowPredicate::Any { of } => CompiledPredicate::Any(
                of.iter()
                    .map(|p| Self::compile(sheet, p))
                    .collect::<Result<_, _>>()?,
            ),
            RowPredicate::Every { of } => CompiledPredicate::Every(
                of.iter()
                    .map(|p| Self::compile(sheet, p))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            CompiledPredicate::All => true,
            CompiledPredicate::Equals(column, value) => {
                let text = row.text(*column);
                text == value
                    || (matches!(row.value(*column), CellValue::Bool(_))
                        && *row.value(*column) == CellValue::from_input(value))
            },
            CompiledPredicate::Contains(column, needle) => {
                row.text(*column).to_lowercase().contains(needle.as_str())
            },
            CompiledPredicate::Matches(column, regex) => regex.is_match(row.text(*column)),
            CompiledPredicate::Any(predicates) => predicates.iter().any(|p| p.matches(row)),
            CompiledPredicate::Every(predicates) => predicates.iter().all(|p| p.matches(row)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_document;

    fn choices(doc: &Document) -> Vec<(String, String, String)> {
        let sheet = doc.sheet("choices").unwrap();
        (0..sheet.len())
            .map(|i| {
                (
                    sheet.text(i, 0).to_string(),
                    sheet.text(i, 1).to_string(),
                    sheet.text(i, 2).to_string(),
                )
            })
            .collect()
    }

    fn add_choices(list: &str, names: &[&str]) -> EditOperation {
        EditOperation::AddChoiceEntries {
            list_name: list.to_string(),
            entries: names.iter().map(|n| ChoiceEntry::new(*n)).collect(),
            sheet: None,
        }
    }

    #[test]
    fn test_add_choices_to_new_list_appends() {
        let doc = sample_document();
        let applied = apply(&doc, &add_choices("MYLIST", &["A", "B", "C"])).unwrap();
        assert_eq!(applied.report.rows_affected, 3);
        assert_eq!(applied.report.change.rows_added, 3);
        assert_eq!(applied.report.change.sheet.as_deref(), Some("choices"));

        let rows = choices(&applied.document);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[4], ("MYLIST".into(), "A".into(), "A".into()));
        assert_eq!(rows[6], ("MYLIST".into(), "C".into(), "C".into()));
        assert!(!doc.is_modified());
    }

    #[test]
    fn test_add_choices_to_existing_list_inserts_after_last_member() {
        let doc = sample_document();
        let applied = apply(&doc, &add_choices("yes_no", &["dont_know"])).unwrap();
        let rows = choices(&applied.document);
        assert_eq!(rows[1].1, "no");
        assert_eq!(rows[2], ("yes_no".into(), "dont_know".into(), "dont_know".into()));
        assert_eq!(rows[3].1, "pump");
    }

    #[test]
    fn test_duplicate_choice_key_rejected() {
        let doc = sample_document();
        let op = add_choices("MYLIST", &["A", "B"]);
        let once = apply(&doc, &op).unwrap().document;
        let err = apply(&once, &op).unwrap_err();
        assert_eq!(
            err,
            MutationError::DuplicateChoiceKey {
                list: "MYLIST".into(),
                key: "A".into()
            }
        );

        let err = apply(&doc, &add_choices("yes_no", &["maybe", "maybe"])).unwrap_err();
        assert!(matches!(err, MutationError::DuplicateChoiceKey { .. }));
    }

    #[test]
    fn test_add_row_and_unknown_column() {
        let doc = sample_document();
        let op = EditOperation::AddRow {
            sheet: "survey".into(),
            values: vec![
                ColumnValue::new("type", "note"),
                ColumnValue::new("name", "intro"),
                ColumnValue::new("required", "TRUE"),
            ],
        };
        let applied = apply(&doc, &op).unwrap();
        let survey = applied.document.sheet("survey").unwrap();
        assert_eq!(survey.len(), 5);
        assert_eq!(survey.text(4, 1), "intro");
        assert_eq!(survey.row(4).unwrap().value(4), &CellValue::Bool(true));

        let op = EditOperation::AddRow {
            sheet: "survey".into(),
            values: vec![ColumnValue::new("hint", "x")],
        };
        assert_eq!(
            apply(&doc, &op).unwrap_err(),
            MutationError::ColumnNotFound {
                sheet: "survey".into(),
                column: "hint".into()
            }
        );
    }

    #[test]
    fn test_update_cell_by_predicate_and_position() {
        let doc = sample_document();
        let op = EditOperation::UpdateCell {
            sheet: "survey".into(),
            selector: RowSelector::Where(RowPredicate::equals("name", "consent")),
            column: "required".into(),
            value: "true".into(),
        };
        let applied = apply(&doc, &op).unwrap();
        let survey = applied.document.sheet("survey").unwrap();
        assert_eq!(survey.row(1).unwrap().value(4), &CellValue::Bool(true));
        assert_eq!(applied.report.change.cells_changed, 1);
        let markup = applied.document.to_markup();
        let flagged = r#"<Cell ss:Index="5"><Data ss:Type="Boolean">1</Data></Cell>"#;
        assert_eq!(markup.matches(flagged).count(), 2);

        let op = EditOperation::UpdateCell {
            sheet: "survey".into(),
            selector: RowSelector::Position(9),
            column: "label".into(),
            value: "x".into(),
        };
        assert!(matches!(
            apply(&doc, &op).unwrap_err(),
            MutationError::RowNotFound { .. }
        ));
    }

    #[test]
    fn test_update_matches_boolean_cells() {
        let doc = sample_document();
        let op = EditOperation::UpdateCell {
            sheet: "survey".into(),
            selector: RowSelector::Where(RowPredicate::equals("required", "TRUE")),
            column: "label".into(),
            value: "Age in years".into(),
        };
        let applied = apply(&doc, &op).unwrap();
        assert_eq!(applied.report.rows_affected, 1);
        assert_eq!(applied.document.sheet("survey").unwrap().text(0, 2), "Age in years");
    }

    #[test]
    fn test_delete_rows() {
        let doc = sample_document();
        let op = EditOperation::DeleteRows {
            sheet: "choices".into(),
            predicate: RowPredicate::Matches {
                column: "list_name".into(),
                pattern: "^EQUIP".into(),
            },
        };
        let applied = apply(&doc, &op).unwrap();
        assert_eq!(applied.report.rows_affected, 2);
        assert_eq!(applied.document.sheet("choices").unwrap().len(), 2);

        let op = EditOperation::DeleteRows {
            sheet: "choices".into(),
            predicate: RowPredicate::equals("name", "nothing"),
        };
        let applied = apply(&doc, &op).unwrap();
        assert_eq!(applied.report.rows_affected, 0);
        assert!(!applied.document.is_modified());

        let op = EditOperation::DeleteRows {
            sheet: "bogus_sheet".into(),
            predicate: RowPredicate::All,
        };
        assert_eq!(
            apply(&doc, &op).unwrap_err(),
            MutationError::UnknownSheet("bogus_sheet".into())
        );
    }

    #[test]
    fn test_delete_all_keeps_header() {
        let doc = sample_document();
        let op = EditOperation::DeleteRows {
            sheet: "choices".into(),
            predicate: RowPredicate::All,
        };
        let applied = apply(&doc, &op).unwrap();
        let sheet = applied.document.sheet("choices").unwrap();
        assert!(sheet.is_empty());
        assert_eq!(sheet.columns(), &["list_name", "name", "label"]);
    }

    #[test]
    fn test_rename_field_rewrites_references() {
        let doc = sample_document();
        let op = EditOperation::RenameField {
            from: "age".into(),
            to: "age_years".into(),
            sheet: None,
        };
        let applied = apply(&doc, &op).unwrap();
        let survey = applied.document.sheet("survey").unwrap();
        assert_eq!(survey.text(0, 1), "age_years");
        assert_eq!(survey.text(2, 3), "${consent} = 'no' and ${age_years} > 17");
        assert_eq!(applied.report.change.cells_changed, 2);
        assert!(applied.report.warnings.is_empty());
    }

    #[test]
    fn test_rename_field_errors() {
        let doc = sample_document();
        let rename = |from: &str, to: &str| EditOperation::RenameField {
            from: from.into(),
            to: to.into(),
            sheet: None,
        };
        assert_eq!(
            apply(&doc, &rename("ghost", "x")).unwrap_err(),
            MutationError::FieldNotFound("ghost".into())
        );
        assert!(matches!(
            apply(&doc, &rename("age", "consent")).unwrap_err(),
            MutationError::InvalidOperation(_)
        ));
        assert!(matches!(
            apply(&doc, &rename("age", "two words")).unwrap_err(),
            MutationError::InvalidOperation(_)
        ));
    }

    #[test]
    fn test_rename_bare_mentions_warn_or_fail() {
        let doc = sample_document();
        let op = EditOperation::UpdateCell {
            sheet: "survey".into(),
            selector: RowSelector::Where(RowPredicate::equals("name", "consent")),
            column: "relevant".into(),
            value: "age > 17".into(),
        };
        let doc = apply(&doc, &op).unwrap().document;
        let rename = EditOperation::RenameField {
            from: "age".into(),
            to: "age_years".into(),
            sheet: None,
        };

        let applied = apply(&doc, &rename).unwrap();
        assert_eq!(applied.report.warnings.len(), 1);
        assert!(applied.report.warnings[0].contains("survey/relevant row 2"));

        let strict = EditOptions::new().with_strict_rename(true);
        let err = apply_with(&doc, &rename, &strict).unwrap_err();
        assert_eq!(
            err,
            MutationError::UnresolvedReferences {
                field: "age".into(),
                locations: vec!["survey/relevant row 2".into()]
            }
        );
    }

    #[test]
    fn test_other_is_noop_with_warning() {
        let doc = sample_document();
        let op = EditOperation::Other {
            description: "translate labels".into(),
        };
        let applied = apply(&doc, &op).unwrap();
        assert_eq!(applied.report.rows_affected, 0);
        assert_eq!(applied.report.warnings.len(), 1);
        assert_eq!(applied.document.to_markup(), doc.to_markup());
    }

    #[test]
    fn test_illegal_characters_rejected() {
        let doc = sample_document();
        let op = EditOperation::UpdateCell {
            sheet: "survey".into(),
            selector: RowSelector::Position(0),
            column: "label".into(),
            value: "bad\u{1}".into(),
        };
        assert!(matches!(
            apply(&doc, &op).unwrap_err(),
            MutationError::InvalidOperation(_)
        ));
    }

    #[test]
    fn test_bad_pattern_is_invalid_operation() {
        let doc = sample_document();
        let op = EditOperation::DeleteRows {
            sheet: "choices".into(),
            predicate: RowPredicate::Matches {
                column: "name".into(),
                pattern: "(".into(),
            },
        };
        assert!(matches!(
            apply(&doc, &op).unwrap_err(),
            MutationError::InvalidOperation(_)
        ));
    }

    fn remove(name: &str) -> EditOperation {
        EditOperation::RemoveField {
            name: name.to_string(),
            sheet: None,
        }
    }

    #[test]
    fn test_remove_missing_field_fails() {
        let doc = sample_document();
        assert_eq!(
            apply(&doc, &remove("ghost")).unwrap_err(),
            MutationError::FieldNotFound("ghost".into())
        );
        assert_eq!(
            apply(&doc, &remove("  ")).unwrap_err(),
            MutationError::FieldNotFound(String::new())
        );
    }

    #[test]
    fn test_remove_field_clears_references() {
        let doc = sample_document();
        let applied = apply(&doc, &remove("age")).unwrap();
        let survey = applied.document.sheet("survey").unwrap();
        assert_eq!(survey.len(), 3);
        assert_eq!(survey.text(0, 1), "consent");
        assert_eq!(survey.text(1, 1), "reason");
        assert_eq!(survey.text(1, 3), "");

        let report = &applied.report;
        assert_eq!(report.kind, OperationKind::RemoveField);
        assert_eq!(report.rows_affected, 1);
        assert_eq!(report.change.rows_removed, 1);
        assert_eq!(report.change.cells_changed, 1);
        assert_eq!(
            report.warnings,
            vec!["cleared survey/relevant row 3, which referred to ${age}".to_string()]
        );
        assert_eq!(choices(&applied.document), choices(&doc));
        assert!(!applied.document.to_markup().contains("${age}"));
    }

    #[test]
    fn test_remove_select_field_drops_its_list() {
        let doc = sample_document();
        let applied = apply(&doc, &remove("equipment_used")).unwrap();
        let rows = choices(&applied.document);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(list, _, _)| list == "yes_no"));
        assert_eq!(applied.document.sheet("survey").unwrap().len(), 3);
        assert!(applied
            .report
            .warnings
            .contains(&"removed 2 entries of choice list 'equipment'".to_string()));
    }

    #[test]
    fn test_remove_field_keeps_shared_list() {
        let doc = sample_document();
        let add = EditOperation::AddRow {
            sheet: "survey".into(),
            values: vec![
                ColumnValue::new("type", "select_one yes_no"),
                ColumnValue::new("name", "consent_again"),
            ],
        };
        let doc = apply(&doc, &add).unwrap().document;
        let applied = apply(&doc, &remove("consent")).unwrap();
        assert_eq!(choices(&applied.document).len(), 4);
        assert!(applied
            .report
            .warnings
            .contains(&"choice list 'yes_no' is still used by another field; kept".to_string()));
        // `${consent}` in the reason row is cleared
        let survey = applied.document.sheet("survey").unwrap();
        assert_eq!(survey.text(1, 3), "");
    }

    fn relabel_consent() -> EditOperation {
        EditOperation::UpdateCell {
            sheet: "survey".into(),
            selector: RowSelector::Where(RowPredicate::equals("name", "consent")),
            column: "label".into(),
            value: "Agree?".into(),
        }
    }

    #[test]
    fn test_highlight_off_by_default() {
        let doc = sample_document();
        let applied = apply(&doc, &relabel_consent()).unwrap();
        let out = applied.document.to_markup();
        assert!(!out.contains("AIModified"));
        assert!(out.contains(r#"<Cell><Data ss:Type="String">Agree?</Data></Cell>"#));
        // Only the edited text differs from the source
        assert_eq!(out, doc.source().replace("Do you consent?", "Agree?"));
    }

    #[test]
    fn test_highlight_marks_modified_and_added() {
        let doc = sample_document();
        let options = EditOptions::new().with_highlight_changes(true);
        let first = apply_with(&doc, &relabel_consent(), &options).unwrap();
        let second = apply_with(&first.document, &add_choices("yes_no", &["maybe"]), &options).unwrap();

        let out = second.document.to_markup();
        assert!(out.contains(
            r#"<Cell ss:StyleID="AIModified"><Data ss:Type="String">Agree?</Data></Cell>"#
        ));
        assert!(out.contains(r#"<Row ss:StyleID="AIAdded">"#));
        assert_eq!(out.matches(r#"<Style ss:ID="AIModified">"#).count(), 1);
        assert_eq!(out.matches(r#"<Style ss:ID="AIAdded">"#).count(), 1);
        // Untouched rows stay unstyled
        assert!(out.contains(r#"<Cell><Data ss:Type="String">How old are you?</Data></Cell>"#));

        let reparsed = parse(&out).unwrap();
        let consent = reparsed.sheet("survey").unwrap().row(1).unwrap();
        assert_eq!(consent.cell(2).unwrap().style(), Some("AIModified"));
    }

    #[test]
    fn test_highlight_on_removed_field_reference() {
        let doc = sample_document();
        let options = EditOptions::new().with_highlight_changes(true);
        let applied = apply_with(&doc, &remove("age"), &options).unwrap();
        let out = applied.document.to_markup();
        assert!(out.contains(
            r#"<Cell ss:StyleID="AIModified"><Data ss:Type="String"></Data></Cell>"#
        ));
        assert!(!out.contains(r#"<Style ss:ID="AIAdded">"#));
    }
}

