//! Typed edit operations.
//!
//! Operations are plain data: the planner and the oracle create them, the
//! engine consumes them. They serialize as JSON objects tagged with `op`, for
//! example:
//!
//! ```json
//! {"op": "add_choice_entries", "list_name": "colors", "entries": [{"name": "red"}]}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A value for one column of a new row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValue {
    pub column: String,
    pub value: String,
}

impl ColumnValue {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A choice list entry; the label defaults to the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ChoiceEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[inline]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Condition on the cells of a data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowPredicate {
    All,
    /// Cell text equals `value` exactly
    Equals { column: String, value: String },
    /// Cell text contains `needle`, ignoring case
    Contains { column: String, needle: String },
    /// Cell text matches `pattern`, ignoring case
    Matches { column: String, pattern: String },
    Any { of: Vec<RowPredicate> },
    Every { of: Vec<RowPredicate> },
}

impl RowPredicate {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        RowPredicate::Equals {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for RowPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowPredicate::All => f.write_str("all rows"),
            RowPredicate::Equals { column, value } => write!(f, "{} = '{}'", column, value),
            RowPredicate::Contains { column, needle } => {
                write!(f, "{} contains '{}'", column, needle)
            },
            RowPredicate::Matches { column, pattern } => {
                write!(f, "{} matches /{}/", column, pattern)
            },
            RowPredicate::Any { of } => join(f, of, " or "),
            RowPredicate::Every { of } => join(f, of, " and "),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, predicates: &[RowPredicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, p) in predicates.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", p)?;
    }
    f.write_str(")")
}

/// Which rows an update applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSelector {
    /// Zero-based data row position
    Position(usize),
    Where(RowPredicate),
}

impl fmt::Display for RowSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSelector::Position(i) => write!(f, "row {}", i),
            RowSelector::Where(p) => write!(f, "{}", p),
        }
    }
}

/// One atomic change to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    AddRow {
        sheet: String,
        values: Vec<ColumnValue>,
    },
    UpdateCell {
        sheet: String,
        selector: RowSelector,
        column: String,
        value: String,
    },
    DeleteRows {
        sheet: String,
        predicate: RowPredicate,
    },
    AddChoiceEntries {
        list_name: String,
        entries: Vec<ChoiceEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
    },
    RenameField {
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
    },
    /// Remove a field's row, clear `${name}` references to it and drop its
    /// choice list when nothing else uses the list
    RemoveField {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
    },
    /// Anything the engine cannot express; applied as a no-op
    Other { description: String },
}

/// Discriminant of [`EditOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    AddRow,
    UpdateCell,
    DeleteRows,
    AddChoiceEntries,
    RenameField,
    RemoveField,
    Other,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::AddRow => "add_row",
            OperationKind::UpdateCell => "update_cell",
            OperationKind::DeleteRows => "delete_rows",
            OperationKind::AddChoiceEntries => "add_choice_entries",
            OperationKind::RenameField => "rename_field",
            OperationKind::RemoveField => "remove_field",
            OperationKind::Other => "other",
        })
    }
}

impl EditOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            EditOperation::AddRow { .. } => OperationKind::AddRow,
            EditOperation::UpdateCell { .. } => OperationKind::UpdateCell,
            EditOperation::DeleteRows { .. } => OperationKind::DeleteRows,
            EditOperation::AddChoiceEntries { .. } => OperationKind::AddChoiceEntries,
            EditOperation::RenameField { .. } => OperationKind::RenameField,
            EditOperation::RemoveField { .. } => OperationKind::RemoveField,
            EditOperation::Other { .. } => OperationKind::Other,
        }
    }

    /// The sheet named by the operation, if it names one.
    pub fn sheet(&self) -> Option<&str> {
        match self {
            EditOperation::AddRow { sheet, .. }
            | EditOperation::UpdateCell { sheet, .. }
            | EditOperation::DeleteRows { sheet, .. } => Some(sheet),
            EditOperation::AddChoiceEntries { sheet, .. }
            | EditOperation::RenameField { sheet, .. }
            | EditOperation::RemoveField { sheet, .. } => sheet.as_deref(),
            EditOperation::Other { .. } => None,
        }
    }

    /// Whether a session scoped to one sheet restricts this operation.
    #[inline]
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            EditOperation::AddRow { .. }
                | EditOperation::UpdateCell { .. }
                | EditOperation::DeleteRows { .. }
        )
    }

    /// One-line human readable description.
    pub fn describe(&self) -> String {
        match self {
            EditOperation::AddRow { sheet, values } => {
                let values: Vec<String> = values
                    .iter()
                    .map(|v| format!("{}='{}'", v.column, v.value))
                    .collect();
                format!("add a row to '{}' with {}", sheet, values.join(", "))
            },
            EditOperation::UpdateCell {
                sheet,
                selector,
                column,
                value,
            } => format!(
                "set '{}' to '{}' in '{}' where {}",
                column, value, sheet, selector
            ),
            EditOperation::DeleteRows { sheet, predicate } => {
                format!("delete rows from '{}' where {}", sheet, predicate)
            },
            EditOperation::AddChoiceEntries {
                list_name, entries, ..
            } => {
                let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
                format!(
                    "add {} choice(s) to list '{}': {}",
                    entries.len(),
                    list_name,
                    names.join(", ")
                )
            },
            EditOperation::RenameField { from, to, .. } => {
                format!("rename field '{}' to '{}'", from, to)
            },
            EditOperation::RemoveField { name, .. } => format!("remove field '{}'", name),
            EditOperation::Other { description } => format!("no-op: {}", description),
        }
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let op = EditOperation::AddChoiceEntries {
            list_name: "colors".into(),
            entries: vec![ChoiceEntry::new("red"), ChoiceEntry::new("dk").with_label("Dark")],
            sheet: None,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "op": "add_choice_entries",
                "list_name": "colors",
                "entries": [{"name": "red"}, {"name": "dk", "label": "Dark"}]
            })
        );
    }

    #[test]
    fn test_parse_nested_predicate() {
        let op: EditOperation = serde_json::from_str(
            r#"{"op":"delete_rows","sheet":"survey","predicate":
                {"kind":"any","of":[{"kind":"equals","column":"name","value":"a"},
                                    {"kind":"contains","column":"label","needle":"tmp"}]}}"#,
        )
        .unwrap();
        assert_eq!(op.kind(), OperationKind::DeleteRows);
        assert_eq!(op.sheet(), Some("survey"));
        assert_eq!(
            op.describe(),
            "delete rows from 'survey' where (name = 'a' or label contains 'tmp')"
        );
    }

    #[test]
    fn test_selector_json() {
        let op: EditOperation = serde_json::from_str(
            r#"{"op":"update_cell","sheet":"s","selector":{"position":2},"column":"c","value":"v"}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            EditOperation::UpdateCell {
                sheet: "s".into(),
                selector: RowSelector::Position(2),
                column: "c".into(),
                value: "v".into(),
            }
        );
        assert!(op.is_row_level());
    }

    #[test]
    fn test_choice_label_defaults_to_name() {
        assert_eq!(ChoiceEntry::new("x").label(), "x");
    }

    #[test]
    fn test_remove_field_json() {
        let op: EditOperation =
            serde_json::from_str(r#"{"op":"remove_field","name":"age"}"#).unwrap();
        assert_eq!(op.kind(), OperationKind::RemoveField);
        assert_eq!(op.sheet(), None);
        assert!(!op.is_row_level());
        assert_eq!(op.to_string(), "remove field 'age'");
        assert_eq!(OperationKind::RemoveField.to_string(), "remove_field");
    }
}
