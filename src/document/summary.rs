//! Structural summary of a document.
//!
//! The summary is the only view of a document the planner and the oracle get:
//! sheet names, row counts, columns, roles and a capped list of logical keys.

use std::fmt;

use serde::Serialize;

use crate::common::error::{Error, Result};
use crate::common::id::DocumentId;

use super::model::Document;
use super::schema::{self, SheetRole};
use super::sheet::Sheet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub document_id: DocumentId,
    pub sheets: Vec<SheetSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub role: SheetRole,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Field names for field sheets, list names for choice sheets
    pub keys: Vec<String>,
    /// Keys left out because of the cap
    pub omitted_keys: usize,
}

impl DocumentSummary {
    pub(crate) fn of(doc: &Document, key_limit: usize) -> Self {
        Self {
            document_id: doc.id(),
            sheets: doc
                .sheets()
                .iter()
                .map(|s| SheetSummary::of(s, key_limit))
                .collect(),
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetSummary> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheets_with_role(&self, role: SheetRole) -> impl Iterator<Item = &SheetSummary> {
        self.sheets.iter().filter(move |s| s.role == role)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| Error::Serialization(format!("Failed to render summary as YAML: {}", e)))
    }
}

impl SheetSummary {
    fn of(sheet: &Sheet, key_limit: usize) -> Self {
        let key_column = match sheet.role() {
            SheetRole::Fields => schema::name_column(sheet.columns()),
            SheetRole::Choices => {
                schema::list_column(sheet.columns()).or_else(|| sheet.key_column())
            },
            SheetRole::Settings | SheetRole::Generic => None,
        };
        let mut keys: Vec<String> = key_column
            .map(|c| {
                sheet
                    .distinct_values(c)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let omitted_keys = keys.len().saturating_sub(key_limit);
        keys.truncate(key_limit);

        Self {
            name: sheet.name().to_string(),
            role: sheet.role(),
            rows: sheet.len(),
            columns: sheet.columns().to_vec(),
            keys,
            omitted_keys,
        }
    }

    #[inline]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name) || schema::find_column(&self.columns, name).is_some()
    }
}

impl fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sheets.is_empty() {
            return writeln!(f, "no sheets recognized");
        }
        for sheet in &self.sheets {
            write!(f, "{}", sheet)?;
        }
        Ok(())
    }
}

impl fmt::Display for SheetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "sheet '{}' ({}, {} rows): {}",
            self.name,
            self.role,
            self.rows,
            self.columns.join(", ")
        )?;
        if !self.keys.is_empty() {
            let label = match self.role {
                SheetRole::Choices => "lists",
                _ => "fields",
            };
            write!(f, "  {}: {}", label, self.keys.join(", "))?;
            if self.omitted_keys > 0 {
                write!(f, " (+{} more)", self.omitted_keys)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::document::SheetRole;
    use crate::test_support::sample_document;

    #[test]
    fn test_describe_sample() {
        let summary = sample_document().describe(50);
        let survey = summary.sheet("survey").unwrap();
        assert_eq!(survey.role, SheetRole::Fields);
        assert_eq!(survey.rows, 4);
        assert_eq!(survey.keys, vec!["age", "consent", "reason", "equipment_used"]);

        let choices = summary.sheet("choices").unwrap();
        assert_eq!(choices.keys, vec!["yes_no", "equipment"]);
        assert!(summary.sheet("settings").unwrap().keys.is_empty());
    }

    #[test]
    fn test_key_cap() {
        let summary = sample_document().describe(2);
        let survey = summary.sheet("survey").unwrap();
        assert_eq!(survey.keys, vec!["age", "consent"]);
        assert_eq!(survey.omitted_keys, 2);
        assert!(summary.to_string().contains("  fields: age, consent (+2 more)"));
    }

    #[test]
    fn test_display_lines() {
        let text = sample_document().describe(50).to_string();
        assert!(text.starts_with(
            "sheet 'survey' (fields, 4 rows): type, name, label, relevant, required\n"
        ));
        assert!(text.contains("sheet 'choices' (choices, 4 rows): list_name, name, label\n  lists: yes_no, equipment\n"));
    }

    #[test]
    fn test_yaml_lists_sheets() {
        let yaml = sample_document().describe(50).to_yaml().unwrap();
        assert!(yaml.contains("survey"));
        assert!(yaml.contains("equipment_used"));
    }
}
