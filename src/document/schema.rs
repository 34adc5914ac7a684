//! Sheet role inference from column names.
//!
//! Nothing here assumes a fixed template: roles are guessed from whatever
//! columns a header row declares, and every lookup tolerates spelling
//! variants such as `list name` for `list_name` or `label::English (en)`.

use serde::{Deserialize, Serialize};

/// What a sheet is used for, as far as the column names tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetRole {
    /// Form fields, one per row, keyed by `name`
    Fields,
    /// Choice list entries keyed by list name and `name`
    Choices,
    /// Form-level settings
    Settings,
    Generic,
}

impl std::fmt::Display for SheetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SheetRole::Fields => "fields",
            SheetRole::Choices => "choices",
            SheetRole::Settings => "settings",
            SheetRole::Generic => "generic",
        })
    }
}

const SETTINGS_COLUMNS: &[&str] = &[
    "form_title",
    "form_id",
    "version",
    "style",
    "default_language",
    "instance_name",
];

/// Lowercase, trimmed, with inner whitespace runs folded to `_`.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn is_label(normalized: &str) -> bool {
    normalized == "label" || normalized.starts_with("label:")
}

/// Position of the column whose normalized name is `wanted`.
pub fn find_column(columns: &[String], wanted: &str) -> Option<usize> {
    let wanted = normalize_header(wanted);
    columns.iter().position(|c| normalize_header(c) == wanted)
}

pub fn name_column(columns: &[String]) -> Option<usize> {
    find_column(columns, "name")
}

pub fn type_column(columns: &[String]) -> Option<usize> {
    find_column(columns, "type")
}

/// First label column, including translated variants.
pub fn label_column(columns: &[String]) -> Option<usize> {
    columns.iter().position(|c| is_label(&normalize_header(c)))
}

/// The list-name column of a choices sheet (`list_name` or `list name`).
pub fn list_column(columns: &[String]) -> Option<usize> {
    find_column(columns, "list_name")
}

/// How strongly the columns look like a choices sheet.
///
/// A label column and a name column weigh 2 each, a list-name column 1.
pub fn choice_score(columns: &[String]) -> u32 {
    let mut score = 0;
    if label_column(columns).is_some() {
        score += 2;
    }
    if name_column(columns).is_some() {
        score += 2;
    }
    if list_column(columns).is_some() {
        score += 1;
    }
    score
}

/// Infer the role of a sheet from its column names.
pub fn classify(columns: &[String]) -> SheetRole {
    if type_column(columns).is_some() && name_column(columns).is_some() {
        return SheetRole::Fields;
    }
    if choice_score(columns) >= 3 && name_column(columns).is_some() {
        return SheetRole::Choices;
    }
    let is_setting = |c: &String| SETTINGS_COLUMNS.contains(&normalize_header(c).as_str());
    if columns.iter().any(is_setting) {
        return SheetRole::Settings;
    }
    SheetRole::Generic
}

/// Column holding the logical row key for a sheet of the given role.
pub fn key_column(role: SheetRole, columns: &[String]) -> Option<usize> {
    match role {
        SheetRole::Fields | SheetRole::Choices => name_column(columns),
        SheetRole::Settings | SheetRole::Generic => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&cols(&["type", "name", "label", "relevant"])),
            SheetRole::Fields
        );
        assert_eq!(
            classify(&cols(&["list_name", "name", "label"])),
            SheetRole::Choices
        );
        assert_eq!(
            classify(&cols(&["list name", "name", "label::English (en)"])),
            SheetRole::Choices
        );
        assert_eq!(
            classify(&cols(&["form_title", "form_id"])),
            SheetRole::Settings
        );
        assert_eq!(classify(&cols(&["a", "b"])), SheetRole::Generic);
    }

    #[test]
    fn test_choice_score() {
        assert_eq!(choice_score(&cols(&["list_name", "name", "label"])), 5);
        assert_eq!(choice_score(&cols(&["name", "label"])), 4);
        assert_eq!(choice_score(&cols(&["list_name", "name"])), 3);
        assert_eq!(choice_score(&cols(&["list_name"])), 1);
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  List   Name "), "list_name");
        assert_eq!(find_column(&cols(&["a", "List Name"]), "list_name"), Some(1));
    }
}
