//! Picking the sheet an instruction is about.

use crate::document::{DocumentSummary, SheetRole, SheetSummary};

/// Result of sheet inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Sheet(String),
    Ambiguous(Vec<String>),
    Unknown,
}

/// Words that point at a sheet role.
fn role_words(role: SheetRole) -> &'static [&'static str] {
    match role {
        SheetRole::Fields => &["field", "fields", "question", "questions", "survey"],
        SheetRole::Choices => &["choice", "choices", "option", "options", "list"],
        SheetRole::Settings => &["setting", "settings"],
        SheetRole::Generic => &[],
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == ':'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn score(sheet: &SheetSummary, words: &[String], preferred: Option<SheetRole>) -> u32 {
    let mut score = 0;
    let name = sheet.name.to_lowercase();
    if words.iter().any(|w| *w == name) {
        score += 3;
    }
    for column in &sheet.columns {
        let column = column.to_lowercase();
        if words.iter().any(|w| *w == column) {
            score += 1;
        }
    }
    if role_words(sheet.role)
        .iter()
        .any(|r| words.iter().any(|w| w == r))
    {
        score += 2;
    }
    if preferred == Some(sheet.role) {
        score += 1;
    }
    score
}

/// Infer the sheet `text` refers to.
///
/// The caller's scope wins when it names a known sheet. Otherwise every sheet
/// accepted by `filter` is scored on the vocabulary of `text`; a tie for the
/// best score is ambiguous.
pub(crate) fn infer_sheet(
    summary: &DocumentSummary,
    text: &str,
    scope: Option<&str>,
    preferred: Option<SheetRole>,
    filter: impl Fn(&SheetSummary) -> bool,
) -> Target {
    if let Some(scope) = scope
        && summary.sheet(scope).is_some()
    {
        return Target::Sheet(scope.to_string());
    }

    let words = words(text);
    let mut best: Vec<&SheetSummary> = Vec::new();
    let mut best_score = 0;
    for sheet in summary.sheets.iter().filter(|s| filter(s)) {
        let s = score(sheet, &words, preferred);
        if best.is_empty() || s > best_score {
            best.clear();
            best.push(sheet);
            best_score = s;
        } else if s == best_score {
            best.push(sheet);
        }
    }

    match best.as_slice() {
        [] => Target::Unknown,
        [only] => Target::Sheet(only.name.clone()),
        many => Target::Ambiguous(many.iter().map(|s| s.name.clone()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_document;

    #[test]
    fn test_scope_wins() {
        let summary = sample_document().describe(10);
        assert_eq!(
            infer_sheet(&summary, "add a choice", Some("settings"), None, |_| true),
            Target::Sheet("settings".into())
        );
    }

    #[test]
    fn test_vocabulary_scoring() {
        let summary = sample_document().describe(10);
        assert_eq!(
            infer_sheet(&summary, "add an option", None, None, |_| true),
            Target::Sheet("choices".into())
        );
        assert_eq!(
            infer_sheet(&summary, "set the form_title", None, None, |_| true),
            Target::Sheet("settings".into())
        );
    }

    #[test]
    fn test_tie_is_ambiguous() {
        let summary = sample_document().describe(10);
        // "name" and "label" are columns of both survey and choices
        match infer_sheet(&summary, "fix name and label", None, None, |s| {
            s.role != SheetRole::Settings
        }) {
            Target::Ambiguous(candidates) => {
                assert_eq!(candidates, vec!["survey".to_string(), "choices".to_string()])
            },
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_preferred_role_breaks_silence() {
        let summary = sample_document().describe(10);
        assert_eq!(
            infer_sheet(&summary, "x", None, Some(SheetRole::Fields), |_| true),
            Target::Sheet("survey".into())
        );
    }
}
