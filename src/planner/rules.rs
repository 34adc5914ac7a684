//! Phrase rules for common edit requests.
//!
//! Each rule is a case-insensitive pattern over one step of the instruction.
//! Operands are taken literally from the step; a rule never invents a value
//! that the instruction does not contain.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use crate::document::schema::{self, normalize_header};
use crate::document::{SheetRole, SheetSummary};
use crate::mutation::{ChoiceEntry, ColumnValue, EditOperation, RowPredicate, RowSelector};

use super::target::{Target, infer_sheet};
use super::{PlanOutcome, PlanRequest, PlanningStrategy};

/// Outcome of planning one step.
enum Step {
    Op(EditOperation),
    Ambiguous(String, Vec<String>),
    NoMatch,
}

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures<'_>, &str, &PlanRequest<'_>) -> Step,
}

impl Rule {
    fn new(
        name: &'static str,
        pattern: &str,
        build: fn(&Captures<'_>, &str, &PlanRequest<'_>) -> Step,
    ) -> Self {
        let pattern = Regex::new(&format!("(?i)^{}$", pattern)).expect("Failed to build planner rule");
        Self {
            name,
            pattern,
            build,
        }
    }
}

static STEP_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:;|\r?\n|,?\s*\bthen\b)\s*").expect("Failed to build step separator")
});

static FINAL_AND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+and\s+").expect("Failed to build item separator"));

/// Checked in order; the first matching rule plans the step.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "add_choices",
            r"add\s+(?:the\s+)?(?:choices?|options?)\s+(?P<items>.+?)\s+(?:to|in|into)\s+(?:the\s+)?list\s+(?P<list>[\w\-.]+)(?:\s+(?:in|on)\s+(?:the\s+)?(?P<sheet>[\w\-]+)\s+sheet)?",
            add_choices,
        ),
        Rule::new(
            "add_row",
            r"add\s+(?:a\s+|an\s+|one\s+)?(?:new\s+)?row(?:\s+(?:with\s+)?(?:data|values))?\s*:\s*(?P<values>.+?)(?:\s+(?:to|in|into)\s+(?:the\s+)?(?P<sheet>[\w\-]+)(?P<suffix>\s+sheet)?)?",
            add_row,
        ),
        Rule::new(
            "delete_all_rows",
            r"(?:remove|delete)\s+all\s+(?:the\s+)?rows\s+(?:from|in)\s+(?:the\s+)?(?P<sheet>[\w\-]+)(?:\s+sheet)?",
            delete_all_rows,
        ),
        Rule::new(
            "delete_rows_where",
            r"(?:remove|delete)\s+(?:the\s+)?rows\s+(?:from|in)\s+(?:the\s+)?(?P<sheet>[\w\-]+)(?:\s+sheet)?\s+where\s+(?P<column>[\w:\-]+)\s+(?:is|=|==|equals)\s+(?P<value>.+)",
            delete_rows_where,
        ),
        Rule::new(
            "delete_field",
            r"(?:remove|delete)\s+(?:the\s+)?(?:field|question)\s+(?P<field>[\w\-.]+)",
            delete_field,
        ),
        Rule::new(
            "rename_field",
            r"rename\s+(?:the\s+)?(?:field|question)\s+(?P<from>[\w\-.]+)\s+to\s+(?P<to>[\w\-.]+)",
            rename_field,
        ),
        Rule::new(
            "set_cell",
            r"(?:set|change|update)\s+(?:the\s+)?(?P<column>[\w:\-]+)\s+(?:of|for)\s+(?:the\s+)?(?:(?:field|row|question|choice|option)\s+)?(?P<key>[\w\-.]+)\s+to\s+(?P<value>.+?)(?:\s+in\s+(?:the\s+)?(?P<sheet>[\w\-]+)\s+sheet)?",
            set_cell,
        ),
        Rule::new(
            "vague_field_update",
            r"(?:update|change|modify|edit)\s+(?:the\s+|a\s+)?(?:field|question)(?:\s+(?P<hint>.+))?",
            vague_field_update,
        ),
    ]
});

/// Strip whitespace, surrounding quotes and a trailing full stop.
fn clean(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_suffix('.').unwrap_or(text).trim_end();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner.trim();
        }
    }
    text
}

/// Split an instruction into its steps.
pub(crate) fn split_steps(instruction: &str) -> Vec<&str> {
    STEP_SEPARATOR
        .split(instruction)
        .map(|step| {
            let step = step.trim();
            let step = step
                .strip_suffix(" and")
                .or_else(|| step.strip_suffix(" AND"))
                .unwrap_or(step);
            let step = step.strip_prefix("and ").unwrap_or(step);
            step.trim().trim_end_matches('.').trim_end()
        })
        .filter(|step| !step.is_empty())
        .collect()
}

fn is_quoted(item: &str) -> bool {
    let item = item.trim();
    item.len() >= 2 && ['"', '\'', '`'].iter().any(|&q| item.starts_with(q) && item.ends_with(q))
}

/// Split a list of items on commas outside quotes.
///
/// A final ` and ` separates the last two items only when the list has
/// commas or one of the two is quoted, so `Black and White` stays whole.
pub(crate) fn split_items(items: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quoted: Vec<(usize, usize)> = Vec::new();
    let mut quote: Option<(char, usize)> = None;
    let mut start = 0;
    for (i, c) in items.char_indices() {
        match (c, quote) {
            ('"' | '\'' | '`', Some((q, open))) if q == c => {
                quoted.push((open, i));
                quote = None;
            },
            ('"' | '\'' | '`', None)
                if items[start..i].trim().is_empty() || items[..i].ends_with(char::is_whitespace) =>
            {
                quote = Some((c, i));
            },
            (',', None) => {
                pieces.push(&items[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }

    let last = &items[start..];
    let final_and = FINAL_AND
        .find_iter(last)
        .filter(|m| {
            !quoted
                .iter()
                .any(|&(open, close)| open < start + m.start() && start + m.end() <= close)
        })
        .last();
    match final_and {
        Some(m)
            if !pieces.is_empty()
                || is_quoted(&last[..m.start()])
                || is_quoted(&last[m.end()..]) =>
        {
            pieces.push(&last[..m.start()]);
            pieces.push(&last[m.end()..]);
        },
        _ => pieces.push(last),
    }
    pieces.into_iter().map(clean).filter(|item| !item.is_empty()).collect()
}

fn capture<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(name).map(|m| clean(m.as_str())).filter(|s| !s.is_empty())
}

fn column_name(sheet: &SheetSummary, index: Option<usize>, fallback: &str) -> String {
    index
        .and_then(|i| sheet.columns.get(i))
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

/// The field sheet that holds `field`.
fn field_sheet<'a>(request: &'a PlanRequest<'_>, field: &str) -> Result<&'a SheetSummary, Step> {
    let holders: Vec<&SheetSummary> = request
        .summary
        .sheets_with_role(SheetRole::Fields)
        .filter(|s| s.keys.iter().any(|k| k == field))
        .collect();
    match holders.as_slice() {
        [only] => return Ok(*only),
        [] => {},
        many => {
            return Err(Step::Ambiguous(
                format!("sheet holding field '{}'", field),
                many.iter().map(|s| s.name.clone()).collect(),
            ));
        },
    }
    match infer_sheet(
        request.summary,
        request.instruction,
        request.target_sheet,
        Some(SheetRole::Fields),
        |s| s.role == SheetRole::Fields,
    ) {
        Target::Sheet(name) => request.summary.sheet(&name).ok_or(Step::NoMatch),
        Target::Ambiguous(candidates) => Err(Step::Ambiguous("field sheet".to_string(), candidates)),
        Target::Unknown => Err(Step::NoMatch),
    }
}

fn add_choices(caps: &Captures<'_>, _step: &str, _request: &PlanRequest<'_>) -> Step {
    let (Some(items), Some(list)) = (capture(caps, "items"), capture(caps, "list")) else {
        return Step::NoMatch;
    };
    let entries: Vec<ChoiceEntry> = split_items(items).into_iter().map(ChoiceEntry::new).collect();
    if entries.is_empty() {
        return Step::NoMatch;
    }
    Step::Op(EditOperation::AddChoiceEntries {
        list_name: list.to_string(),
        entries,
        sheet: capture(caps, "sheet").map(str::to_string),
    })
}

fn add_row(caps: &Captures<'_>, step: &str, request: &PlanRequest<'_>) -> Step {
    let Some(values) = caps.name("values") else {
        return Step::NoMatch;
    };
    let mut values_text = values.as_str();
    let mut explicit = capture(caps, "sheet");

    // "... in France" is part of the values unless it names a sheet
    if let Some(name) = explicit
        && caps.name("suffix").is_none()
        && request.summary.sheet(name).is_none()
    {
        values_text = &step[values.start()..];
        explicit = None;
    }

    let sheet_name = match explicit {
        Some(name) => name.to_string(),
        None => match infer_sheet(
            request.summary,
            request.instruction,
            request.target_sheet,
            Some(SheetRole::Fields),
            |_| true,
        ) {
            Target::Sheet(name) => name,
            Target::Ambiguous(candidates) => return Step::Ambiguous("sheet".to_string(), candidates),
            Target::Unknown => return Step::NoMatch,
        },
    };

    let raw: Vec<&str> = values_text.split(',').map(clean).collect();
    let columns: Option<&[String]> = request
        .summary
        .sheet(&sheet_name)
        .map(|s| s.columns.as_slice());
    if let Some(columns) = columns
        && raw.len() > columns.len()
    {
        return Step::NoMatch;
    }

    let values: Vec<ColumnValue> = raw
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_empty())
        .map(|(i, v)| {
            let column = columns
                .and_then(|c| c.get(i))
                .cloned()
                .unwrap_or_else(|| format!("col_{}", i + 1));
            ColumnValue::new(column, *v)
        })
        .collect();
    if values.is_empty() {
        return Step::NoMatch;
    }
    Step::Op(EditOperation::AddRow {
        sheet: sheet_name,
        values,
    })
}

fn delete_all_rows(caps: &Captures<'_>, _step: &str, _request: &PlanRequest<'_>) -> Step {
    match capture(caps, "sheet") {
        Some(sheet) => Step::Op(EditOperation::DeleteRows {
            sheet: sheet.to_string(),
            predicate: RowPredicate::All,
        }),
        None => Step::NoMatch,
    }
}

fn delete_rows_where(caps: &Captures<'_>, _step: &str, _request: &PlanRequest<'_>) -> Step {
    let (Some(sheet), Some(column), Some(value)) = (
        capture(caps, "sheet"),
        capture(caps, "column"),
        capture(caps, "value"),
    ) else {
        return Step::NoMatch;
    };
    Step::Op(EditOperation::DeleteRows {
        sheet: sheet.to_string(),
        predicate: RowPredicate::equals(column, value),
    })
}

fn delete_field(caps: &Captures<'_>, _step: &str, request: &PlanRequest<'_>) -> Step {
    let Some(field) = capture(caps, "field") else {
        return Step::NoMatch;
    };
    // No sheet to pin it to: the engine searches every field sheet
    let sheet = match field_sheet(request, field) {
        Ok(sheet) => Some(sheet.name.clone()),
        Err(Step::NoMatch) => None,
        Err(step) => return step,
    };
    Step::Op(EditOperation::RemoveField {
        name: field.to_string(),
        sheet,
    })
}

fn rename_field(caps: &Captures<'_>, _step: &str, _request: &PlanRequest<'_>) -> Step {
    match (capture(caps, "from"), capture(caps, "to")) {
        (Some(from), Some(to)) => Step::Op(EditOperation::RenameField {
            from: from.to_string(),
            to: to.to_string(),
            sheet: None,
        }),
        _ => Step::NoMatch,
    }
}

fn set_cell(caps: &Captures<'_>, _step: &str, request: &PlanRequest<'_>) -> Step {
    let (Some(column), Some(key), Some(value)) = (
        capture(caps, "column"),
        capture(caps, "key"),
        capture(caps, "value"),
    ) else {
        return Step::NoMatch;
    };

    let sheet_name = match capture(caps, "sheet") {
        Some(name) => name.to_string(),
        None => {
            let holders: Vec<&SheetSummary> = request
                .summary
                .sheets
                .iter()
                .filter(|s| s.has_column(column) && s.keys.iter().any(|k| k == key))
                .collect();
            match (request.target_sheet, holders.as_slice()) {
                (None, [only]) => only.name.clone(),
                _ => match infer_sheet(
                    request.summary,
                    request.instruction,
                    request.target_sheet,
                    Some(SheetRole::Fields),
                    |s| s.has_column(column),
                ) {
                    Target::Sheet(name) => name,
                    Target::Ambiguous(candidates) => {
                        return Step::Ambiguous("sheet".to_string(), candidates);
                    },
                    Target::Unknown => return Step::NoMatch,
                },
            }
        },
    };

    let key_column = match request.summary.sheet(&sheet_name) {
        Some(sheet) => match schema::key_column(sheet.role, &sheet.columns) {
            Some(i) => column_name(sheet, Some(i), "name"),
            None => return Step::NoMatch,
        },
        None => "name".to_string(),
    };
    Step::Op(EditOperation::UpdateCell {
        sheet: sheet_name,
        selector: RowSelector::Where(RowPredicate::equals(key_column, key)),
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn vague_field_update(caps: &Captures<'_>, _step: &str, request: &PlanRequest<'_>) -> Step {
    let hint = capture(caps, "hint").map(normalize_header);
    let candidates: Vec<String> = request
        .summary
        .sheets_with_role(SheetRole::Fields)
        .flat_map(|s| s.keys.iter())
        .filter(|key| match &hint {
            Some(hint) => {
                let key = key.to_lowercase();
                key.contains(hint.as_str()) || hint.contains(key.as_str())
            },
            None => true,
        })
        .cloned()
        .collect();
    if candidates.len() > 1 {
        Step::Ambiguous("field".to_string(), candidates)
    } else {
        Step::NoMatch
    }
}

fn plan_step(step: &str, request: &PlanRequest<'_>) -> Step {
    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(step) {
            trace!(rule = rule.name, step, "planner rule matched");
            return (rule.build)(&caps, step, request);
        }
    }
    Step::NoMatch
}

/// Deterministic planning from phrase rules.
///
/// Every step of the instruction must match a rule; otherwise the whole
/// instruction is deferred.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedStrategy;

impl PlanningStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn plan(&self, request: &PlanRequest<'_>) -> PlanOutcome {
        let steps = split_steps(request.instruction);
        if steps.is_empty() {
            return PlanOutcome::Defer;
        }

        let mut operations = Vec::with_capacity(steps.len());
        for step in steps {
            match plan_step(step, request) {
                Step::Op(op) => operations.push(op),
                Step::Ambiguous(subject, candidates) => {
                    return PlanOutcome::Ambiguous {
                        subject,
                        candidates,
                    };
                },
                Step::NoMatch => {
                    trace!(step, "no planner rule for step");
                    return PlanOutcome::Defer;
                },
            }
        }
        PlanOutcome::Plan(operations)
    }
}
