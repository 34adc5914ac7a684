//! `${field}` references inside cell text, and choice lists named by field
//! types.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::schema::normalize_header;

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{[^}]*\}").expect("Failed to build reference pattern"));

static SELECT_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:select_one|select_multiple)\s+(\S+)").expect("Failed to build select pattern")
});

/// Columns whose cells hold expressions over other fields.
const EXPRESSION_COLUMNS: &[&str] = &[
    "relevant",
    "constraint",
    "calculation",
    "choice_filter",
    "required",
    "repeat_count",
    "default",
    "trigger",
    "readonly",
    "parameters",
];

#[inline]
fn reference(name: &str) -> String {
    format!("${{{}}}", name)
}

/// Replace every `${from}` in `text` with `${to}`.
///
/// Returns `None` when `text` has no such reference.
pub(crate) fn rewrite(text: &str, from: &str, to: &str) -> Option<String> {
    let needle = reference(from);
    if !text.contains(&needle) {
        return None;
    }
    Some(text.replace(&needle, &reference(to)))
}

/// Whether `text` holds a `${name}` reference.
#[inline]
pub(crate) fn mentions(text: &str, name: &str) -> bool {
    text.contains(&reference(name))
}

/// Choice list named by a `select_one`/`select_multiple` field type.
pub(crate) fn select_list(field_type: &str) -> Option<&str> {
    SELECT_TYPE
        .captures(field_type.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Whether cells of `column` are worth scanning for bare references.
pub(crate) fn is_expression_column(column: &str) -> bool {
    EXPRESSION_COLUMNS.contains(&normalize_header(column).as_str())
}

/// Matches `name` as a whole word outside of `${}` references.
pub(crate) struct BareWord {
    pattern: Regex,
}

impl BareWord {
    pub fn new(name: &str) -> Option<Self> {
        let pattern = Regex::new(&format!(r"(?:^|[^\w.\-]){}(?:$|[^\w.\-])", regex::escape(name)))
            .ok()?;
        Some(Self { pattern })
    }

    pub fn occurs_in(&self, text: &str) -> bool {
        if !self.pattern.is_match(text) {
            return false;
        }
        let stripped = REFERENCE.replace_all(text, " ");
        self.pattern.is_match(&stripped)
    }
}
