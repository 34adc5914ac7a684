//! Change highlighting.
//!
//! Added rows and modified cells can be marked with two style IDs. The
//! matching `Style` definitions are written into the workbook's styles
//! container when the document is serialized, unless it already has them.

use super::model::Document;
use super::tree::{Node, SpanTree};

/// Style ID put on rows that did not exist in the source.
pub const ADDED_STYLE: &str = "AIAdded";
/// Style ID put on cells whose value changed.
pub const MODIFIED_STYLE: &str = "AIModified";

const ADDED_COLOR: &str = "#FFC7CE";
const MODIFIED_COLOR: &str = "#FFD966";

/// Which highlight styles the document refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Highlights {
    pub added: bool,
    pub modified: bool,
}

impl Highlights {
    #[inline]
    pub fn any(&self) -> bool {
        self.added || self.modified
    }
}

/// Where missing style definitions go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StyleAnchor {
    /// Byte offset the definitions are inserted at
    pub at: usize,
    /// Style IDs the source already defines
    pub defined: Vec<String>,
    /// No styles container exists; one is written around the definitions
    pub wrap: bool,
    pub element_prefix: String,
    pub attr_prefix: String,
    /// Whitespace in front of each definition
    pub indent: String,
}

fn prefix_of(qname: &str) -> String {
    qname
        .split_once(':')
        .map_or_else(String::new, |(p, _)| format!("{}:", p))
}

/// Blank text right before element `child` of `parent`.
fn indent_before(tree: &SpanTree, source: &str, parent: usize, child: usize) -> String {
    let siblings = &tree.element(parent).children;
    let Some(pos) = siblings.iter().position(|n| *n == Node::Element(child)) else {
        return String::new();
    };
    match pos.checked_sub(1).map(|p| siblings[p]) {
        Some(Node::Text(span)) if span.slice(source).trim().is_empty() => {
            let text = span.slice(source);
            // Only the last line break and what follows it
            text.rfind('\n').map_or(text, |i| &text[i..]).to_string()
        },
        _ => String::new(),
    }
}

impl StyleAnchor {
    /// Find the styles container under the root, or the top-level element
    /// holding the first table when there is none.
    pub fn locate(
        tree: &SpanTree,
        source: &str,
        first_table: Option<usize>,
        default_attr_prefix: &str,
    ) -> Option<Self> {
        let root = tree.root;
        if let Some(styles) = tree
            .element_children(root)
            .find(|&c| tree.element(c).local == "Styles")
        {
            let el = tree.element(styles);
            el.close?;
            let children: Vec<usize> = tree
                .element_children(styles)
                .filter(|&c| tree.element(c).local == "Style")
                .collect();
            let defined = children
                .iter()
                .filter_map(|&c| tree.element(c).attribute("ID"))
                .map(|a| a.value.clone())
                .collect();
            let attr_prefix = children
                .iter()
                .find_map(|&c| tree.element(c).attribute("ID"))
                .map_or_else(|| default_attr_prefix.to_string(), |a| prefix_of(&a.qname));
            let (at, indent) = match children.last() {
                Some(&last) => (
                    tree.element(last).span().end,
                    indent_before(tree, source, styles, last),
                ),
                None => (el.open.end, String::new()),
            };
            return Some(Self {
                at,
                defined,
                wrap: false,
                element_prefix: prefix_of(&el.qname),
                attr_prefix,
                indent,
            });
        }

        let mut top = first_table?;
        while let Some(parent) = tree.element(top).parent {
            if parent == root {
                break;
            }
            top = parent;
        }
        let top_el = tree.element(top);
        if top_el.parent != Some(root) || top_el.local != "Worksheet" {
            return None;
        }
        let attr_prefix = top_el
            .attribute("Name")
            .map_or_else(|| default_attr_prefix.to_string(), |a| prefix_of(&a.qname));
        Some(Self {
            at: top_el.open.start,
            defined: Vec::new(),
            wrap: true,
            element_prefix: prefix_of(&top_el.qname),
            attr_prefix,
            indent: indent_before(tree, source, root, top),
        })
    }

    /// Write the definitions `used` needs and the source lacks.
    pub fn write(&self, out: &mut String, used: Highlights) {
        let missing: Vec<(&str, &str)> = [
            (ADDED_STYLE, ADDED_COLOR, used.added),
            (MODIFIED_STYLE, MODIFIED_COLOR, used.modified),
        ]
        .into_iter()
        .filter(|(id, _, needed)| *needed && !self.defined.iter().any(|d| d == id))
        .map(|(id, color, _)| (id, color))
        .collect();
        if missing.is_empty() {
            return;
        }

        let p = self.element_prefix.as_str();
        let a = self.attr_prefix.as_str();
        let inner = if self.wrap {
            format!("{} ", self.indent)
        } else {
            self.indent.clone()
        };
        if self.wrap {
            out.push('<');
            out.push_str(p);
            out.push_str("Styles>");
        }
        for (id, color) in missing {
            out.push_str(&inner);
            out.push_str(&format!(
                r#"<{p}Style {a}ID="{id}"><{p}Interior {a}Color="{color}" {a}Pattern="Solid"/></{p}Style>"#
            ));
        }
        if self.wrap {
            out.push_str(&self.indent);
            out.push_str("</");
            out.push_str(p);
            out.push_str("Styles>");
            out.push_str(&self.indent);
        }
    }
}

/// Put the highlight styles on every added row and changed cell.
pub(crate) fn highlight_changes(doc: &mut Document) {
    let mut used = Highlights::default();
    for sheet in doc.sheets.iter_mut().filter(|s| s.dirty) {
        for row in &mut sheet.rows {
            if row.origin.is_none() {
                row.style.get_or_insert_with(|| ADDED_STYLE.to_string());
                used.added = true;
            } else if row.dirty {
                for cell in row.cells.iter_mut().filter(|c| c.dirty) {
                    cell.set_style(MODIFIED_STYLE);
                    used.modified = true;
                }
            }
        }
    }
    doc.highlights.added |= used.added;
    doc.highlights.modified |= used.modified;
}
