//! The document root.

use std::sync::Arc;

use crate::common::id::DocumentId;

use super::highlight::{Highlights, StyleAnchor};
use super::sheet::Sheet;
use super::summary::DocumentSummary;
use super::tree::Span;
use super::writer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Scaffolding copied from the source as is
    Verbatim(Span),
    /// Index into `Document::sheets`
    Sheet(usize),
}

/// A parsed markup document: its sheets plus every byte of scaffolding
/// around them.
///
/// Cloning is cheap for the source text, which is shared; the sheets are
/// copied, so a clone can be edited without touching the original.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) id: DocumentId,
    pub(crate) source: Arc<str>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) sheets: Vec<Sheet>,
    /// Where highlight style definitions go, if anywhere
    pub(crate) styles: Option<StyleAnchor>,
    pub(crate) highlights: Highlights,
}

impl Document {
    #[inline]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The markup this document was parsed from.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    pub(crate) fn sheet_mut(&mut self, index: usize) -> &mut Sheet {
        &mut self.sheets[index]
    }

    /// Whether any sheet differs from the source markup.
    pub fn is_modified(&self) -> bool {
        self.sheets.iter().any(|s| s.dirty)
    }

    /// Structural summary with at most `key_limit` keys per sheet.
    #[inline]
    pub fn describe(&self, key_limit: usize) -> DocumentSummary {
        DocumentSummary::of(self, key_limit)
    }

    /// Serialize back to markup.
    #[inline]
    pub fn to_markup(&self) -> String {
        writer::serialize(self)
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_markup().into_bytes()
    }
}

impl PartialEq for Document {
    /// Documents are equal when they serialize to the same markup.
    fn eq(&self, other: &Self) -> bool {
        if !self.is_modified() && !other.is_modified() {
            return self.source == other.source;
        }
        self.to_markup() == other.to_markup()
    }
}
