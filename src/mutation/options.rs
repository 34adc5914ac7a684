/// Options controlling how edit operations are applied.
///
/// # Examples
///
/// ```rust
/// use formwright::mutation::EditOptions;
///
/// // Create with defaults
/// let options = EditOptions::default();
///
/// // Or customize
/// let options = EditOptions::new()
///     .with_strict_rename(true)
///     .with_verify_round_trip(false)
///     .with_highlight_changes(true);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditOptions {
    /// Fail a rename that leaves bare, unrewritten mentions of the old name
    pub strict_rename: bool,
    /// Re-serialize and re-parse after every apply
    pub verify_round_trip: bool,
    /// Style added rows and modified cells so the changes stand out
    pub highlight_changes: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            strict_rename: false,
            verify_round_trip: true,
            highlight_changes: false,
        }
    }
}

impl EditOptions {
    /// Create a new `EditOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether bare references left by a rename fail the operation.
    ///
    /// When disabled, they are reported as warnings instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use formwright::mutation::EditOptions;
    ///
    /// let options = EditOptions::new().with_strict_rename(true);
    /// assert!(options.strict_rename);
    /// ```
    #[inline]
    pub fn with_strict_rename(mut self, strict: bool) -> Self {
        self.strict_rename = strict;
        self
    }

    /// Set whether each apply verifies that the result still parses to the
    /// same structure.
    #[inline]
    pub fn with_verify_round_trip(mut self, verify: bool) -> Self {
        self.verify_round_trip = verify;
        self
    }

    /// Set whether edits are highlighted.
    ///
    /// Rows an edit adds get the `AIAdded` style and cells it changes the
    /// `AIModified` style. The workbook gains the two style definitions if it
    /// lacks them. Off by default, which keeps untouched bytes identical.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use formwright::mutation::EditOptions;
    ///
    /// let options = EditOptions::new().with_highlight_changes(true);
    /// assert!(options.highlight_changes);
    /// ```
    #[inline]
    pub fn with_highlight_changes(mut self, highlight: bool) -> Self {
        self.highlight_changes = highlight;
        self
    }
}
