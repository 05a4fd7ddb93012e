//! Indentation tracking for definition blocks.
//!
//! Help output marks structure almost entirely through indentation: entries
//! start at a common column, their descriptions wrap to a deeper column and
//! value lists nest deeper still. [`IndentTracker`] keeps that context as a
//! small state machine so that each line can be given a [`LineRole`].

/// Where the tracker is within the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentState {
    AtBaseline,
    InContinuation,
    InNestedBlock,
}

/// What a line means for the block being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// Starts a new flag or positional definition.
    Entry,
    /// Continues the description of the current entry.
    Continuation,
    /// A value row nested under the current entry (`  fast   quick mode`).
    NestedItem,
    EndOfBlock,
}

/// Lexical facts about a line, gathered by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineShape {
    pub indent: usize,
    /// Lexes as a flag or positional definition.
    pub entry: bool,
    /// Lexes as a `value  description` row.
    pub nested: bool,
    pub header: bool,
    /// The previous line filled the wrap width, so this one continues it.
    pub wrapped: bool,
}

#[derive(Debug, Clone)]
pub struct IndentTracker {
    baseline: usize,
    min_indent: usize,
    baseline_continuation: bool,
    /// Columns where flag spellings started on entry rows of this block.
    entry_columns: Vec<usize>,
    description_column: Option<usize>,
    nested: Vec<usize>,
    state: IndentState,
}

impl IndentTracker {
    /// Starts tracking at the column of a block's first entry.
    ///
    /// Lines at the baseline that are not entries continue the previous
    /// description only when `baseline_continuation` is set; otherwise they
    /// end the block.
    pub fn new(baseline: usize, min_indent: usize, baseline_continuation: bool) -> Self {
        Self {
            baseline,
            min_indent,
            baseline_continuation,
            entry_columns: vec![baseline],
            description_column: None,
            nested: Vec::new(),
            state: IndentState::AtBaseline,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> IndentState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn baseline(&self) -> usize {
        self.baseline
    }

    /// Column where the current entry's description starts, once known.
    pub fn set_description_column(&mut self, column: Option<usize>) {
        self.description_column = column;
    }

    pub fn description_column(&self) -> Option<usize> {
        self.description_column
    }

    /// Records the columns of the spellings on an accepted entry row.
    ///
    /// GNU-style help aligns long-only flags under the long spelling of the
    /// rows around them (`  -a, --all` then `      --author`); such rows
    /// are entries even though they sit deeper than the baseline.
    pub fn add_entry_columns(&mut self, columns: impl IntoIterator<Item = usize>) {
        for column in columns {
            if !self.entry_columns.contains(&column) {
                self.entry_columns.push(column);
            }
        }
    }

    /// Assigns a role to the next line and advances the state.
    ///
    /// A new entry must start at or left of the baseline, or at a column
    /// where a spelling already started in this block. Anything deeper
    /// continues the open entry, however much it looks like a flag.
    pub fn classify(&mut self, shape: LineShape) -> LineRole {
        if shape.header && shape.indent <= self.baseline {
            return LineRole::EndOfBlock;
        }
        if shape.wrapped && !(shape.entry && shape.indent <= self.baseline) {
            return self.continuation();
        }

        if shape.indent > self.baseline {
            if shape.nested {
                while self.nested.last().is_some_and(|&depth| depth > shape.indent) {
                    self.nested.pop();
                }
                if self.nested.last() != Some(&shape.indent) {
                    self.nested.push(shape.indent);
                }
                self.state = IndentState::InNestedBlock;
                return LineRole::NestedItem;
            }
            let before_description = self
                .description_column
                .is_none_or(|column| shape.indent < column);
            let aligned = self.entry_columns.contains(&shape.indent);
            if shape.entry && aligned && before_description && self.nested.is_empty() {
                return self.entry();
            }
            return self.continuation();
        }

        if shape.indent == self.baseline {
            if shape.entry {
                return self.entry();
            }
            if self.baseline_continuation {
                return self.continuation();
            }
            return LineRole::EndOfBlock;
        }

        if shape.entry && shape.indent >= self.min_indent {
            self.baseline = shape.indent;
            self.add_entry_columns([shape.indent]);
            return self.entry();
        }
        LineRole::EndOfBlock
    }

    fn entry(&mut self) -> LineRole {
        self.nested.clear();
        self.description_column = None;
        self.state = IndentState::AtBaseline;
        LineRole::Entry
    }

    fn continuation(&mut self) -> LineRole {
        if self.state == IndentState::InNestedBlock {
            return LineRole::Continuation;
        }
        self.state = IndentState::InContinuation;
        LineRole::Continuation
    }
}
