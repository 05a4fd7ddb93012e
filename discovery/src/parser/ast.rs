//! Intermediate parse candidates carrying evidence metadata.

use helpscope_core::{Flag, Positional, UsageInstance};

/// Source line range within the normalized help output, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub line_start: usize,
    pub line_end: usize,
}

impl SourceSpan {
    pub const fn single(line: usize) -> Self {
        Self {
            line_start: line,
            line_end: line,
        }
    }

    pub const fn unknown() -> Self {
        Self {
            line_start: usize::MAX,
            line_end: usize::MAX,
        }
    }

    pub const fn is_unknown(&self) -> bool {
        self.line_start == usize::MAX && self.line_end == usize::MAX
    }

    /// Smallest span covering every index in `lines`.
    pub fn covering(lines: &[usize]) -> Self {
        match (lines.iter().min(), lines.iter().max()) {
            (Some(&start), Some(&end)) => Self {
                line_start: start,
                line_end: end,
            },
            _ => Self::unknown(),
        }
    }
}

/// One complete reading of a help text produced by a grammar branch.
///
/// Candidates are compared by [`select_best`](super::select::select_best);
/// the evidence fields exist for that comparison and for debug logging.
#[derive(Debug, Clone)]
pub struct ParseCandidate {
    pub strategy: &'static str,
    /// Lower wins ties between otherwise equal candidates.
    pub priority: u8,
    pub flags: Vec<Flag>,
    pub positionals: Vec<Positional>,
    pub usage: Vec<UsageInstance>,
    /// Sorted indices of the lines this reading consumed.
    pub lines: Vec<usize>,
    pub span: SourceSpan,
    /// Longest run of consecutive lines consumed by this reading.
    pub longest_run: usize,
    pub matched_lines: usize,
}

impl ParseCandidate {
    pub fn new(
        strategy: &'static str,
        priority: u8,
        flags: Vec<Flag>,
        positionals: Vec<Positional>,
        lines: &[usize],
    ) -> Self {
        let mut lines = lines.to_vec();
        lines.sort_unstable();
        lines.dedup();
        Self {
            strategy,
            priority,
            flags,
            positionals,
            usage: Vec::new(),
            span: SourceSpan::covering(&lines),
            longest_run: longest_run(&lines),
            matched_lines: lines.len(),
            lines,
        }
    }

    /// Number of arguments this reading found.
    pub fn arg_count(&self) -> usize {
        self.flags.len() + self.positionals.len()
    }
}

/// Length of the longest run of consecutive values in sorted `lines`.
pub fn longest_run(lines: &[usize]) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut previous: Option<usize> = None;
    for &line in lines {
        current = match previous {
            Some(prev) if prev + 1 == line => current + 1,
            Some(prev) if prev == line => current,
            _ => 1,
        };
        best = best.max(current);
        previous = Some(line);
    }
    best
}
