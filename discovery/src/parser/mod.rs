//! Help output parser.
//!
//! Help text has no single grammar. This module runs several independent
//! grammar branches over the same normalized text:
//!
//! - **section**: blocks under headers such as `Options:`,
//!   `positional arguments:` or `Command: index   index sequences`
//! - **gnu**: any indented two-column block
//! - **flush**: flags printed at column zero
//! - **usage**: `usage:` synopses, also merged into every other branch
//!
//! Each branch yields one [`ParseCandidate`]; the best is chosen by
//! [`select::select_best`] and turned into a [`Command`] with inferred types.
//!
//! The primary entry point is [`HelpParser::new`] followed by
//! [`HelpParser::parse`], but most consumers should use the higher-level
//! [`parse_help`](crate::parse_help) function instead.

mod ast;
mod block;
mod indent;
mod lexer;
mod normalize;
mod select;
mod strategies;

use std::sync::LazyLock;

use helpscope_core::{Command, Flag, Positional, annotate_types};
use regex::Regex;
use tracing::{debug, warn};

pub use ast::{ParseCandidate, SourceSpan};
pub use indent::{IndentTracker, LineRole, LineShape};
pub use normalize::normalize_help_output;
pub use select::{compare_candidates, select_best};
pub use strategies::{ParserStrategy, strategies};

use strategies::usage::{self, UsageParse};

/// Default guard against pathological help output.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// One line of normalized help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Zero-based line number in the normalized text.
    pub index: usize,
    /// Leading spaces after tab expansion.
    pub indent: usize,
    /// Display width of the whole line.
    pub width: usize,
    /// The line without its indentation.
    pub text: String,
}

/// Hints that steer a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Invocation tokens, used to strip the program name from usage lines.
    pub command: Vec<String>,
    /// Flag that produced the text; moved to the help slot when found.
    pub help_flag: Option<String>,
    /// Terminal width the text was wrapped at, if known.
    pub wrap_width: Option<usize>,
    /// Longer texts are not parsed at all.
    pub max_lines: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            help_flag: None,
            wrap_width: None,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl ParseOptions {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_help_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        self.help_flag = (!flag.is_empty()).then_some(flag);
        self
    }

    pub fn with_wrap_width(mut self, width: usize) -> Self {
        self.wrap_width = Some(width);
        self
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }
}

static HEADER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][\w /()'-]*:$").expect("static regex must compile")
});

/// Parser state for one help text.
#[derive(Debug)]
pub struct HelpParser {
    options: ParseOptions,
    raw: String,
    lines: Vec<Line>,
    usage: UsageParse,
}

impl HelpParser {
    pub fn new(options: ParseOptions, help_text: &str) -> Self {
        let normalized = normalize_help_output(help_text);
        let lines = normalize::to_lines(&normalized);
        let usage = if lines.len() > options.max_lines {
            UsageParse::default()
        } else {
            usage::parse_usage(&lines, &options.command)
        };
        Self {
            options,
            raw: help_text.to_string(),
            lines,
            usage,
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub(crate) fn usage(&self) -> &UsageParse {
        &self.usage
    }

    /// Whether a line reads as a section header (`Options:`, `DESCRIPTION`).
    pub fn is_header(&self, line: &Line) -> bool {
        let text = line.text.as_str();
        if text.contains("  ") {
            return false;
        }
        if HEADER_LINE_RE.is_match(text) && text.split_whitespace().count() <= 4 {
            return true;
        }
        line.indent == 0
            && text.chars().filter(|ch| ch.is_alphabetic()).count() >= 2
            && text.chars().all(|ch| ch.is_ascii_uppercase() || ch == ' ')
    }

    /// Runs every grammar branch and returns their candidates.
    ///
    /// Block branches are combined with the usage lines: flags are merged
    /// and the usage positionals stand in when the block found none.
    pub fn candidates(&self) -> Vec<ParseCandidate> {
        if self.lines.len() > self.options.max_lines {
            return Vec::new();
        }
        strategies()
            .iter()
            .filter_map(|strategy| {
                let candidate = strategy.parse(self)?;
                if strategy.name() == usage::NAME {
                    Some(candidate)
                } else {
                    Some(self.with_usage(candidate))
                }
            })
            .collect()
    }

    fn with_usage(&self, candidate: ParseCandidate) -> ParseCandidate {
        if self.usage.is_empty() {
            return candidate;
        }
        let flags = Flag::combine(candidate.flags, self.usage.flags.clone());
        let positionals = if candidate.positionals.is_empty() {
            self.usage.positionals.clone()
        } else {
            candidate.positionals
        };
        let mut lines = candidate.lines;
        lines.extend(&self.usage.lines);
        let mut combined = ParseCandidate::new(candidate.strategy, candidate.priority, flags, positionals, &lines);
        combined.usage = self.usage.instances.clone();
        combined
    }

    /// Parses the text into a [`Command`] with resolved types.
    ///
    /// Text that yields nothing, or that exceeds
    /// [`max_lines`](ParseOptions::max_lines), produces an empty command
    /// rather than an error.
    pub fn parse(&self) -> Command {
        if self.lines.len() > self.options.max_lines {
            warn!(
                command = ?self.options.command,
                lines = self.lines.len(),
                max_lines = self.options.max_lines,
                "help text exceeds line limit; not parsing"
            );
            return self.build(Vec::new(), Vec::new());
        }

        let Some(best) = select_best(self.candidates()) else {
            debug!(command = ?self.options.command, "no grammar branch matched");
            let mut command = self.build(Vec::new(), Vec::new());
            command.usage = self.usage.instances.clone();
            return command;
        };

        let mut command = self.build(best.flags, best.positionals);
        command.usage = best.usage;
        annotate_types(&mut command);
        command
    }

    fn build(&self, flags: Vec<Flag>, positionals: Vec<Positional>) -> Command {
        let positionals = positionals
            .into_iter()
            .enumerate()
            .map(|(position, positional)| Positional { position, ..positional })
            .collect();
        let mut command = Command::from_parts(self.options.command.clone(), positionals, flags)
            .with_help_text(self.raw.clone())
            .with_generated_using(crate::GENERATED_USING);

        if command.help_flag.is_none() {
            if let Some(hint) = self.options.help_flag.as_deref() {
                if let Some(found) = command
                    .named
                    .iter()
                    .position(|flag| flag.args.is_empty() && flag.has_synonym(hint))
                {
                    command.help_flag = Some(command.named.remove(found));
                }
            }
        }
        command
    }
}
