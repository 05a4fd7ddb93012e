//! Flag and positional argument definitions.
//!
//! A [`Flag`] is identified by one or more [`FlagSynonym`] spellings, each of
//! which carries the literal argument pattern ([`FlagArg`]) seen next to it in
//! the help text. A [`Positional`] is identified by its ordinal position.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::CliType;
use crate::infer;

/// Literal argument-count pattern attached to a flag spelling.
///
/// # Examples
///
/// ```
/// use helpscope_core::FlagArg;
///
/// assert_eq!(FlagArg::Empty.num_args(), 0);
/// assert_eq!(FlagArg::simple("FILE").num_args(), 1);
/// assert!(FlagArg::repeat("FILE").is_variadic());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlagArg {
    /// No value (`-v`).
    #[default]
    Empty,
    /// Exactly one value (`-o FILE`).
    Simple { name: String },
    /// Values that may be omitted (`--color[=WHEN]`, `-I FLOAT[,FLOAT[,INT]]`).
    Optional {
        names: Vec<String>,
        separator: String,
    },
    /// One value that may be given repeatedly (`-i FILE...`).
    Repeat { name: String },
    /// One value from a fixed set (`--format {json,yaml}`).
    Choice { choices: Vec<String> },
    /// Several required values (`--range START END`).
    Fixed { names: Vec<String> },
}

impl FlagArg {
    pub fn simple(name: impl Into<String>) -> Self {
        Self::Simple { name: name.into() }
    }

    pub fn repeat(name: impl Into<String>) -> Self {
        Self::Repeat { name: name.into() }
    }

    pub fn choice<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for choice in choices {
            let choice = choice.into();
            if !choice.is_empty() && !unique.contains(&choice) {
                unique.push(choice);
            }
        }
        Self::Choice { choices: unique }
    }

    /// Number of value slots this pattern declares.
    pub fn num_args(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Simple { .. } | Self::Repeat { .. } | Self::Choice { .. } => 1,
            Self::Optional { names, .. } | Self::Fixed { names } => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, Self::Repeat { .. })
    }

    /// Placeholder names mentioned by the pattern.
    pub fn placeholders(&self) -> Vec<&str> {
        match self {
            Self::Empty | Self::Choice { .. } => Vec::new(),
            Self::Simple { name } | Self::Repeat { name } => vec![name.as_str()],
            Self::Optional { names, .. } | Self::Fixed { names } => {
                names.iter().map(String::as_str).collect()
            }
        }
    }

    /// Ordering key for picking the more specific of two patterns.
    ///
    /// Value-taking beats empty, fixed beats variadic, then the inferred
    /// value type decides. Ties fall back to the structural order so the
    /// choice is total and deterministic.
    pub(crate) fn specificity(&self) -> (u8, u8, u8) {
        let takes_value = u8::from(!self.is_empty());
        let fixed = u8::from(!self.is_variadic());
        let type_rank = infer::infer_arg_type(self, None, None).specificity();
        (takes_value, fixed, type_rank)
    }

    /// Returns the more specific of two patterns.
    pub fn most_specific<'a>(&'a self, other: &'a FlagArg) -> &'a FlagArg {
        match self
            .specificity()
            .cmp(&other.specificity())
            .then_with(|| self.cmp(other))
        {
            Ordering::Less => other,
            _ => self,
        }
    }
}

/// One spelling of a flag together with the pattern seen next to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagSynonym {
    pub name: String,
    #[serde(default)]
    pub args: FlagArg,
}

impl FlagSynonym {
    pub fn new(name: impl Into<String>, args: FlagArg) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, FlagArg::Empty)
    }
}

/// A named option, possibly spelled several ways.
///
/// Synonyms are kept in canonical order (shortest first, then lexical) and
/// `args` always holds the most specific pattern among them.
///
/// # Examples
///
/// ```
/// use helpscope_core::{CliType, Flag, FlagArg, FlagSynonym};
///
/// let verbose = Flag::new(vec![
///     FlagSynonym::bare("--verbose"),
///     FlagSynonym::bare("-v"),
/// ])
/// .with_description("Enable verbose output");
///
/// assert_eq!(verbose.synonym_names(), vec!["-v", "--verbose"]);
/// assert_eq!(verbose.args, FlagArg::Empty);
/// assert!(verbose.optional);
/// assert_eq!(verbose.resolved_type(), CliType::Boolean);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub synonyms: Vec<FlagSynonym>,
    #[serde(default)]
    pub args: FlagArg,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_optional")]
    pub optional: bool,
    /// Resolved value type, filled by [`annotate_types`](crate::annotate_types).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub cli_type: Option<CliType>,
    /// Machine-safe identifier, filled by [`assign_identifiers`](crate::assign_identifiers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

fn default_optional() -> bool {
    true
}

impl Flag {
    /// Builds an optional flag from its spellings.
    pub fn new(synonyms: Vec<FlagSynonym>) -> Self {
        let synonyms = canonical_synonyms(synonyms);
        let args = resolve_args(&synonyms);
        Self {
            synonyms,
            args,
            description: None,
            optional: true,
            cli_type: None,
            identifier: None,
        }
    }

    /// Builds a value-less flag from bare spellings.
    pub fn switch(names: &[&str]) -> Self {
        Self::new(names.iter().map(|name| FlagSynonym::bare(*name)).collect())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn synonym_names(&self) -> Vec<&str> {
        self.synonyms.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn has_synonym(&self, name: &str) -> bool {
        self.synonyms.iter().any(|s| s.name == name)
    }

    /// The longest spelling, usually the most descriptive one.
    pub fn longest_synonym(&self) -> &str {
        self.synonyms
            .iter()
            .map(|s| s.name.as_str())
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .unwrap_or_default()
    }

    pub fn shortest_synonym(&self) -> &str {
        self.synonyms
            .first()
            .map(|s| s.name.as_str())
            .unwrap_or_default()
    }

    /// Human-readable name of the flag.
    pub fn full_name(&self) -> String {
        self.longest_synonym().to_string()
    }

    /// Value type of the flag, using the stored annotation when present.
    pub fn resolved_type(&self) -> CliType {
        self.cli_type
            .clone()
            .unwrap_or_else(|| infer::infer_flag_type(self))
    }

    pub(crate) fn refresh_args(&mut self) {
        self.synonyms = canonical_synonyms(std::mem::take(&mut self.synonyms));
        let resolved = resolve_args(&self.synonyms);
        let args = resolved.most_specific(&self.args).clone();
        self.args = args;
    }

    /// Replaces the argument pattern on every value-taking spelling.
    pub fn set_args(&mut self, args: FlagArg) {
        for synonym in &mut self.synonyms {
            if !synonym.args.is_empty() || self.args.is_empty() {
                synonym.args = args.clone();
            }
        }
        self.args = args;
    }
}

/// Sorts spellings shortest first and folds duplicate spellings together.
fn canonical_synonyms(mut synonyms: Vec<FlagSynonym>) -> Vec<FlagSynonym> {
    synonyms.sort_by(|a, b| a.name.len().cmp(&b.name.len()).then_with(|| a.name.cmp(&b.name)));
    let mut out: Vec<FlagSynonym> = Vec::with_capacity(synonyms.len());
    for synonym in synonyms {
        match out.last_mut() {
            Some(prev) if prev.name == synonym.name => {
                prev.args = prev.args.most_specific(&synonym.args).clone();
            }
            _ => out.push(synonym),
        }
    }
    out
}

fn resolve_args(synonyms: &[FlagSynonym]) -> FlagArg {
    synonyms
        .iter()
        .map(|s| &s.args)
        .fold(&FlagArg::Empty, |best, next| best.most_specific(next))
        .clone()
}

/// An argument identified by its position on the command line.
///
/// # Examples
///
/// ```
/// use helpscope_core::{CliType, Positional};
///
/// let input = Positional::new("FILE", 0).with_description("Input file");
/// assert!(!input.optional);
/// assert_eq!(input.resolved_type(), CliType::File { output: false });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Positional {
    pub name: String,
    pub position: usize,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub cli_type: Option<CliType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl Positional {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
            optional: false,
            description: None,
            cli_type: None,
            identifier: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn full_name(&self) -> String {
        self.name.clone()
    }

    pub fn resolved_type(&self) -> CliType {
        self.cli_type
            .clone()
            .unwrap_or_else(|| infer::infer_positional_type(self))
    }
}

/// Borrowed view over either kind of argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument<'a> {
    Flag(&'a Flag),
    Positional(&'a Positional),
}

impl<'a> Argument<'a> {
    pub fn description(&self) -> Option<&'a str> {
        match self {
            Self::Flag(flag) => flag.description.as_deref(),
            Self::Positional(positional) => positional.description.as_deref(),
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            Self::Flag(flag) => flag.full_name(),
            Self::Positional(positional) => positional.full_name(),
        }
    }

    pub fn resolved_type(&self) -> CliType {
        match self {
            Self::Flag(flag) => flag.resolved_type(),
            Self::Positional(positional) => positional.resolved_type(),
        }
    }

    pub fn optional(&self) -> bool {
        match self {
            Self::Flag(flag) => flag.optional,
            Self::Positional(positional) => positional.optional,
        }
    }

    pub fn identifier(&self) -> Option<&'a str> {
        match self {
            Self::Flag(flag) => flag.identifier.as_deref(),
            Self::Positional(positional) => positional.identifier.as_deref(),
        }
    }
}
