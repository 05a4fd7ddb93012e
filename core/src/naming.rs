//! Machine-safe identifiers for arguments.
//!
//! Workflow languages need a variable name for every argument. Names are
//! derived from the flag spelling, the value placeholder or the description,
//! in that order, formatted in the requested [`Case`] and kept unique among
//! the arguments of one command.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Command, Flag, Positional};

/// Identifier case convention.
///
/// # Examples
///
/// ```
/// use helpscope_core::Case;
///
/// let words = ["output", "dir"];
/// assert_eq!(Case::Snake.format(&words), "output_dir");
/// assert_eq!(Case::Camel.format(&words), "outputDir");
/// assert_eq!("camel".parse::<Case>().unwrap(), Case::Camel);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Case {
    /// Keep the original letter case, joining words with `_`.
    #[default]
    AsIs,
    Snake,
    Camel,
}

impl Case {
    /// Joins name words in this convention.
    pub fn format<S: AsRef<str>>(self, words: &[S]) -> String {
        match self {
            Self::AsIs => words
                .iter()
                .map(|word| word.as_ref())
                .collect::<Vec<_>>()
                .join("_"),
            Self::Snake => words
                .iter()
                .map(|word| word.as_ref().to_lowercase())
                .collect::<Vec<_>>()
                .join("_"),
            Self::Camel => {
                let mut out = String::new();
                for (index, word) in words.iter().enumerate() {
                    let lower = word.as_ref().to_lowercase();
                    if index == 0 {
                        out.push_str(&lower);
                    } else {
                        let mut chars = lower.chars();
                        if let Some(first) = chars.next() {
                            out.extend(first.to_uppercase());
                            out.push_str(chars.as_str());
                        }
                    }
                }
                out
            }
        }
    }

    /// Whether camelCase boundaries inside a word start a new word.
    fn splits_camel(self) -> bool {
        !matches!(self, Self::AsIs)
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AsIs => write!(f, "as-is"),
            Self::Snake => write!(f, "snake"),
            Self::Camel => write!(f, "camel"),
        }
    }
}

/// Error for an unrecognised case convention name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown case convention `{0}` (expected as-is, snake or camel)")]
pub struct ParseCaseError(pub String);

impl FromStr for Case {
    type Err = ParseCaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "as-is" | "asis" | "as_is" | "none" => Ok(Self::AsIs),
            "snake" | "snake_case" => Ok(Self::Snake),
            "camel" | "camelcase" | "camel_case" => Ok(Self::Camel),
            other => Err(ParseCaseError(other.to_string())),
        }
    }
}

/// Identifiers that collide with keywords of common workflow languages.
pub const RESERVED_IDENTIFIERS: &[&str] = &[
    "command",
    "input",
    "output",
    "runtime",
    "meta",
    "parameter_meta",
    "type",
    "in",
    "if",
    "then",
    "else",
];

const DESCRIPTION_WORDS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "of", "for", "and", "or", "in", "on", "with", "by", "is", "be", "this",
    "that", "if", "use", "set", "specify", "specifies", "default",
];

/// Splits free text into name words.
///
/// Leading dashes are dropped, `-`, `_`, `.`, whitespace and (optionally)
/// camelCase boundaries separate words, and symbols are spelled out.
pub fn name_words(text: &str, split_camel: bool) -> Vec<String> {
    let trimmed = text.trim().trim_start_matches(['-', '+']);
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, words: &mut Vec<String>| {
        if !current.is_empty() {
            words.push(std::mem::take(current));
        }
    };

    let mut prev: Option<char> = None;
    for ch in trimmed.chars() {
        if ch.is_ascii_alphabetic() {
            let boundary = split_camel
                && ch.is_ascii_uppercase()
                && prev.is_some_and(|p| p.is_ascii_lowercase());
            if boundary {
                flush(&mut current, &mut words);
            }
            current.push(ch);
        } else if ch.is_ascii_digit() {
            current.push(ch);
        } else if let Some(spelled) = spell_symbol(ch) {
            flush(&mut current, &mut words);
            words.push(spelled.to_string());
        } else {
            flush(&mut current, &mut words);
        }
        prev = Some(ch);
    }
    flush(&mut current, &mut words);
    words
}

fn spell_symbol(ch: char) -> Option<&'static str> {
    match ch {
        '@' => Some("at"),
        '+' => Some("plus"),
        '%' => Some("percent"),
        '#' => Some("hash"),
        _ => None,
    }
}

/// Too short or purely numeric to be a meaningful name.
fn useless_name(words: &[String]) -> bool {
    let joined: String = words.concat();
    joined.chars().count() <= 1 || joined.chars().all(|ch| ch.is_ascii_digit())
}

fn description_words(description: &str, split_camel: bool) -> Vec<String> {
    let first_clause = description
        .split(['.', ';', '(', '[', ':'])
        .next()
        .unwrap_or_default();
    name_words(first_clause, split_camel)
        .into_iter()
        .filter(|word| !STOP_WORDS.contains(&word.to_ascii_lowercase().as_str()))
        .take(DESCRIPTION_WORDS)
        .collect()
}

fn flag_options(flag: &Flag, case: Case) -> Vec<Vec<String>> {
    let split = case.splits_camel();
    let mut names: Vec<&str> = flag.synonym_names();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut options: Vec<Vec<String>> = names.iter().map(|name| name_words(name, split)).collect();
    options.extend(
        flag.args
            .placeholders()
            .into_iter()
            .map(|placeholder| name_words(placeholder, split)),
    );
    if let Some(description) = &flag.description {
        options.push(description_words(description, split));
    }
    options
}

fn positional_options(positional: &Positional, case: Case) -> Vec<Vec<String>> {
    let split = case.splits_camel();
    let mut options = vec![name_words(&positional.name, split)];
    if let Some(description) = &positional.description {
        options.push(description_words(description, split));
    }
    options
}

/// Picks unique identifiers for the arguments of one command.
///
/// The first option that is neither useless, reserved nor taken wins. When
/// every option is taken the first usable one gets a numeric suffix, and an
/// argument with no usable option at all becomes `var_<n>`.
#[derive(Debug, Clone)]
pub struct IdentifierGenerator {
    case: Case,
    used: HashSet<String>,
    counter: usize,
}

impl IdentifierGenerator {
    pub fn new(case: Case) -> Self {
        Self {
            case,
            used: HashSet::new(),
            counter: 0,
        }
    }

    pub fn case(&self) -> Case {
        self.case
    }

    fn is_reserved(&self, identifier: &str) -> bool {
        RESERVED_IDENTIFIERS.contains(&identifier.to_ascii_lowercase().as_str())
    }

    fn fixup(&self, words: &[String]) -> String {
        let mut identifier = self.case.format(words);
        if identifier.starts_with(|ch: char| ch.is_ascii_digit()) {
            let mut prefixed = vec!["arg".to_string()];
            prefixed.extend_from_slice(words);
            identifier = self.case.format(&prefixed);
        }
        identifier
    }

    /// Chooses an identifier from candidate word lists.
    pub fn choose(&mut self, options: &[Vec<String>]) -> String {
        self.counter += 1;
        let usable: Vec<String> = options
            .iter()
            .filter(|words| !useless_name(words))
            .map(|words| self.fixup(words))
            .filter(|identifier| !self.is_reserved(identifier))
            .collect();

        let chosen = match usable.iter().find(|id| !self.used.contains(*id)) {
            Some(id) => id.clone(),
            None => {
                let base = usable.first().cloned().unwrap_or_else(|| {
                    self.case.format(&["var".to_string(), self.counter.to_string()])
                });
                self.with_suffix(&base)
            }
        };
        self.used.insert(chosen.clone());
        chosen
    }

    fn with_suffix(&self, base: &str) -> String {
        if !self.used.contains(base) {
            return base.to_string();
        }
        let separator = if matches!(self.case, Case::Camel) { "" } else { "_" };
        (2..)
            .map(|n| format!("{base}{separator}{n}"))
            .find(|candidate| !self.used.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Assigns identifiers to every argument of `command` and its subcommands.
///
/// Uniqueness is enforced among the flags and positionals of each node.
///
/// # Examples
///
/// ```
/// use helpscope_core::*;
///
/// let mut cmd = Command::from_parts(
///     ["tool"],
///     vec![Positional::new("input-file", 0)],
///     vec![
///         Flag::switch(&["-v"]).with_description("Enable verbose output"),
///         Flag::switch(&["--input-file"]),
///     ],
/// );
/// assign_identifiers(&mut cmd, Case::Snake);
/// assert_eq!(cmd.named[0].identifier.as_deref(), Some("enable_verbose_output"));
/// assert_eq!(cmd.named[1].identifier.as_deref(), Some("input_file"));
/// assert_eq!(cmd.positional[0].identifier.as_deref(), Some("input_file_2"));
/// ```
pub fn assign_identifiers(command: &mut Command, case: Case) {
    let mut generator = IdentifierGenerator::new(case);
    for flag in &mut command.named {
        let options = flag_options(flag, case);
        flag.identifier = Some(generator.choose(&options));
    }
    for positional in &mut command.positional {
        let options = positional_options(positional, case);
        positional.identifier = Some(generator.choose(&options));
    }
    for child in &mut command.subcommands {
        assign_identifiers(child, case);
    }
}
