//! Lexical rules shared by the grammar branches.
//!
//! Definitions such as `-o FILE, --output=FILE` or `[-v] <input>...` are
//! broken into [`Token`]s first. Bracketed groups (`[...]`, `<...>`, `{...}`,
//! `(...)`) stay inside a single word so that their contents can be given
//! meaning later: brackets mark optionality, an ellipsis marks repetition and
//! braces or pipes enumerate choices.

use std::sync::LazyLock;

use helpscope_core::{FlagArg, FlagSynonym};
use regex::Regex;

struct LexPatterns {
    positional_name: Regex,
    alternatives: Regex,
    prose_word: Regex,
}

static PATTERNS: LazyLock<LexPatterns> = LazyLock::new(|| LexPatterns {
    positional_name: Regex::new(r"^[\w<\[{][\w.<>\[\]{},|:+*/-]*(?:\.\.\.)?$")
        .expect("static regex must compile"),
    alternatives: Regex::new(r"^[\w.+-]+(?:\|[\w.+-]+)+$").expect("static regex must compile"),
    prose_word: Regex::new(r"[A-Za-z]{2,}").expect("static regex must compile"),
});

/// One lexical unit of a definition or usage line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of non-space characters; bracketed groups may contain spaces.
    Word { text: String, end: usize },
    /// `,`, `|` or `/` between two flag spellings.
    Separator { end: usize },
    /// A free-standing `...`.
    Ellipsis { end: usize },
}

fn closer(open: char) -> char {
    match open {
        '[' => ']',
        '<' => '>',
        '{' => '}',
        _ => ')',
    }
}

fn next_non_space_is_dash(chars: &[(usize, char)], from: usize) -> bool {
    chars[from..]
        .iter()
        .find(|(_, ch)| !ch.is_whitespace())
        .is_some_and(|(_, ch)| *ch == '-')
}

fn has_closer(chars: &[(usize, char)], from: usize, close: char) -> bool {
    chars[from..].iter().any(|(_, ch)| *ch == close)
}

/// Splits a definition into words, separators and ellipses.
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        if matches!(ch, ',' | '|' | '/') && next_non_space_is_dash(&chars, i + 1) {
            tokens.push(Token::Separator { end: pos + 1 });
            i += 1;
            continue;
        }
        if text[pos..].starts_with("...") {
            tokens.push(Token::Ellipsis { end: pos + 3 });
            i += 3;
            continue;
        }
        if ch == '…' {
            tokens.push(Token::Ellipsis {
                end: pos + ch.len_utf8(),
            });
            i += 1;
            continue;
        }

        let mut word = String::new();
        let mut open: Vec<char> = Vec::new();
        let mut end = pos;
        while i < chars.len() {
            let (p, c) = chars[i];
            if open.is_empty() {
                if c.is_whitespace() {
                    break;
                }
                if matches!(c, ',' | '|' | '/') && !word.is_empty() && next_non_space_is_dash(&chars, i + 1) {
                    break;
                }
            }
            match c {
                '[' | '<' | '{' | '(' if has_closer(&chars, i + 1, closer(c)) => open.push(closer(c)),
                ']' | '>' | '}' | ')' if open.last() == Some(&c) => {
                    open.pop();
                }
                _ => {}
            }
            word.push(c);
            end = p + c.len_utf8();
            i += 1;
        }
        tokens.push(Token::Word { text: word, end });
    }

    tokens
}

/// Whether a word is a flag spelling (`-v`, `--verbose`, `-?`, `--[no-]color`).
pub fn is_flag_word(word: &str) -> bool {
    let mut chars = word.chars();
    if chars.next() != Some('-') {
        return false;
    }
    match chars.next() {
        Some('-') => chars
            .next()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '['),
        Some(ch) => ch.is_ascii_alphanumeric() || matches!(ch, '?' | '@' | '#'),
        None => false,
    }
}

/// Value attached to a flag spelling without whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attached {
    /// `--output=FILE`, `-I<dir>`
    Value(String),
    /// `--color[=WHEN]`
    Optional { names: Vec<String>, separator: String },
}

/// Splits `--output=FILE` into its spelling(s) and attached value.
///
/// `--[no-]color` expands to both `--color` and `--no-color`.
fn split_flag_word(word: &str) -> (Vec<String>, Option<Attached>) {
    let (prefix, body) = match word.find("[no-]") {
        Some(pos) if word[..pos].chars().all(|ch| ch == '-') => {
            let dashes = &word[..pos];
            (Some(dashes.to_string()), &word[pos + 5..])
        }
        _ => (None, word),
    };

    let split_at = body
        .char_indices()
        .skip(1)
        .find(|(_, ch)| matches!(ch, '=' | '[' | '<'))
        .map(|(pos, _)| pos);
    let (name_part, rest) = match split_at {
        Some(pos) => (&body[..pos], &body[pos..]),
        None => (body, ""),
    };
    let name_part = name_part.trim_end_matches([':', ';', '.']);

    let attached = if let Some(value) = rest.strip_prefix('=') {
        (!value.is_empty()).then(|| Attached::Value(value.to_string()))
    } else if rest.starts_with('[') {
        let separator = rest[1..]
            .chars()
            .next()
            .filter(|ch| matches!(ch, '=' | ',' | ':'))
            .map(String::from)
            .unwrap_or_default();
        let names = nested_names(rest);
        (!names.is_empty()).then_some(Attached::Optional { names, separator })
    } else if rest.starts_with('<') {
        Some(Attached::Value(rest.to_string()))
    } else {
        None
    };

    let names = match prefix {
        Some(dashes) => {
            let bare = name_part.trim_start_matches('-');
            vec![format!("{dashes}{bare}"), format!("{dashes}no-{bare}")]
        }
        None => vec![name_part.to_string()],
    };
    (names, attached)
}

/// Names inside a nested optional group: `FLOAT[,FLOAT[,INT]]` gives
/// `FLOAT`, `FLOAT`, `INT`.
fn nested_names(text: &str) -> Vec<String> {
    text.replace(['[', ']'], " ")
        .split([',', ':', '=', ' '])
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "..." && *name != "…")
        .map(String::from)
        .collect()
}

/// Whether a word after a flag, in free text, reads as its value placeholder.
pub fn looks_like_arg(word: &str) -> bool {
    if word.starts_with(['<', '[', '{']) || word.contains('=') {
        return true;
    }
    if PATTERNS.alternatives.is_match(word) {
        return true;
    }
    let core = word.trim_end_matches("...").trim_end_matches(',');
    core.chars().any(|ch| ch.is_ascii_alphabetic())
        && !core.chars().any(|ch| ch.is_lowercase())
        && core
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':'))
}

fn is_repeat_group(word: &str) -> bool {
    word.starts_with('[')
        && word.ends_with(']')
        && word[1..word.len() - 1].trim_end().ends_with("...")
}

pub(crate) fn strip_ellipsis(word: &str) -> (&str, bool) {
    if let Some(stripped) = word.strip_suffix("...") {
        (stripped, true)
    } else if let Some(stripped) = word.strip_suffix('…') {
        (stripped, true)
    } else {
        (word, false)
    }
}

/// Choices spelled `{a,b,c}` or `a|b|c`.
pub fn choice_items(word: &str) -> Option<Vec<String>> {
    let inner = match word.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
        Some(inner) => inner,
        None if PATTERNS.alternatives.is_match(word) => word,
        None => return None,
    };
    let items: Vec<String> = inner
        .split([',', '|'])
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    (items.len() >= 2).then_some(items)
}

/// Builds the argument pattern for one spelling from the words after it.
pub(crate) fn build_arg(attached: Option<&str>, words: &[String], repeated: bool) -> FlagArg {
    let (names, attached_optional) = match attached.map(|raw| split_flag_word(&format!("-x{raw}")).1) {
        Some(Some(Attached::Optional { names, separator })) => (Vec::new(), Some((names, separator))),
        Some(Some(Attached::Value(value))) => (vec![value], None),
        _ => (Vec::new(), None),
    };
    if let Some((names, separator)) = attached_optional {
        return FlagArg::Optional { names, separator };
    }
    arg_from_words(names.into_iter().chain(words.iter().cloned()).collect(), repeated)
}

fn arg_from_words(words: Vec<String>, mut repeated: bool) -> FlagArg {
    let mut kept: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        if is_repeat_group(&word) {
            repeated = true;
            continue;
        }
        let (core, ellipsis) = strip_ellipsis(&word);
        repeated |= ellipsis;
        if !core.is_empty() {
            kept.push(core.to_string());
        }
    }

    match kept.as_slice() {
        [] => FlagArg::Empty,
        [single] => {
            if let Some(items) = choice_items(single).filter(|_| !single.starts_with('<')) {
                return FlagArg::choice(items);
            }
            if single.starts_with('[') && single.ends_with(']') {
                return FlagArg::Optional {
                    names: nested_names(single),
                    separator: " ".into(),
                };
            }
            if let Some(bracket) = single.find('[').filter(|pos| *pos > 0) {
                let separator = single[bracket + 1..]
                    .chars()
                    .next()
                    .filter(|ch| matches!(ch, ',' | ':' | '='))
                    .map(String::from)
                    .unwrap_or_default();
                return FlagArg::Optional {
                    names: nested_names(single),
                    separator,
                };
            }
            if repeated {
                FlagArg::repeat(single.clone())
            } else {
                FlagArg::simple(single.clone())
            }
        }
        [first, ..] if repeated => FlagArg::repeat(first.clone()),
        many if many.iter().any(|word| word.starts_with('[')) => FlagArg::Optional {
            names: many.iter().flat_map(|word| nested_names(word)).collect(),
            separator: " ".into(),
        },
        many => FlagArg::Fixed {
            names: many.to_vec(),
        },
    }
}

/// Lexes flag spellings at the start of `text`.
///
/// In `strict` mode only words that [`looks_like_arg`] are taken as values,
/// since the definition may run straight into its description. Returns the
/// synonyms and the byte offset where the definition ends.
pub fn lex_flag_definition(text: &str, strict: bool) -> Option<(Vec<FlagSynonym>, usize)> {
    let tokens = tokenize(text);
    let mut synonyms = Vec::new();
    let mut consumed = 0;
    let mut i = 0;

    while let Some(Token::Word { text: word, end }) = tokens.get(i) {
        if !is_flag_word(word) {
            break;
        }
        let (names, _) = split_flag_word(word);
        let attached = attached_suffix(word);
        consumed = *end;
        i += 1;

        let mut words = Vec::new();
        let mut repeated = false;
        while let Some(token) = tokens.get(i) {
            match token {
                Token::Word { text, end } if !is_flag_word(text) && (!strict || looks_like_arg(text)) => {
                    words.push(text.trim_end_matches(',').to_string());
                    consumed = *end;
                    i += 1;
                }
                Token::Ellipsis { end } => {
                    repeated = true;
                    consumed = *end;
                    i += 1;
                }
                _ => break,
            }
        }

        let args = build_arg(attached.as_deref(), &words, repeated);
        synonyms.extend(names.into_iter().map(|name| FlagSynonym::new(name, args.clone())));

        match (tokens.get(i), tokens.get(i + 1)) {
            (Some(Token::Separator { .. }), Some(Token::Word { text, .. })) if is_flag_word(text) => i += 1,
            (Some(Token::Word { text, .. }), _) if is_flag_word(text) => {}
            _ => break,
        }
    }

    (!synonyms.is_empty()).then_some((synonyms, consumed))
}

/// The part of a flag word after its spelling, e.g. `=FILE` or `[=WHEN]`.
fn attached_suffix(word: &str) -> Option<String> {
    let body_start = word.find("[no-]").map_or(0, |pos| pos + 5);
    word[body_start..]
        .char_indices()
        .skip(1)
        .find(|(_, ch)| matches!(ch, '=' | '[' | '<'))
        .map(|(pos, _)| word[body_start + pos..].to_string())
}

/// Splits a row at the first run of two or more spaces.
///
/// Returns the left column and, if present, the right column together with
/// its byte offset in `text`.
pub fn split_columns(text: &str) -> (&str, Option<(&str, usize)>) {
    let Some(gap) = text.find("  ") else {
        return (text, None);
    };
    let left = text[..gap].trim_end();
    let right = text[gap..].trim_start();
    if left.is_empty() || right.is_empty() {
        return (text, None);
    }
    (left, Some((right, text.len() - right.len())))
}

/// Character column of byte offset `byte` within `text`.
pub fn char_column(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Character columns of the flag spellings in a definition.
fn spelling_columns(definition: &str) -> Vec<usize> {
    tokenize(definition)
        .iter()
        .filter_map(|token| match token {
            Token::Word { text, end } if is_flag_word(text) => Some(char_column(definition, end - text.len())),
            _ => None,
        })
        .collect()
}

/// A row that starts with one or more flag spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRow {
    pub synonyms: Vec<FlagSynonym>,
    pub description: Option<String>,
    /// Character column of the description within the row.
    pub description_offset: Option<usize>,
    /// Character column of each spelling within the row.
    pub spelling_columns: Vec<usize>,
}

/// Lexes a flag row such as `-o, --output FILE   Write to FILE`.
pub fn lex_flag_row(text: &str) -> Option<FlagRow> {
    let first = text.split_whitespace().next()?;
    if !is_flag_word(first.trim_end_matches([',', '|', '/'])) {
        return None;
    }

    let (left, right) = split_columns(text);
    if let Some((description, offset)) = right {
        if let Some((synonyms, consumed)) = lex_flag_definition(left, false) {
            if left[consumed..].trim().is_empty() {
                return Some(FlagRow {
                    synonyms,
                    description: Some(description.to_string()),
                    description_offset: Some(char_column(text, offset)),
                    spelling_columns: spelling_columns(left),
                });
            }
        }
    }

    let (synonyms, consumed) = lex_flag_definition(text, true)?;
    let rest = text[consumed..].trim_start().trim_start_matches([':', ',']).trim_start();
    let description = (!rest.is_empty()).then(|| rest.to_string());
    let description_offset = description
        .as_ref()
        .map(|_| char_column(text, text.len() - rest.len()));
    Some(FlagRow {
        synonyms,
        description,
        description_offset,
        spelling_columns: spelling_columns(&text[..consumed]),
    })
}

/// A two-column row naming a positional argument or subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalRow {
    pub name: String,
    pub optional: bool,
    pub description: String,
    /// Character column of the description within the row.
    pub description_offset: usize,
}

/// Lexes a row such as `input.bam    Sorted alignments` or `add, a  Add`.
pub fn lex_positional_row(text: &str) -> Option<PositionalRow> {
    if text.starts_with('-') {
        return None;
    }
    let (left, Some((description, offset))) = split_columns(text) else {
        return None;
    };
    let name = left.split(", ").next()?.trim();
    if name.ends_with(':')
        || !PATTERNS.positional_name.is_match(name)
        || !name.chars().any(|ch| ch.is_alphabetic())
    {
        return None;
    }
    if !PATTERNS.prose_word.is_match(description) {
        return None;
    }
    let optional = name.starts_with('[') && name.ends_with(']');
    let name = if optional {
        name[1..name.len() - 1].to_string()
    } else {
        name.to_string()
    };
    Some(PositionalRow {
        name,
        optional,
        description: description.to_string(),
        description_offset: char_column(text, offset),
    })
}
