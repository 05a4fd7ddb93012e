//! Type inference from textual cues.
//!
//! Recognizers run in a fixed precedence order: enumerated choices, then the
//! value placeholder (`FILE`, `INT`, `N`), then the flag name, then keywords
//! and default values in the description. Nothing matched means `String`.
//! Inference is a pure function of the argument's text, so re-running it on
//! an annotated argument always yields the same type.

use std::sync::LazyLock;

use regex::Regex;

use crate::naming::name_words;
use crate::{CliType, Command, Flag, FlagArg, Positional};

const FLOAT_WORDS: &[&str] = &[
    "float",
    "decimal",
    "double",
    "real",
    "fraction",
    "ratio",
    "proportion",
    "probability",
];

const INT_WORDS: &[&str] = &[
    "int", "integer", "num", "number", "count", "size", "length", "len", "max", "min", "threads",
    "nthreads", "port", "seed", "limit",
];

/// Single letters that only mean "a number" when used as a placeholder.
const INT_PLACEHOLDERS: &[&str] = &["n", "k", "m", "i"];

const DIR_WORDS: &[&str] = &[
    "dir",
    "dirs",
    "directory",
    "directories",
    "folder",
    "dirname",
    "outdir",
    "workdir",
    "tmpdir",
];

const FILE_WORDS: &[&str] = &[
    "file", "files", "filename", "filepath", "path", "paths", "fname", "infile", "outfile",
];

const BOOL_WORDS: &[&str] = &["bool", "boolean"];

const STRING_WORDS: &[&str] = &["str", "string", "text", "name", "chars"];

const OUTPUT_WORDS: &[&str] = &[
    "output",
    "out",
    "outfile",
    "outdir",
    "write",
    "writes",
    "written",
    "save",
    "saves",
    "destination",
];

const INPUT_WORDS: &[&str] = &["input", "read", "reads", "load", "loads", "existing"];

struct TypeCues {
    braces: Regex,
    listing: Regex,
    listing_split: Regex,
    decimal: Regex,
    default_value: Regex,
    extension: Regex,
    bare_alternatives: Regex,
    key_value: Regex,
}

static CUES: LazyLock<TypeCues> = LazyLock::new(|| TypeCues {
    braces: Regex::new(r"\{([^{}]+)\}").expect("static regex must compile"),
    listing: Regex::new(
        r#"(?i)\b(?:one of|possible values(?: are)?|valid values(?: are)?|choices(?: are)?|options are)\s*:?\s*((?:['"`]?[\w.+-]+['"`]?\s*(?:,|\||\bor\b)\s*)+['"`]?[\w.+-]+['"`]?)"#,
    )
    .expect("static regex must compile"),
    listing_split: Regex::new(r"\s*(?:,|\||\bor\b)\s*").expect("static regex must compile"),
    decimal: Regex::new(r"\b\d+\.\d+\b").expect("static regex must compile"),
    default_value: Regex::new(
        r#"(?i)\bdefaults?(?:\s+(?:to|is|value))?\s*[:=]?\s*['"]?(-?\d+(?:\.\d+)?(?:[eE]-?\d+)?)\b"#,
    )
    .expect("static regex must compile"),
    extension: Regex::new(r"^(?:\*|[A-Za-z0-9_-]*)\.[A-Za-z][A-Za-z0-9]{0,7}$")
        .expect("static regex must compile"),
    bare_alternatives: Regex::new(r"^[\w.+-]+(?:\|[\w.+-]+)+$").expect("static regex must compile"),
    key_value: Regex::new(r"^<?([A-Za-z_][\w-]*)=([A-Za-z_][\w-]*)>?$").expect("static regex must compile"),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Placeholder,
    FlagName,
    Description,
}

/// Lowercased words with trailing digits removed (`FILE1` → `file`).
fn cue_words(text: &str) -> Vec<String> {
    name_words(text, true)
        .into_iter()
        .map(|word| {
            word.to_ascii_lowercase()
                .trim_end_matches(|ch: char| ch.is_ascii_digit())
                .to_string()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

fn any_word(words: &[String], set: &[&str]) -> bool {
    words.iter().any(|word| set.contains(&word.as_str()))
}

/// Whether the description talks about something the program writes.
fn describes_output(description: Option<&str>) -> bool {
    let Some(description) = description else {
        return false;
    };
    let words = cue_words(description);
    any_word(&words, OUTPUT_WORDS) && !any_word(&words, INPUT_WORDS)
}

fn has_decimal_cue(description: Option<&str>) -> bool {
    description.is_some_and(|text| {
        CUES.decimal.is_match(text) || any_word(&cue_words(text), FLOAT_WORDS)
    })
}

/// Choices spelled `{a,b,c}`, `(a|b)` or `a|b|c` in a placeholder.
fn placeholder_choices(placeholder: &str) -> Option<Vec<String>> {
    let trimmed = placeholder
        .trim()
        .trim_start_matches(['<', '(', '['])
        .trim_end_matches(['>', ')', ']']);
    if let Some(inner) = trimmed.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
        let items = split_choices(inner);
        return (items.len() >= 2).then_some(items);
    }
    if CUES.bare_alternatives.is_match(trimmed) && !placeholder.trim().starts_with('<') {
        return Some(split_choices(trimmed));
    }
    None
}

fn split_choices(inner: &str) -> Vec<String> {
    inner
        .split([',', '|'])
        .map(|item| item.trim().trim_matches(['\'', '"', '`']).to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Choices enumerated in a description: `{a,b}` or "one of: a, b, c".
fn description_choices(description: &str) -> Option<Vec<String>> {
    for captures in CUES.braces.captures_iter(description) {
        let inner = &captures[1];
        if inner.contains(',') || inner.contains('|') {
            let items = split_choices(inner);
            if items.len() >= 2 && items.iter().all(|item| !item.contains(' ')) {
                return Some(items);
            }
        }
    }
    let captures = CUES.listing.captures(description)?;
    let items: Vec<String> = CUES
        .listing_split
        .split(&captures[1])
        .map(|item| item.trim_matches(['\'', '"', '`']).to_string())
        .filter(|item| !item.is_empty())
        .collect();
    (items.len() >= 2).then_some(items)
}

/// Keyword recognizer for one piece of text.
fn keyword_type(text: &str, source: Source, description: Option<&str>) -> Option<CliType> {
    let words = cue_words(text);
    let numeric_placeholder = source == Source::Placeholder
        && words.len() == 1
        && INT_PLACEHOLDERS.contains(&words[0].as_str());

    if any_word(&words, FLOAT_WORDS) {
        return Some(CliType::Float);
    }
    if any_word(&words, INT_WORDS) || numeric_placeholder {
        if source != Source::Description && has_decimal_cue(description) {
            return Some(CliType::Float);
        }
        return Some(CliType::Integer);
    }
    let output = describes_output(description);
    if any_word(&words, DIR_WORDS) {
        return Some(CliType::Directory { output });
    }
    if any_word(&words, FILE_WORDS)
        || (source == Source::Placeholder && CUES.extension.is_match(text.trim_matches(['<', '>'])))
    {
        return Some(CliType::File { output });
    }
    if any_word(&words, BOOL_WORDS) {
        return Some(CliType::Boolean);
    }
    if source != Source::Description && any_word(&words, STRING_WORDS) {
        return Some(CliType::String);
    }
    None
}

/// Infers a type from free text such as a description.
///
/// Returns `None` when no recognizer matched.
///
/// # Examples
///
/// ```
/// use helpscope_core::{CliType, infer_type};
///
/// assert_eq!(infer_type("Number of threads"), Some(CliType::Integer));
/// assert_eq!(infer_type("Output directory"), Some(CliType::Directory { output: true }));
/// assert_eq!(infer_type("Mapping quality [default: 0.25]"), Some(CliType::Float));
/// assert_eq!(infer_type("Be quiet"), None);
/// ```
pub fn infer_type(text: &str) -> Option<CliType> {
    if let Some(choices) = description_choices(text) {
        return Some(CliType::enumeration(choices));
    }
    keyword_type(text, Source::Description, Some(text)).or_else(|| default_value_type(text))
}

fn default_value_type(description: &str) -> Option<CliType> {
    let captures = CUES.default_value.captures(description)?;
    let value = &captures[1];
    if value.contains(['.', 'e', 'E']) {
        Some(CliType::Float)
    } else {
        Some(CliType::Integer)
    }
}

/// Resolves the type of one value slot.
fn value_type(placeholder: Option<&str>, flag_name: Option<&str>, description: Option<&str>) -> CliType {
    if let Some(choices) = placeholder.and_then(placeholder_choices) {
        return CliType::enumeration(choices);
    }
    if let Some(choices) = description.and_then(description_choices) {
        return CliType::enumeration(choices);
    }
    if let Some(captures) = placeholder.and_then(|text| CUES.key_value.captures(text)) {
        return CliType::dict(
            value_type(Some(&captures[1]), None, None),
            value_type(Some(&captures[2]), None, None),
        );
    }
    placeholder
        .and_then(|text| keyword_type(text, Source::Placeholder, description))
        .or_else(|| flag_name.and_then(|text| keyword_type(text, Source::FlagName, description)))
        .or_else(|| description.and_then(|text| keyword_type(text, Source::Description, description)))
        .or_else(|| description.and_then(default_value_type))
        .unwrap_or(CliType::String)
}

/// Resolves the type of a flag's argument pattern.
pub fn infer_arg_type(args: &FlagArg, flag_name: Option<&str>, description: Option<&str>) -> CliType {
    match args {
        FlagArg::Empty => CliType::Boolean,
        FlagArg::Choice { choices } => CliType::enumeration(choices.iter().cloned()),
        FlagArg::Simple { name } => value_type(Some(name), flag_name, description),
        FlagArg::Repeat { name } => CliType::list(value_type(Some(name), flag_name, description)),
        FlagArg::Optional { names, .. } | FlagArg::Fixed { names } => match names.as_slice() {
            [single] => value_type(Some(single), flag_name, description),
            _ => CliType::tuple(
                names
                    .iter()
                    .map(|name| value_type(Some(name), flag_name, description))
                    .collect(),
            ),
        },
    }
}

/// Resolves the type of a flag.
///
/// # Examples
///
/// ```
/// use helpscope_core::*;
///
/// let format = Flag::new(vec![FlagSynonym::new(
///     "--format",
///     FlagArg::choice(["json", "yaml", "csv"]),
/// )]);
/// assert_eq!(infer_flag_type(&format), CliType::enumeration(["json", "yaml", "csv"]));
///
/// let output = Flag::new(vec![FlagSynonym::new("-o", FlagArg::simple("FILE"))])
///     .with_description("Write output to FILE");
/// assert_eq!(infer_flag_type(&output), CliType::File { output: true });
/// ```
pub fn infer_flag_type(flag: &Flag) -> CliType {
    infer_arg_type(
        &flag.args,
        Some(flag.longest_synonym()),
        flag.description.as_deref(),
    )
}

/// Resolves the type of a positional argument from its name and description.
///
/// A trailing `...` on the name (`FILE...`) makes it a list.
pub fn infer_positional_type(positional: &Positional) -> CliType {
    let description = positional.description.as_deref();
    match positional.name.strip_suffix("...") {
        Some(stem) if !stem.is_empty() => CliType::list(value_type(Some(stem), None, description)),
        _ => value_type(Some(&positional.name), None, description),
    }
}

/// Stores the inferred type on every argument of the tree.
pub fn annotate_types(command: &mut Command) {
    for flag in command
        .named
        .iter_mut()
        .chain(command.help_flag.iter_mut())
        .chain(command.version_flag.iter_mut())
        .chain(command.usage_flag.iter_mut())
    {
        flag.cli_type = Some(infer_flag_type(flag));
    }
    for positional in &mut command.positional {
        positional.cli_type = Some(infer_positional_type(positional));
    }
    for child in &mut command.subcommands {
        annotate_types(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlagSynonym;

    fn flag(name: &str, args: FlagArg, description: &str) -> Flag {
        Flag::new(vec![FlagSynonym::new(name, args)]).with_description(description)
    }

    #[test]
    fn test_empty_args_are_boolean() {
        let verbose = flag("-v", FlagArg::Empty, "Enable verbose output");
        assert_eq!(infer_flag_type(&verbose), CliType::Boolean);
    }

    #[test]
    fn test_choice_syntax_wins_first() {
        let piped = flag("--mode", FlagArg::simple("fast|slow"), "Number of passes");
        assert_eq!(infer_flag_type(&piped), CliType::enumeration(["fast", "slow"]));

        let braced = flag("--level", FlagArg::simple("{1,2,3}"), "");
        assert_eq!(infer_flag_type(&braced), CliType::enumeration(["1", "2", "3"]));

        let listed = flag(
            "--color",
            FlagArg::simple("WHEN"),
            "When to colour; one of: always, never, auto",
        );
        assert_eq!(
            infer_flag_type(&listed),
            CliType::enumeration(["always", "never", "auto"])
        );
    }

    #[test]
    fn test_angle_placeholder_with_pipe_is_not_enum() {
        let fasta = flag("-r", FlagArg::simple("<file.fa|file.fa.gz>"), "Reference");
        assert!(matches!(infer_flag_type(&fasta), CliType::File { .. }));
    }

    #[test]
    fn test_numeric_placeholders() {
        assert_eq!(
            infer_flag_type(&flag("-t", FlagArg::simple("INT"), "threads")),
            CliType::Integer
        );
        assert_eq!(
            infer_flag_type(&flag("-k", FlagArg::simple("N"), "seed length")),
            CliType::Integer
        );
        assert_eq!(
            infer_flag_type(&flag("-p", FlagArg::simple("FLOAT"), "")),
            CliType::Float
        );
        assert_eq!(
            infer_flag_type(&flag("-x", FlagArg::simple("NUM"), "penalty [0.5]")),
            CliType::Float
        );
    }

    #[test]
    fn test_file_and_directory_outputs() {
        let input = flag("-i", FlagArg::simple("FILE"), "Input reads");
        assert_eq!(infer_flag_type(&input), CliType::File { output: false });

        let output = flag("-o", FlagArg::simple("FILE"), "Output file");
        assert_eq!(infer_flag_type(&output), CliType::File { output: true });

        let outdir = flag("--out-dir", FlagArg::simple("X"), "Save results here");
        assert_eq!(infer_flag_type(&outdir), CliType::Directory { output: true });

        let bam = flag("--bam", FlagArg::simple("out.bam"), "");
        assert_eq!(infer_flag_type(&bam), CliType::File { output: false });
    }

    #[test]
    fn test_repeat_wraps_in_list() {
        let inputs = flag("-I", FlagArg::repeat("DIR"), "Include directories");
        assert_eq!(
            infer_flag_type(&inputs),
            CliType::list(CliType::Directory { output: false })
        );
    }

    #[test]
    fn test_multi_slot_patterns_are_tuples() {
        let optional = flag(
            "-I",
            FlagArg::Optional {
                names: vec!["FLOAT".into(), "FLOAT".into(), "INT".into()],
                separator: ",".into(),
            },
            "insert size distribution",
        );
        assert_eq!(
            infer_flag_type(&optional),
            CliType::tuple(vec![CliType::Float, CliType::Float, CliType::Integer])
        );

        let fixed = flag(
            "--range",
            FlagArg::Fixed {
                names: vec!["START".into(), "END".into()],
            },
            "",
        );
        assert_eq!(
            infer_flag_type(&fixed),
            CliType::Tuple {
                values: vec![CliType::String, CliType::String],
                homogenous: true
            }
        );
    }

    #[test]
    fn test_flag_name_and_description_cues() {
        let threads = flag("--threads", FlagArg::simple("VALUE"), "");
        assert_eq!(infer_flag_type(&threads), CliType::Integer);

        let score = flag("--min-score", FlagArg::simple("X"), "Default: 0.75");
        assert_eq!(infer_flag_type(&score), CliType::Float);

        let defaulted = flag("--tries", FlagArg::simple("X"), "retry this often [default: 3]");
        assert_eq!(infer_flag_type(&defaulted), CliType::Integer);

        let explicit = flag("--label", FlagArg::simple("NAME"), "Number of the beast");
        assert_eq!(infer_flag_type(&explicit), CliType::String);
    }

    #[test]
    fn test_unmatched_cues_default_to_string() {
        let motto = flag("--motto", FlagArg::simple("WORDS"), "Something to say");
        assert_eq!(infer_flag_type(&motto), CliType::String);
    }

    #[test]
    fn test_positional_types() {
        assert_eq!(
            infer_positional_type(&Positional::new("FILE", 0)),
            CliType::File { output: false }
        );
        assert_eq!(
            infer_positional_type(&Positional::new("{add,remove}", 0)),
            CliType::enumeration(["add", "remove"])
        );
        assert_eq!(
            infer_positional_type(&Positional::new("command", 0)),
            CliType::String
        );
        assert_eq!(
            infer_positional_type(&Positional::new("FILE...", 0)),
            CliType::list(CliType::File { output: false })
        );
    }

    #[test]
    fn test_key_value_placeholder_is_dict() {
        let define = flag("-D", FlagArg::simple("KEY=VALUE"), "set a property");
        assert_eq!(
            infer_flag_type(&define),
            CliType::dict(CliType::String, CliType::String)
        );
        let sized = flag("--limit", FlagArg::simple("<name=size>"), "");
        assert_eq!(
            infer_flag_type(&sized),
            CliType::dict(CliType::String, CliType::Integer)
        );
    }

    #[test]
    fn test_annotation_is_idempotent() {
        let mut cmd = Command::from_parts(
            ["tool"],
            vec![Positional::new("OUTDIR", 0).with_description("Where to write results")],
            vec![
                flag("-n", FlagArg::simple("N"), "count"),
                flag("--format", FlagArg::choice(["a", "b"]), ""),
            ],
        );
        annotate_types(&mut cmd);
        let first = cmd.clone();
        annotate_types(&mut cmd);
        assert_eq!(cmd, first);
        assert_eq!(
            cmd.positional[0].cli_type,
            Some(CliType::Directory { output: true })
        );
        for flag in &cmd.named {
            assert_eq!(flag.cli_type.clone(), Some(infer_flag_type(flag)));
        }
    }
}
