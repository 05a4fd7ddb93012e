//! Usage-line parser strategy.
//!
//! Reads `usage:` synopses such as `tool [-v] [-o FILE] <input>... {add,rm}`.
//! The result is both a candidate of its own (the generic fallback) and the
//! usage half that every block strategy is combined with.

use std::sync::LazyLock;

use helpscope_core::{Flag, Positional, UsageElement, UsageInstance};
use regex::Regex;

use super::ParserStrategy;
use crate::parser::ast::ParseCandidate;
use crate::parser::lexer::{Token, choice_items, is_flag_word, lex_flag_definition, looks_like_arg, strip_ellipsis, tokenize};
use crate::parser::{HelpParser, Line};

pub struct UsageStrategy;

pub const NAME: &str = "usage";

impl ParserStrategy for UsageStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        3
    }

    fn parse(&self, parser: &HelpParser) -> Option<ParseCandidate> {
        let usage = parser.usage();
        if usage.flags.is_empty() && usage.positionals.is_empty() {
            return None;
        }
        let mut candidate = ParseCandidate::new(
            NAME,
            self.priority(),
            usage.flags.clone(),
            usage.positionals.clone(),
            &usage.lines,
        );
        candidate.usage = usage.instances.clone();
        Some(candidate)
    }
}

static USAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^usage\s*:\s*(.*)$").expect("static regex must compile"));
static OR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^or\s*:\s*(.*)$").expect("static regex must compile"));

const OPTION_PLACEHOLDERS: &[&str] = &["options", "option", "opts", "flags", "flag", "switches"];

/// Everything learned from the usage lines of one help text.
#[derive(Debug, Clone, Default)]
pub struct UsageParse {
    pub flags: Vec<Flag>,
    pub positionals: Vec<Positional>,
    pub instances: Vec<UsageInstance>,
    pub lines: Vec<usize>,
}

impl UsageParse {
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Finds and parses every usage line in `lines`.
///
/// `command` holds the invocation tokens; a matching prefix is stripped
/// from each synopsis, otherwise its first bare word is taken to be the
/// program name.
pub fn parse_usage(lines: &[Line], command: &[String]) -> UsageParse {
    let mut texts: Vec<String> = Vec::new();
    let mut consumed: Vec<usize> = Vec::new();
    let program = command.first().map(|token| basename(token));

    let mut index = 0;
    while index < lines.len() {
        let line = &lines[index];
        let Some(captures) = USAGE_RE.captures(&line.text) else {
            index += 1;
            continue;
        };
        consumed.push(line.index);
        let remainder = captures.get(1).map_or("", |m| m.as_str()).trim();
        let header_only = remainder.is_empty();
        let mut current: Option<String> = (!header_only).then(|| remainder.to_string());

        index += 1;
        while let Some(next) = lines.get(index) {
            if next.text.is_empty() || (next.indent <= line.indent && !OR_RE.is_match(&next.text)) {
                break;
            }
            if let Some(alternative) = OR_RE.captures(&next.text) {
                texts.extend(current.take());
                current = Some(alternative.get(1).map_or("", |m| m.as_str()).trim().to_string());
            } else if current.is_none() || starts_new_synopsis(&next.text, program.as_deref(), header_only) {
                texts.extend(current.take());
                current = Some(next.text.clone());
            } else if let Some(text) = current.as_mut() {
                text.push(' ');
                text.push_str(&next.text);
            }
            consumed.push(next.index);
            index += 1;
        }
        texts.extend(current.take());
    }

    let mut parse = UsageParse {
        lines: consumed,
        ..UsageParse::default()
    };
    let mut flags = Vec::new();
    for text in texts.into_iter().filter(|text| !text.is_empty()) {
        let mut collector = Collector::default();
        let tokens = tokenize(&text);
        let skip = program_prefix_len(&tokens, command);
        collector.collect(&tokens[skip..], false, false);
        collector.resolve_variables();

        if parse.positionals.is_empty() {
            parse.positionals = collector.positionals();
        }
        flags.extend(collector.flags);
        parse.instances.push(UsageInstance {
            text,
            elements: collector.elements,
        });
    }
    parse.flags = Flag::deduplicate(flags);
    parse
}

fn basename(token: &str) -> String {
    token.rsplit('/').next().unwrap_or(token).to_lowercase()
}

fn starts_new_synopsis(text: &str, program: Option<&str>, header_only: bool) -> bool {
    let Some(first) = text.split_whitespace().next() else {
        return false;
    };
    if program.is_some_and(|program| basename(first) == program) {
        return true;
    }
    header_only && !first.starts_with(['[', '<', '-', '{', '(', '|'])
}

/// Number of leading tokens that spell the program (and subcommand) name.
fn program_prefix_len(tokens: &[Token], command: &[String]) -> usize {
    let matched = tokens
        .iter()
        .zip(command)
        .take_while(|(token, expected)| {
            matches!(token, Token::Word { text, .. } if basename(text) == basename(expected))
        })
        .count();
    if matched > 0 {
        return matched;
    }
    match tokens.first() {
        Some(Token::Word { text, .. }) if !text.starts_with(['[', '<', '-', '{', '(']) && !is_placeholder(text) => 1,
        _ => 0,
    }
}

fn is_placeholder(word: &str) -> bool {
    let (core, _) = strip_ellipsis(word);
    !core.is_empty() && !core.chars().any(|ch| ch.is_lowercase())
}

fn is_option_placeholder(word: &str) -> bool {
    let bare = word.trim_matches(['<', '>']).to_lowercase();
    OPTION_PLACEHOLDERS.contains(&bare.as_str())
}

#[derive(Default)]
struct Collector {
    elements: Vec<UsageElement>,
    flags: Vec<Flag>,
}

impl Collector {
    fn collect(&mut self, tokens: &[Token], optional: bool, grouped: bool) {
        let mut index = 0;
        while index < tokens.len() {
            match &tokens[index] {
                Token::Ellipsis { .. } => {
                    if let Some(last) = self.elements.last_mut() {
                        last.repeatable = true;
                    }
                }
                Token::Separator { .. } => {}
                Token::Word { text, .. } => {
                    let (core, repeated) = strip_ellipsis(text);
                    if let Some(inner) = core.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                        let before = self.elements.len();
                        self.collect(&tokenize(inner), true, true);
                        if repeated && self.elements.len() > before {
                            if let Some(last) = self.elements.last_mut() {
                                last.repeatable = true;
                            }
                        }
                    } else if let Some(inner) = core.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
                        self.collect(&tokenize(inner), optional, true);
                    } else if is_flag_word(core) {
                        let mut definition = core.to_string();
                        if let Some(Token::Word { text: value, .. }) = tokens.get(index + 1) {
                            if grouped && !is_flag_word(value) && !value.starts_with('[') && looks_like_arg(value) {
                                definition.push(' ');
                                definition.push_str(value);
                                index += 1;
                            }
                        }
                        if let Some((synonyms, _)) = lex_flag_definition(&definition, false) {
                            self.flags.push(Flag::new(synonyms).with_optional(optional));
                        }
                    } else if !is_option_placeholder(core) && !core.is_empty() {
                        let text = match choice_items(core) {
                            Some(items) if !core.starts_with('<') => format!("{{{}}}", items.join(",")),
                            _ => core.to_string(),
                        };
                        self.elements.push(UsageElement {
                            text,
                            variable: false,
                            optional,
                            repeatable: repeated,
                        });
                    }
                }
            }
            index += 1;
        }
    }

    /// Marks placeholders. Without any `<var>` syntax every bare word is
    /// taken as a placeholder; with it only capitalised words are.
    fn resolve_variables(&mut self) {
        let angled = self.elements.iter().any(|element| element.text.starts_with('<'));
        for element in &mut self.elements {
            element.variable = element.text.starts_with(['<', '{']) || !angled || is_placeholder(&element.text);
        }
    }

    fn positionals(&self) -> Vec<Positional> {
        self.elements
            .iter()
            .filter(|element| element.variable)
            .enumerate()
            .map(|(position, element)| {
                let mut name = positional_name(&element.text);
                if element.repeatable {
                    name.push_str("...");
                }
                Positional::new(name, position).with_optional(element.optional)
            })
            .collect()
    }
}

/// `<in.bam>|<in.sam>` names the positional `in.bam`.
fn positional_name(text: &str) -> String {
    match text.strip_prefix('<') {
        Some(rest) => rest.split('>').next().unwrap_or(rest).to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize::to_lines;

    fn parse(text: &str, command: &[&str]) -> UsageParse {
        let command: Vec<String> = command.iter().map(|s| s.to_string()).collect();
        parse_usage(&to_lines(text), &command)
    }

    #[test]
    fn test_simple_usage() {
        let usage = parse("usage: tool [-v] FILE", &["tool"]);
        assert_eq!(usage.flags.len(), 1);
        assert!(usage.flags[0].optional);
        assert_eq!(usage.positionals.len(), 1);
        assert_eq!(usage.positionals[0].name, "FILE");
        assert!(!usage.positionals[0].optional);
        assert_eq!(usage.lines, vec![0]);
    }

    #[test]
    fn test_required_flags_and_values() {
        let usage = parse("Usage: tool -i IN [-o OUT] [options] <ref.fa> [reads...]", &["tool"]);
        let names: Vec<Vec<&str>> = usage.flags.iter().map(|f| f.synonym_names()).collect();
        assert_eq!(names, vec![vec!["-i"], vec!["-o"]]);
        assert!(!usage.flags[0].optional);
        assert_eq!(usage.flags[1].args, helpscope_core::FlagArg::simple("OUT"));
        let positionals: Vec<(&str, bool)> = usage
            .positionals
            .iter()
            .map(|p| (p.name.as_str(), p.optional))
            .collect();
        assert_eq!(positionals, vec![("IN", false), ("ref.fa", false)]);
    }

    #[test]
    fn test_literals_and_choices() {
        let usage = parse("usage: git [--version] <command> [<args>]", &["git"]);
        let instance = &usage.instances[0];
        assert_eq!(instance.literals().count(), 0);
        assert_eq!(usage.positionals[0].name, "command");

        let usage = parse("usage: tool {add,remove} NAME", &["tool"]);
        assert_eq!(usage.positionals[0].name, "{add,remove}");

        let usage = parse("usage: tool remote add <name> <url>", &["tool"]);
        let literals: Vec<&str> = usage.instances[0].literals().collect();
        assert_eq!(literals, vec!["remote", "add"]);
    }

    #[test]
    fn test_program_name_variants() {
        let usage = parse("Usage: /usr/bin/tool FILE", &["tool"]);
        assert_eq!(usage.positionals[0].name, "FILE");

        let usage = parse("usage: commit [-a] PATH", &["git", "commit"]);
        assert_eq!(usage.positionals[0].name, "PATH");

        let usage = parse("usage: git commit [-a] PATH", &["git", "commit"]);
        assert_eq!(usage.positionals.len(), 1);
    }

    #[test]
    fn test_wrapped_and_alternative_synopses() {
        let text = "usage: tool [-h] [--foo FOO]\n            [--bar BAR] input\n   or: tool --list\n\nmore";
        let usage = parse(text, &["tool"]);
        assert_eq!(usage.instances.len(), 2);
        assert_eq!(usage.lines, vec![0, 1, 2]);
        assert_eq!(usage.flags.len(), 4);
        assert_eq!(usage.positionals[0].name, "input");
    }

    #[test]
    fn test_header_only_usage() {
        let text = "USAGE:\n    tool [OPTIONS] <FILE>...\n    tool --version";
        let usage = parse(text, &["tool"]);
        assert_eq!(usage.instances.len(), 2);
        assert_eq!(usage.positionals[0].name, "FILE...");
    }

    #[test]
    fn test_no_usage() {
        assert!(parse("just text", &["tool"]).is_empty());
    }
}
