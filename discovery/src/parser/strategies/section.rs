//! Section-header parser strategy.
//!
//! Handles help text organised under headers such as `Options:`,
//! `positional arguments:` or `Available Commands:`, including headers that
//! carry their first entry inline (`Command: index   index sequences`).

use std::sync::LazyLock;

use regex::Regex;

use super::{ParserStrategy, candidate_from_blocks};
use crate::parser::ast::ParseCandidate;
use crate::parser::block::{BlockRules, parse_block};
use crate::parser::lexer::lex_flag_row;
use crate::parser::{HelpParser, Line};

pub struct SectionStrategy;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^((?:[a-z][\w-]*\s+){0,3}(?:options?|flags?|arguments?|args|parameters?|commands?|subcommands?|positionals?))\s*:\s*(.*)$",
    )
    .expect("static regex must compile")
});

static POSITIONAL_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:arguments?|args|commands?|subcommands?|positionals?|parameters?)\b")
        .expect("static regex must compile")
});

impl ParserStrategy for SectionStrategy {
    fn name(&self) -> &'static str {
        "section"
    }

    fn priority(&self) -> u8 {
        0
    }

    fn parse(&self, parser: &HelpParser) -> Option<ParseCandidate> {
        let lines = parser.lines();
        let mut blocks = Vec::new();
        let mut headers = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = &lines[index];
            let Some(captures) = HEADER_RE.captures(&line.text) else {
                index += 1;
                continue;
            };
            let header = captures.get(1).map_or("", |m| m.as_str());
            let remainder = captures.get(2).map_or("", |m| m.as_str());
            let allow_positionals = POSITIONAL_HEADER_RE.is_match(header)
                && !header.to_lowercase().starts_with("optional");

            let parsed = if remainder.trim().is_empty() {
                let Some(start) = (index + 1..lines.len()).find(|&i| !lines[i].text.is_empty()) else {
                    break;
                };
                let first = &lines[start];
                let flush_flags = first.indent == line.indent && lex_flag_row(&first.text).is_some();
                let rules = BlockRules {
                    allow_positionals,
                    min_indent: if flush_flags { line.indent } else { line.indent + 1 },
                    baseline_continuation: !flush_flags,
                };
                parse_block(lines, start, &rules, parser.options().wrap_width, |l| parser.is_header(l))
                    .map(|block| (block, 0))
            } else {
                let column = line.indent + (line.text.chars().count() - remainder.chars().count());
                let mut inline = Vec::with_capacity(lines.len() - index);
                inline.push(Line {
                    index: line.index,
                    indent: column,
                    width: line.width,
                    text: remainder.to_string(),
                });
                inline.extend_from_slice(&lines[index + 1..]);
                let rules = BlockRules {
                    allow_positionals,
                    min_indent: line.indent + 1,
                    baseline_continuation: true,
                };
                parse_block(&inline, 0, &rules, parser.options().wrap_width, |l| parser.is_header(l))
                    .map(|block| (block, index))
            };

            // `block.end` is relative to the slice the block was parsed from.
            match parsed {
                Some((block, offset)) => {
                    headers.push(line.index);
                    index = offset + block.end.max(1);
                    blocks.push(block);
                }
                None => index += 1,
            }
        }

        candidate_from_blocks(self, blocks, &headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn run(text: &str) -> Option<ParseCandidate> {
        let parser = HelpParser::new(ParseOptions::new(["tool"]), text);
        SectionStrategy.parse(&parser)
    }

    #[test]
    fn test_argparse_sections() {
        let text = "usage: tool [-h] input\n\npositional arguments:\n  input       the input file\n\noptional arguments:\n  -h, --help  show this help message and exit\n  -q          quiet\n";
        let candidate = run(text).unwrap();
        assert_eq!(candidate.positionals.len(), 1);
        assert_eq!(candidate.positionals[0].name, "input");
        assert_eq!(candidate.flags.len(), 2);
        assert_eq!(candidate.span.line_start, 2);
    }

    #[test]
    fn test_inline_header() {
        let text = "Command: index         index sequences in the FASTA format\n         mem           BWA-MEM algorithm\n         fastmap       identify super-maximal exact matches\n";
        let candidate = run(text).unwrap();
        let names: Vec<&str> = candidate.positionals.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["index", "mem", "fastmap"]);
        assert_eq!(candidate.longest_run, 3);
    }

    #[test]
    fn test_flush_flags_under_header() {
        let text = "Options:\n-v  verbose\n-q  quiet\n";
        let candidate = run(text).unwrap();
        assert_eq!(candidate.flags.len(), 2);
    }

    #[test]
    fn test_positionals_across_sections_are_renumbered() {
        let text = "Arguments:\n  a   first thing\n\nCommands:\n  run   run it\n  stop  stop it\n";
        let candidate = run(text).unwrap();
        let positions: Vec<(&str, usize)> = candidate
            .positionals
            .iter()
            .map(|p| (p.name.as_str(), p.position))
            .collect();
        assert_eq!(positions, vec![("a", 0), ("run", 1), ("stop", 2)]);
    }

    #[test]
    fn test_prose_at_entry_column_continues() {
        let text = "Options:\n  -o FILE   output file\n  (default: stdout)\n  -v        verbose\n";
        let candidate = run(text).unwrap();
        let names: Vec<String> = candidate.flags.iter().map(|f| f.full_name()).collect();
        assert_eq!(names, vec!["-o", "-v"]);
        assert_eq!(
            candidate.flags[0].description.as_deref(),
            Some("output file (default: stdout)")
        );
    }

    #[test]
    fn test_no_headers() {
        assert!(run("  -v  verbose").is_none());
    }
}
