//! Indented-block parser strategy.
//!
//! Reads every indented two-column block regardless of headers, the way GNU
//! tools and many hand-written `--help` screens lay out their options.

use std::collections::HashSet;

use super::{ParserStrategy, candidate_from_blocks};
use crate::parser::HelpParser;
use crate::parser::ast::ParseCandidate;
use crate::parser::block::{BlockRules, parse_block, starts_block};

pub struct GnuStrategy;

const RULES: BlockRules = BlockRules {
    allow_positionals: true,
    min_indent: 1,
    baseline_continuation: true,
};

impl ParserStrategy for GnuStrategy {
    fn name(&self) -> &'static str {
        "gnu"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn parse(&self, parser: &HelpParser) -> Option<ParseCandidate> {
        let lines = parser.lines();
        let usage_lines: HashSet<usize> = parser.usage().lines.iter().copied().collect();
        let mut blocks = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = &lines[index];
            if usage_lines.contains(&line.index) || !starts_block(line, &RULES) {
                index += 1;
                continue;
            }
            match parse_block(lines, index, &RULES, parser.options().wrap_width, |l| parser.is_header(l)) {
                Some(block) => {
                    index = block.end.max(index + 1);
                    blocks.push(block);
                }
                None => index += 1,
            }
        }

        candidate_from_blocks(self, blocks, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn run(text: &str) -> Option<ParseCandidate> {
        let parser = HelpParser::new(ParseOptions::new(["ls"]), text);
        GnuStrategy.parse(&parser)
    }

    #[test]
    fn test_blocks_without_headers() {
        let text = "Usage: ls [OPTION]... [FILE]...\nList information about the FILEs.\n\n  -a, --all                  do not ignore entries starting with .\n  -A, --almost-all           do not list implied . and ..\n      --author               with -l, print the author of each file\n\nExit status:\n 0  if OK,\n";
        let candidate = run(text).unwrap();
        let names: Vec<String> = candidate.flags.iter().map(|f| f.full_name()).collect();
        assert_eq!(names, vec!["--all", "--almost-all", "--author"]);
        assert!(candidate.positionals.is_empty());
    }

    #[test]
    fn test_usage_continuations_are_skipped() {
        let text = "usage: tool [-a]\n       [-b] file\n\n  -a   alpha\n";
        let candidate = run(text).unwrap();
        assert_eq!(candidate.flags.len(), 1);
        assert_eq!(candidate.lines, vec![3]);
    }

    #[test]
    fn test_column_zero_is_ignored() {
        assert!(run("-v  verbose\n-q  quiet").is_none());
    }
}
