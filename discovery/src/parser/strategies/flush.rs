//! Column-zero parser strategy.
//!
//! Some tools print their flags flush against the left margin with the
//! description on the same row or indented below it.

use super::{ParserStrategy, candidate_from_blocks};
use crate::parser::HelpParser;
use crate::parser::ast::ParseCandidate;
use crate::parser::block::{BlockRules, parse_block};
use crate::parser::lexer::lex_flag_row;

pub struct FlushStrategy;

const RULES: BlockRules = BlockRules {
    allow_positionals: false,
    min_indent: 0,
    baseline_continuation: false,
};

impl ParserStrategy for FlushStrategy {
    fn name(&self) -> &'static str {
        "flush"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn parse(&self, parser: &HelpParser) -> Option<ParseCandidate> {
        let lines = parser.lines();
        let mut blocks = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = &lines[index];
            if line.indent != 0 || lex_flag_row(&line.text).is_none() {
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
