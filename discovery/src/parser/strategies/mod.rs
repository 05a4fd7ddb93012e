//! Grammar branches for different help-output layouts.

pub mod flush;
pub mod gnu;
pub mod section;
pub mod usage;

use helpscope_core::{Flag, Positional};

use super::HelpParser;
use super::ast::ParseCandidate;
use super::block::Block;

/// One grammar branch.
///
/// Every branch reads the whole help text independently and returns at most
/// one candidate; [`select_best`](super::select::select_best) picks among
/// them. Lower [`priority`](ParserStrategy::priority) marks the more
/// structured branch and wins otherwise equal comparisons.
pub trait ParserStrategy: Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> u8;
    fn parse(&self, parser: &HelpParser) -> Option<ParseCandidate>;
}

static STRATEGIES: [&dyn ParserStrategy; 4] = [
    &section::SectionStrategy,
    &gnu::GnuStrategy,
    &flush::FlushStrategy,
    &usage::UsageStrategy,
];

/// All grammar branches in priority order.
pub fn strategies() -> &'static [&'static dyn ParserStrategy] {
    &STRATEGIES
}

/// Folds the blocks found by one branch into a candidate.
pub(super) fn candidate_from_blocks(
    strategy: &dyn ParserStrategy,
    blocks: Vec<Block>,
    extra_lines: &[usize],
) -> Option<ParseCandidate> {
    if blocks.is_empty() {
        return None;
    }
    let mut flags = Vec::new();
    let mut positionals: Vec<Positional> = Vec::new();
    let mut lines = extra_lines.to_vec();
    for block in blocks {
        flags.extend(block.flags);
        for positional in block.positionals {
            let position = positionals.len();
            positionals.push(Positional { position, ..positional });
        }
        lines.extend(block.lines);
    }
    Some(ParseCandidate::new(
        strategy.name(),
        strategy.priority(),
        Flag::deduplicate(flags),
        positionals,
        &lines,
    ))
}
