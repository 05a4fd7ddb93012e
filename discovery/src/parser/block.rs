//! Definition-block parsing shared by the grammar branches.
//!
//! A block is a run of flag (and optionally positional) definitions with
//! their wrapped descriptions. Branches differ only in where blocks may start
//! and in the [`BlockRules`] they apply.

use helpscope_core::{Flag, FlagArg, FlagSynonym, Positional};
use tracing::trace;

use super::Line;
use super::indent::{IndentTracker, LineRole, LineShape};
use super::lexer::{FlagRow, PositionalRow, lex_flag_row, lex_positional_row};

/// Constraints a grammar branch places on its blocks.
#[derive(Debug, Clone, Copy)]
pub struct BlockRules {
    pub allow_positionals: bool,
    /// Entries indented less than this end the block.
    pub min_indent: usize,
    /// Non-entry lines at the entry column continue the previous description
    /// instead of ending the block.
    pub baseline_continuation: bool,
}

/// Definitions found in one block.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub flags: Vec<Flag>,
    pub positionals: Vec<Positional>,
    /// [`Line::index`] of every line the block consumed, blank separators
    /// included.
    pub lines: Vec<usize>,
    /// Position in the input slice of the first line after the block.
    pub end: usize,
}

enum EntryKind {
    Flag(Vec<FlagSynonym>),
    Positional { name: String, optional: bool },
}

struct Pending {
    kind: EntryKind,
    description: Vec<String>,
    values: Vec<String>,
}

impl Pending {
    fn flag(row: FlagRow) -> Self {
        Self {
            kind: EntryKind::Flag(row.synonyms),
            description: row.description.into_iter().collect(),
            values: Vec::new(),
        }
    }

    fn positional(row: PositionalRow) -> Self {
        Self {
            kind: EntryKind::Positional {
                name: row.name,
                optional: row.optional,
            },
            description: vec![row.description],
            values: Vec::new(),
        }
    }
}

enum Entry {
    Flag(FlagRow),
    Positional(PositionalRow),
}

impl Entry {
    fn description_column(&self, indent: usize) -> Option<usize> {
        match self {
            Self::Flag(row) => row.description_offset.map(|offset| indent + offset),
            Self::Positional(row) => Some(indent + row.description_offset),
        }
    }

    fn entry_columns(&self, indent: usize) -> Vec<usize> {
        match self {
            Self::Flag(row) => row.spelling_columns.iter().map(|column| indent + column).collect(),
            Self::Positional(_) => vec![indent],
        }
    }
}

fn lex_entry(text: &str, rules: &BlockRules) -> Option<Entry> {
    if let Some(row) = lex_flag_row(text) {
        return Some(Entry::Flag(row));
    }
    if rules.allow_positionals {
        return lex_positional_row(text).map(Entry::Positional);
    }
    None
}

/// Whether `line` could open a block under `rules`.
pub fn starts_block(line: &Line, rules: &BlockRules) -> bool {
    !line.text.is_empty() && line.indent >= rules.min_indent && lex_entry(&line.text, rules).is_some()
}

/// Parses the block whose first entry is `lines[start]`.
///
/// Returns `None` when that line is not an entry.
pub fn parse_block(
    lines: &[Line],
    start: usize,
    rules: &BlockRules,
    wrap_width: Option<usize>,
    is_header: impl Fn(&Line) -> bool,
) -> Option<Block> {
    let first = lines.get(start)?;
    if !starts_block(first, rules) {
        return None;
    }

    let mut tracker = IndentTracker::new(first.indent, rules.min_indent, rules.baseline_continuation);
    let mut block = Block::default();
    let mut pending: Option<Pending> = None;
    let mut previous_width = 0;
    let mut index = start;

    while index < lines.len() {
        let line = &lines[index];

        if line.text.is_empty() {
            let next = lines[index + 1..].iter().find(|l| !l.text.is_empty());
            let resumes = next.is_some_and(|next| {
                let shape = shape_of(next, rules, pending.is_some(), false, &is_header);
                shape.entry && tracker.clone().classify(shape) == LineRole::Entry
            });
            if !resumes {
                break;
            }
            block.lines.push(index);
            index += 1;
            previous_width = 0;
            continue;
        }

        let wrapped = wrap_width.is_some_and(|width| previous_width >= width.saturating_sub(1));
        let expects_values = pending
            .as_ref()
            .is_some_and(|p| matches!(p.kind, EntryKind::Flag(_)));
        let shape = shape_of(line, rules, expects_values, wrapped, &is_header);

        match tracker.classify(shape) {
            LineRole::Entry => {
                let Some(entry) = lex_entry(&line.text, rules) else {
                    break;
                };
                finish(pending.take(), &mut block);
                tracker.add_entry_columns(entry.entry_columns(line.indent));
                tracker.set_description_column(entry.description_column(line.indent));
                pending = Some(match entry {
                    Entry::Flag(row) => Pending::flag(row),
                    Entry::Positional(row) => Pending::positional(row),
                });
            }
            LineRole::Continuation => {
                let Some(current) = pending.as_mut() else {
                    break;
                };
                if tracker.description_column().is_none() {
                    tracker.set_description_column(Some(line.indent));
                }
                current.description.push(line.text.clone());
            }
            LineRole::NestedItem => {
                let Some(current) = pending.as_mut() else {
                    break;
                };
                if let Some(row) = lex_positional_row(&line.text) {
                    current.values.push(row.name);
                }
                current.description.push(line.text.clone());
            }
            LineRole::EndOfBlock => break,
        }

        block.lines.push(index);
        previous_width = line.width;
        index += 1;
    }

    finish(pending, &mut block);
    while block.lines.last().is_some_and(|&i| lines[i].text.is_empty()) {
        block.lines.pop();
    }
    block.lines = block.lines.iter().map(|&i| lines[i].index).collect();
    block.end = index;
    trace!(
        start,
        end = block.end,
        flags = block.flags.len(),
        positionals = block.positionals.len(),
        "parsed definition block"
    );
    (!block.flags.is_empty() || !block.positionals.is_empty()).then_some(block)
}

fn shape_of(
    line: &Line,
    rules: &BlockRules,
    expects_values: bool,
    wrapped: bool,
    is_header: &impl Fn(&Line) -> bool,
) -> LineShape {
    let entry = lex_entry(&line.text, rules).is_some();
    LineShape {
        indent: line.indent,
        entry,
        nested: expects_values && !line.text.starts_with('-') && lex_positional_row(&line.text).is_some(),
        header: !entry && is_header(line),
        wrapped,
    }
}

fn finish(pending: Option<Pending>, block: &mut Block) {
    let Some(pending) = pending else {
        return;
    };
    let description = pending.description.join(" ");
    match pending.kind {
        EntryKind::Flag(synonyms) => {
            let mut flag = Flag::new(synonyms).with_description(description);
            let takes_one = matches!(flag.args, FlagArg::Simple { .. } | FlagArg::Optional { .. })
                && flag.args.num_args() == 1;
            if takes_one && pending.values.len() >= 2 {
                flag.set_args(FlagArg::choice(pending.values));
            }
            block.flags.push(flag);
        }
        EntryKind::Positional { name, optional } => {
            let position = block.positionals.len();
            block.positionals.push(
                Positional::new(name, position)
                    .with_description(description)
                    .with_optional(optional),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize::to_lines;

    const RULES: BlockRules = BlockRules {
        allow_positionals: true,
        min_indent: 0,
        baseline_continuation: false,
    };

    const INDENTED: BlockRules = BlockRules {
        allow_positionals: false,
        min_indent: 1,
        baseline_continuation: true,
    };

    fn no_header(_: &Line) -> bool {
        false
    }

    #[test]
    fn test_wrapped_descriptions() {
        let text = "  -o, --output FILE   write the result\n                        to FILE\n  -q                    quiet";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &RULES, None, no_header).unwrap();
        assert_eq!(block.flags.len(), 2);
        assert_eq!(block.flags[0].description.as_deref(), Some("write the result to FILE"));
        assert_eq!(block.flags[0].args, FlagArg::simple("FILE"));
        assert_eq!(block.lines, vec![0, 1, 2]);
        assert_eq!(block.end, 3);
    }

    #[test]
    fn test_description_on_next_line() {
        let text = "  --threads INT\n      number of threads\n  --fast\n      go fast";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &RULES, None, no_header).unwrap();
        assert_eq!(block.flags.len(), 2);
        assert_eq!(block.flags[0].description.as_deref(), Some("number of threads"));
        assert_eq!(block.flags[1].description.as_deref(), Some("go fast"));
    }

    #[test]
    fn test_nested_values_become_choices() {
        let text = "  --mode MODE    processing mode\n      fast       quick and loose\n      exact      slow and careful\n  -v             verbose";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &RULES, None, no_header).unwrap();
        assert_eq!(block.flags[0].args, FlagArg::choice(["fast", "exact"]));
        assert_eq!(block.flags.len(), 2);
    }

    #[test]
    fn test_blank_line_then_prose_ends_block() {
        let text = "  -a   all\n\nReport bugs to someone.\n";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &RULES, None, no_header).unwrap();
        assert_eq!(block.flags.len(), 1);
        assert_eq!(block.lines, vec![0]);
    }

    #[test]
    fn test_blank_line_between_entries() {
        let text = "  -a   all\n\n  -b   both";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &RULES, None, no_header).unwrap();
        assert_eq!(block.flags.len(), 2);
        assert_eq!(block.lines, vec![0, 1, 2]);
    }

    #[test]
    fn test_positionals_numbered_in_order() {
        let text = "  input     file to read\n  output    file to write";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &RULES, None, no_header).unwrap();
        let positions: Vec<(&str, usize)> = block
            .positionals
            .iter()
            .map(|p| (p.name.as_str(), p.position))
            .collect();
        assert_eq!(positions, vec![("input", 0), ("output", 1)]);
    }

    #[test]
    fn test_deeper_flag_text_continues_description() {
        let text = "  --threads INT\n      -1 means use all cores\n  -v   verbose";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &INDENTED, None, no_header).unwrap();
        let names: Vec<String> = block.flags.iter().map(|f| f.full_name()).collect();
        assert_eq!(names, vec!["--threads", "-v"]);
        assert_eq!(
            block.flags[0].description.as_deref(),
            Some("-1 means use all cores")
        );
    }

    #[test]
    fn test_long_only_flag_aligned_with_long_spelling() {
        let text = "  -a, --all       all entries\n      --author    print the author\n  -b              escapes";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &INDENTED, None, no_header).unwrap();
        let names: Vec<String> = block.flags.iter().map(|f| f.full_name()).collect();
        assert_eq!(names, vec!["--all", "--author", "-b"]);
    }

    #[test]
    fn test_baseline_prose_is_appended() {
        let text = "  -o FILE   output file\n  (default: stdout)\n  -v        verbose\n\nMore text.";
        let lines = to_lines(text);
        let block = parse_block(&lines, 0, &INDENTED, None, no_header).unwrap();
        assert_eq!(block.flags.len(), 2);
        assert_eq!(
            block.flags[0].description.as_deref(),
            Some("output file (default: stdout)")
        );
        assert_eq!(block.lines, vec![0, 1, 2]);
    }

    #[test]
    fn test_not_an_entry() {
        let lines = to_lines("just some prose");
        assert!(parse_block(&lines, 0, &RULES, None, no_header).is_none());
    }
}
