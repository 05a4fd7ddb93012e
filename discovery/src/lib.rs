//! Help-text parsing and recursive subcommand exploration.
//!
//! This crate turns the free-form `--help` output of a command-line program
//! into a [`Command`] tree described by [`helpscope_core`].
//!
//! # Main entry points
//!
//! - [`parse_help`]: parse pre-captured help text without running anything.
//! - [`Explorer`]: run a program through an [`Executor`], parse its help and
//!   recursively discover its subcommands.
//! - [`output::render`] and [`output::write_tree`]: serialize the result.
//!
//! # Example
//!
//! ```
//! use helpscope_discovery::parse_help;
//! use helpscope_core::CliType;
//!
//! let help = "\
//! usage: mycli [-v] [-o PATH] FILE
//!
//! Options:
//!   -v, --verbose         Enable verbose output
//!   -o, --output PATH     Output file to write
//!   -h, --help            Print help
//! ";
//!
//! let cmd = parse_help(&["mycli"], help);
//! assert_eq!(cmd.named.len(), 2);
//! assert!(cmd.help_flag.is_some());
//! assert_eq!(cmd.positional[0].name, "FILE");
//! assert_eq!(cmd.named[1].cli_type, Some(CliType::File { output: true }));
//! ```

pub mod executor;
pub mod explore;
pub mod output;
pub mod parser;
pub mod report;

use std::collections::HashSet;

use helpscope_core::{Command, annotate_types};

pub use executor::{ContainerExecutor, ExecError, Executor, Invocation, LocalExecutor};
pub use explore::{
    CancelToken, Exploration, ExploreConfig, ExploreError, Explorer, ProbeOutcome, subcommand_candidates,
};
pub use output::{Manifest, OutputError, OutputFormat};
pub use parser::{HelpParser, ParseCandidate, ParseOptions};
pub use report::{ExplorationReport, ProbeRecord, ProbeStatus};

/// Provenance string stored on every parsed command.
pub const GENERATED_USING: &str = concat!("helpscope ", env!("CARGO_PKG_VERSION"));

/// Parses help text printed by `command`.
///
/// Never fails: text with no recognizable arguments yields an
/// [`empty`](Command::empty) command.
pub fn parse_help<S: AsRef<str>>(command: &[S], help_text: &str) -> Command {
    let options = ParseOptions::new(command.iter().map(|token| token.as_ref().to_string()));
    parse_help_with(&options, help_text)
}

/// Like [`parse_help`] with explicit parser hints.
pub fn parse_help_with(options: &ParseOptions, help_text: &str) -> Command {
    HelpParser::new(options.clone(), help_text).parse()
}

/// Every grammar branch's candidate for `help_text`, unranked.
///
/// # Examples
///
/// ```
/// use helpscope_discovery::{ParseOptions, parse_candidates, parser::select_best};
///
/// let text = "usage: tool [-q] IN\n\n  -q  quiet\n";
/// let candidates = parse_candidates(&ParseOptions::new(["tool"]), text);
/// assert!(candidates.len() >= 2);
/// let best = select_best(candidates).unwrap();
/// assert_eq!(best.arg_count(), 2);
/// ```
pub fn parse_candidates(options: &ParseOptions, help_text: &str) -> Vec<ParseCandidate> {
    HelpParser::new(options.clone(), help_text).candidates()
}

/// Rebuilds a tree from the help text stored on its nodes.
///
/// Subcommand structure is kept; every node that carries help text is parsed
/// again with the current parser. `options` supplies the wrap width and line
/// limit; command tokens and the help flag come from each node.
pub fn reparse(command: &Command, options: &ParseOptions) -> Command {
    let mut rebuilt = reparse_node(command, options);
    annotate_types(&mut rebuilt);
    rebuilt
}

fn reparse_node(command: &Command, options: &ParseOptions) -> Command {
    let mut rebuilt = match command.help_text.as_deref() {
        Some(text) => {
            let mut node_options = options.clone();
            node_options.command = command.command.clone();
            node_options.help_flag = command.help_invocation.clone().filter(|flag| !flag.is_empty());
            let mut parsed = HelpParser::new(node_options, text).parse();
            parsed.help_invocation = command.help_invocation.clone();
            parsed
        }
        None => {
            let mut bare = command.clone();
            bare.subcommands.clear();
            bare
        }
    };
    rebuilt.parent = command.parent.clone();

    let mut names = HashSet::new();
    for child in &command.subcommands {
        names.insert(child.name().to_string());
        rebuilt.attach(reparse_node(child, options));
    }
    if !names.is_empty() {
        explore::remove_subcommand_positionals(&mut rebuilt, &names);
    }
    rebuilt
}
