//! Command model and type inference for help-text interface discovery.
//!
//! This crate defines the data model produced when a program's `--help`
//! output is turned into a machine-usable interface description:
//!
//! - [`CliType`]: the closed set of semantic value types.
//! - [`Flag`] (with its [`FlagSynonym`] spellings and [`FlagArg`] pattern)
//!   and [`Positional`]: the two kinds of argument.
//! - [`Command`]: a node of the command tree, owning its subcommands and
//!   linking back to its parent by path only.
//!
//! Type inference ([`infer_flag_type`], [`infer_positional_type`],
//! [`annotate_types`]) maps textual cues onto a [`CliType`]. Merging
//! ([`Flag::merge`], [`Flag::deduplicate`]) folds repeated sightings of the
//! same option. Identifier generation ([`assign_identifiers`]) produces
//! machine-safe names, and [`validate_command`] checks tree invariants.
//!
//! # Example
//!
//! ```
//! use helpscope_core::*;
//!
//! let mut cmd = Command::from_parts(
//!     ["tool"],
//!     vec![Positional::new("FILE", 0)],
//!     vec![
//!         Flag::switch(&["-v", "--verbose"]).with_description("Enable verbose output"),
//!         Flag::new(vec![FlagSynonym::new("--format", FlagArg::choice(["json", "yaml"]))]),
//!         Flag::switch(&["-h", "--help"]),
//!     ],
//! );
//! annotate_types(&mut cmd);
//! assign_identifiers(&mut cmd, Case::Snake);
//!
//! assert_eq!(cmd.named.len(), 2);
//! assert!(cmd.help_flag.is_some());
//! assert_eq!(cmd.positional[0].cli_type, Some(CliType::File { output: false }));
//! assert_eq!(cmd.named[1].identifier.as_deref(), Some("format"));
//! assert!(validate_command(&cmd).is_empty());
//! ```

mod argument;
mod command;
mod infer;
mod merge;
mod naming;
mod types;
mod validate;

pub use argument::{Argument, Flag, FlagArg, FlagSynonym, Positional};
pub use command::{Command, CommandTree, ParentRef, UsageElement, UsageInstance};
pub use infer::{annotate_types, infer_arg_type, infer_flag_type, infer_positional_type, infer_type};
pub use naming::{
    Case, IdentifierGenerator, ParseCaseError, RESERVED_IDENTIFIERS, assign_identifiers, name_words,
};
pub use types::CliType;
pub use validate::{ValidationError, validate_command};
