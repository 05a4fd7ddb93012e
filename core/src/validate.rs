//! Structural validation of command trees.
//!
//! Catches trees that break the model's invariants: unnamed commands, flags
//! without spellings, a spelling claimed by two flags, gaps in positional
//! ordering, subcommands whose tokens or parent links do not extend their
//! parent, and duplicate identifiers.
//!
//! # Examples
//!
//! ```
//! use helpscope_core::*;
//!
//! let cmd = Command::from_parts(["tool"], Vec::new(), vec![Flag::switch(&["-v", "--verbose"])]);
//! assert!(validate_command(&cmd).is_empty());
//!
//! let bad = Command::from_parts(
//!     ["tool"],
//!     Vec::new(),
//!     vec![Flag::switch(&["-v"]), Flag::switch(&["-v", "--verbose"])],
//! );
//! assert_eq!(
//!     validate_command(&bad),
//!     vec![ValidationError::DuplicateSynonym { command: "tool".into(), synonym: "-v".into() }]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::Command;

/// Command tree validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Command has no tokens or a blank token.
    #[error("command tokens cannot be empty")]
    EmptyCommandName,
    /// A flag has no spellings at all.
    #[error("{command}: flag has no synonyms")]
    MissingSynonym { command: String },
    /// A spelling does not start with a dash.
    #[error("{command}: invalid flag spelling `{synonym}`")]
    InvalidSynonym { command: String, synonym: String },
    /// Two flags of one command share a spelling.
    #[error("{command}: synonym `{synonym}` belongs to more than one flag")]
    DuplicateSynonym { command: String, synonym: String },
    /// Positionals are not numbered 0, 1, 2, ... in order.
    #[error("{command}: positional `{name}` has position {found}, expected {expected}")]
    PositionGap {
        command: String,
        name: String,
        expected: usize,
        found: usize,
    },
    /// A subcommand's tokens are not its parent's tokens plus one.
    #[error("{command}: subcommand path does not extend its parent")]
    SubcommandPath { command: String },
    /// A subcommand's parent link points elsewhere.
    #[error("{command}: parent link does not match the owning node")]
    ParentMismatch { command: String },
    /// Two subcommands of one command share a name.
    #[error("{command}: duplicate subcommand `{name}`")]
    DuplicateSubcommand { command: String, name: String },
    /// Two arguments of one command share an identifier.
    #[error("{command}: duplicate identifier `{identifier}`")]
    DuplicateIdentifier { command: String, identifier: String },
}

/// Validates a command and all of its subcommands.
pub fn validate_command(command: &Command) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_node(command, &mut errors);
    errors
}

fn validate_node(command: &Command, errors: &mut Vec<ValidationError>) {
    let label = command.command.join(" ");
    if command.command.is_empty() || command.command.iter().any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::EmptyCommandName);
    }

    let mut seen_synonyms: HashSet<&str> = HashSet::new();
    for flag in &command.named {
        if flag.synonyms.is_empty() {
            errors.push(ValidationError::MissingSynonym {
                command: label.clone(),
            });
        }
        for synonym in &flag.synonyms {
            let name = synonym.name.as_str();
            if !name.starts_with('-') || name.trim_start_matches('-').is_empty() {
                errors.push(ValidationError::InvalidSynonym {
                    command: label.clone(),
                    synonym: name.to_string(),
                });
            }
            if !seen_synonyms.insert(name) {
                errors.push(ValidationError::DuplicateSynonym {
                    command: label.clone(),
                    synonym: name.to_string(),
                });
            }
        }
    }

    for (expected, positional) in command.positional.iter().enumerate() {
        if positional.position != expected {
            errors.push(ValidationError::PositionGap {
                command: label.clone(),
                name: positional.name.clone(),
                expected,
                found: positional.position,
            });
        }
    }

    let mut seen_identifiers: HashSet<&str> = HashSet::new();
    for identifier in command.arguments().filter_map(|argument| argument.identifier()) {
        if !seen_identifiers.insert(identifier) {
            errors.push(ValidationError::DuplicateIdentifier {
                command: label.clone(),
                identifier: identifier.to_string(),
            });
        }
    }

    let mut seen_children: HashSet<&str> = HashSet::new();
    for child in &command.subcommands {
        let child_label = child.command.join(" ");
        let extends = child.command.len() == command.command.len() + 1
            && child.command.starts_with(&command.command);
        if !extends {
            errors.push(ValidationError::SubcommandPath {
                command: child_label.clone(),
            });
        }
        let linked = child
            .parent
            .as_ref()
            .is_some_and(|link| link.path == command.command && link.depth == command.depth());
        if !linked {
            errors.push(ValidationError::ParentMismatch {
                command: child_label,
            });
        }
        if !seen_children.insert(child.name()) {
            errors.push(ValidationError::DuplicateSubcommand {
                command: label.clone(),
                name: child.name().to_string(),
            });
        }
        validate_node(child, errors);
    }
}
