//! The command tree produced by parsing and exploration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Argument, Flag, Positional};

/// Lookup-only link from a subcommand to its parent.
///
/// Holds the parent's command tokens rather than a reference; the root of the
/// tree owns every node and [`Command::parent`] resolves the link through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub path: Vec<String>,
    pub depth: usize,
}

/// One element of a usage line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageElement {
    pub text: String,
    /// Placeholder (`<file>`, `FILE`) rather than a literal word.
    pub variable: bool,
    pub optional: bool,
    pub repeatable: bool,
}

/// A parsed `usage:` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInstance {
    pub text: String,
    #[serde(default)]
    pub elements: Vec<UsageElement>,
}

impl UsageInstance {
    /// Literal words that could name a subcommand.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.elements
            .iter()
            .filter(|element| !element.variable)
            .map(|element| element.text.as_str())
    }
}

/// A parsed command and its discovered subcommands.
///
/// # Examples
///
/// ```
/// use helpscope_core::{Command, Flag, Positional};
///
/// let mut root = Command::from_parts(
///     ["git"],
///     Vec::new(),
///     vec![Flag::switch(&["-h", "--help"]), Flag::switch(&["--version"])],
/// );
/// assert!(root.help_flag.is_some());
/// assert!(root.version_flag.is_some());
/// assert!(root.empty());
///
/// let commit = Command::from_parts(
///     ["git", "commit"],
///     vec![Positional::new("pathspec", 0).with_optional(true)],
///     vec![Flag::switch(&["-a", "--all"])],
/// );
/// root.attach(commit);
///
/// let child = root.subcommand("commit").unwrap();
/// assert_eq!(child.depth(), 1);
/// assert_eq!(child.parent(&root).unwrap().command, vec!["git"]);
/// assert_eq!(root.command_tree().count(), 2);
/// assert_eq!(child.as_filename(), "git_commit");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Command {
    /// Tokens used to invoke the command, e.g. `["samtools", "sort"]`.
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default)]
    pub positional: Vec<Positional>,
    #[serde(default)]
    pub named: Vec<Flag>,
    #[serde(default)]
    pub subcommands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_flag: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_flag: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_flag: Option<Flag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usage: Vec<UsageInstance>,
    /// Tool and version that produced this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_using: Option<String>,
    /// Help flag whose output this node was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_invocation: Option<String>,
}

const HELP_SPELLINGS: &[&str] = &["--help", "-help", "-h"];
const VERSION_SPELLINGS: &[&str] = &["--version", "-version"];
const USAGE_SPELLINGS: &[&str] = &["--usage"];

impl Command {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Builds a command, moving the help, version and usage flags out of
    /// `named` into their designated slots.
    pub fn from_parts<I, S>(command: I, positional: Vec<Positional>, named: Vec<Flag>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut built = Self::new(command);
        built.positional = positional;
        built.set_named(named);
        built
    }

    /// Replaces the flag list, re-extracting the designated flags.
    ///
    /// When several flags qualify for the same role the last one wins.
    pub fn set_named(&mut self, named: Vec<Flag>) {
        let mut kept = Vec::with_capacity(named.len());
        for flag in named {
            let (role, slot) = if flag.args.is_empty() && matches_any(&flag, HELP_SPELLINGS) {
                ("help", &mut self.help_flag)
            } else if flag.args.is_empty() && matches_any(&flag, VERSION_SPELLINGS) {
                ("version", &mut self.version_flag)
            } else if matches_any(&flag, USAGE_SPELLINGS) {
                ("usage", &mut self.usage_flag)
            } else {
                kept.push(flag);
                continue;
            };
            let name = flag.full_name();
            if let Some(previous) = slot.replace(flag) {
                debug!(
                    role,
                    previous = %previous.full_name(),
                    replacement = %name,
                    "replacing designated flag"
                );
            }
        }
        self.named = kept;
    }

    pub fn with_help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    pub fn with_generated_using(mut self, tool: impl Into<String>) -> Self {
        self.generated_using = Some(tool.into());
        self
    }

    /// Last command token, e.g. `"commit"` for `["git", "commit"]`.
    pub fn name(&self) -> &str {
        self.command.last().map(String::as_str).unwrap_or_default()
    }

    /// True when nothing at all was found for this command.
    pub fn empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty() && self.subcommands.is_empty()
    }

    /// Number of ancestors: 0 for the root, 1 for its subcommands.
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |parent| parent.depth + 1)
    }

    /// Resolves the parent link through the tree owned by `root`.
    pub fn parent<'a>(&self, root: &'a Command) -> Option<&'a Command> {
        let link = self.parent.as_ref()?;
        root.find(&link.path)
    }

    /// Walks `levels` steps up the tree; `ancestor(root, 0)` is `self`'s own node.
    pub fn ancestor<'a>(&self, root: &'a Command, levels: usize) -> Option<&'a Command> {
        let mut current = root.find(&self.command)?;
        for _ in 0..levels {
            current = current.parent(root)?;
        }
        Some(current)
    }

    /// Finds the node whose command tokens equal `path`.
    pub fn find(&self, path: &[String]) -> Option<&Command> {
        if self.command == path {
            return Some(self);
        }
        if !path.starts_with(&self.command) {
            return None;
        }
        self.subcommands.iter().find_map(|child| child.find(path))
    }

    /// Direct subcommand by its last token.
    pub fn subcommand(&self, name: &str) -> Option<&Command> {
        self.subcommands.iter().find(|child| child.name() == name)
    }

    /// Takes ownership of `child` and links it under `self`.
    pub fn attach(&mut self, mut child: Command) {
        child.set_parent(self.command.clone(), self.depth());
        self.subcommands.push(child);
    }

    /// Links `self` under `parent` without moving it into the tree.
    ///
    /// Used while a node is still being built on its own; [`Command::attach`]
    /// re-links it when it is finally placed.
    pub fn link_to(&mut self, parent: &Command) {
        self.set_parent(parent.command.clone(), parent.depth());
    }

    fn set_parent(&mut self, path: Vec<String>, parent_depth: usize) {
        self.parent = Some(ParentRef {
            path,
            depth: parent_depth,
        });
        let own_path = self.command.clone();
        let own_depth = parent_depth + 1;
        for child in &mut self.subcommands {
            child.set_parent(own_path.clone(), own_depth);
        }
    }

    /// Pre-order iterator over this node and all descendants.
    pub fn command_tree(&self) -> CommandTree<'_> {
        CommandTree { stack: vec![self] }
    }

    /// Height of the tree below this node (0 for a leaf).
    pub fn height(&self) -> usize {
        self.subcommands
            .iter()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Flags followed by positionals.
    pub fn arguments(&self) -> impl Iterator<Item = Argument<'_>> {
        self.named
            .iter()
            .map(Argument::Flag)
            .chain(self.positional.iter().map(Argument::Positional))
    }

    /// Arguments that name a file or directory the program writes to.
    pub fn outputs(&self) -> Vec<Argument<'_>> {
        self.arguments()
            .filter(|argument| argument.resolved_type().is_output())
            .collect()
    }

    /// Every flag spelling known for this command, designated flags included.
    pub fn all_synonyms(&self) -> Vec<&str> {
        self.named
            .iter()
            .chain(self.help_flag.iter())
            .chain(self.version_flag.iter())
            .chain(self.usage_flag.iter())
            .flat_map(|flag| flag.synonyms.iter().map(|s| s.name.as_str()))
            .collect()
    }

    /// File-name stem that is unique across the tree.
    ///
    /// Tokens are joined by `_`. ASCII letters, digits, `.` and `-` are kept
    /// and every other character, `_` included, is written as `%XX` per
    /// UTF-8 byte, so distinct command paths never share a stem.
    pub fn as_filename(&self) -> String {
        self.command
            .iter()
            .map(|token| {
                let mut escaped = String::with_capacity(token.len());
                for ch in token.chars() {
                    if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-') {
                        escaped.push(ch);
                    } else {
                        let mut buf = [0; 4];
                        for byte in ch.encode_utf8(&mut buf).bytes() {
                            escaped.push_str(&format!("%{byte:02X}"));
                        }
                    }
                }
                escaped
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Whether this node looks like a real subcommand of `parent` rather than
    /// the parent's own help printed again.
    pub fn is_valid_subcommand(&self, parent: &Command) -> bool {
        if self.help_text.is_some() && self.help_text == parent.help_text {
            return false;
        }
        if self.empty() {
            return true;
        }
        let same_flags = !self.named.is_empty()
            && self.named.len() == parent.named.len()
            && self
                .named
                .iter()
                .zip(&parent.named)
                .all(|(a, b)| a.synonyms == b.synonyms);
        let same_positionals = self.positional.len() == parent.positional.len()
            && self
                .positional
                .iter()
                .zip(&parent.positional)
                .all(|(a, b)| a.name == b.name);
        !(same_flags && same_positionals)
    }
}

fn matches_any(flag: &Flag, spellings: &[&str]) -> bool {
    flag.synonyms
        .iter()
        .any(|synonym| spellings.contains(&synonym.name.as_str()))
}

/// Iterator returned by [`Command::command_tree`].
pub struct CommandTree<'a> {
    stack: Vec<&'a Command>,
}

impl<'a> Iterator for CommandTree<'a> {
    type Item = &'a Command;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.subcommands.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlagArg, FlagSynonym};

    fn tree() -> Command {
        let mut root = Command::new(["tool"]);
        let mut remote = Command::new(["tool", "remote"]);
        remote.attach(Command::from_parts(
            ["tool", "remote", "add"],
            vec![Positional::new("name", 0)],
            Vec::new(),
        ));
        root.attach(remote);
        root.attach(Command::from_parts(
            ["tool", "init"],
            Vec::new(),
            vec![Flag::switch(&["--bare"])],
        ));
        root
    }

    #[test]
    fn test_designated_flags_are_extracted() {
        let cmd = Command::from_parts(
            ["tool"],
            Vec::new(),
            vec![
                Flag::switch(&["-h", "--help"]),
                Flag::switch(&["-V", "--version"]),
                Flag::switch(&["--usage"]),
                Flag::switch(&["-q"]),
            ],
        );
        assert_eq!(cmd.named.len(), 1);
        assert!(cmd.help_flag.is_some());
        assert!(cmd.version_flag.is_some());
        assert!(cmd.usage_flag.is_some());
        assert_eq!(cmd.all_synonyms().len(), 6);
    }

    #[test]
    fn test_value_taking_help_flag_is_kept() {
        let cmd = Command::from_parts(
            ["tool"],
            Vec::new(),
            vec![Flag::new(vec![FlagSynonym::new("-h", FlagArg::simple("HEIGHT"))])],
        );
        assert!(cmd.help_flag.is_none());
        assert_eq!(cmd.named.len(), 1);
    }

    #[test]
    fn test_later_help_flag_replaces_earlier() {
        let cmd = Command::from_parts(
            ["tool"],
            Vec::new(),
            vec![Flag::switch(&["-h"]), Flag::switch(&["--help"]), Flag::switch(&["-q"])],
        );
        assert_eq!(cmd.help_flag.unwrap().full_name(), "--help");
        assert_eq!(cmd.named.len(), 1);
    }

    #[test]
    fn test_depths_follow_attachment() {
        let root = tree();
        let depths: Vec<(String, usize)> = root
            .command_tree()
            .map(|cmd| (cmd.as_filename(), cmd.depth()))
            .collect();
        assert_eq!(
            depths,
            vec![
                ("tool".to_string(), 0),
                ("tool_remote".to_string(), 1),
                ("tool_remote_add".to_string(), 2),
                ("tool_init".to_string(), 1),
            ]
        );
        assert_eq!(root.height(), 2);
    }

    #[test]
    fn test_parent_and_ancestor_lookup() {
        let root = tree();
        let path: Vec<String> = ["tool", "remote", "add"].map(String::from).to_vec();
        let add = root.find(&path).unwrap();
        assert_eq!(add.parent(&root).unwrap().name(), "remote");
        assert_eq!(add.ancestor(&root, 2).unwrap().name(), "tool");
        assert!(add.ancestor(&root, 3).is_none());
        assert!(root.parent(&root).is_none());
    }

    #[test]
    fn test_filenames_distinguish_siblings() {
        let root = tree();
        let mut names: Vec<String> = root.command_tree().map(Command::as_filename).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
        assert_eq!(Command::new(["my-tool", "sub"]).as_filename(), "my-tool_sub");
        assert_eq!(Command::new(["tool", "a b"]).as_filename(), "tool_a%20b");
    }

    #[test]
    fn test_filenames_keep_separator_variants_apart() {
        let dashed = Command::new(["tool", "foo-bar"]).as_filename();
        let underscored = Command::new(["tool", "foo_bar"]).as_filename();
        assert_ne!(dashed, underscored);
        assert_eq!(underscored, "tool_foo%5Fbar");
        assert_ne!(
            Command::new(["a_", "b"]).as_filename(),
            Command::new(["a", "_b"]).as_filename()
        );
    }

    #[test]
    fn test_empty_command() {
        assert!(Command::new(["tool"]).empty());
        assert!(!tree().empty());
    }

    #[test]
    fn test_repeated_parent_help_is_not_a_subcommand() {
        let parent = Command::from_parts(["tool"], Vec::new(), vec![Flag::switch(&["-v"])])
            .with_help_text("usage: tool [-v]");
        let echo = Command::from_parts(["tool", "x"], Vec::new(), vec![Flag::switch(&["-v"])])
            .with_help_text("usage: tool [-v] ");
        assert!(!echo.is_valid_subcommand(&parent));

        let same_text = Command::new(["tool", "y"]).with_help_text("usage: tool [-v]");
        assert!(!same_text.is_valid_subcommand(&parent));

        let real = Command::from_parts(["tool", "z"], Vec::new(), vec![Flag::switch(&["-f"])])
            .with_help_text("usage: tool z [-f]");
        assert!(real.is_valid_subcommand(&parent));
    }

    #[test]
    fn test_usage_literals() {
        let usage = UsageInstance {
            text: "tool add <name>".into(),
            elements: vec![
                UsageElement {
                    text: "add".into(),
                    variable: false,
                    optional: false,
                    repeatable: false,
                },
                UsageElement {
                    text: "name".into(),
                    variable: true,
                    optional: false,
                    repeatable: false,
                },
            ],
        };
        assert_eq!(usage.literals().collect::<Vec<_>>(), vec!["add"]);
    }
}
