//! Recursive subcommand exploration.
//!
//! The [`Explorer`] probes a command through an [`Executor`], parses the
//! help text it prints and then probes every word that looks like a
//! subcommand of it, building one [`Command`] tree. Sibling subtrees are
//! explored in parallel on a rayon pool; each worker owns the subtree it
//! builds and the parent takes it over once the worker returns.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use helpscope_core::{Case, Command, Flag, Positional, annotate_types, assign_identifiers};
use rayon::prelude::*;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::executor::Executor;
use crate::parser::{HelpParser, ParseOptions};
use crate::report::{ExplorationReport, ProbeRecord, ProbeStatus};

/// Help flags tried in order when none are configured.
pub const DEFAULT_HELP_FLAGS: &[&str] = &["--help", "-h", "", "--usage"];

/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Separators tried when naming a subcommand's man page (`git-commit`).
const MAN_SEPARATORS: &[&str] = &["-", "_"];

/// Flags passed to `man` ahead of the page name.
const MAN_FLAGS: &[&str] = &["--no-subpages"];

static COMMAND_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:[-_][a-z0-9]+)*$").expect("static regex must compile")
});

/// Placeholder words that never name a subcommand.
const NOT_SUBCOMMANDS: &[&str] = &[
    "arg", "args", "argument", "arguments", "cmd", "command", "commands", "dir", "directory",
    "file", "filename", "files", "input", "inputs", "name", "number", "option", "options",
    "output", "path", "paths", "pattern", "prefix", "string", "subcommand", "target", "text",
    "value", "values", "a", "an", "and", "for", "of", "or", "the", "to", "with",
];

/// Exploration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreConfig {
    /// Subcommand levels below the root; 0 disables discovery.
    pub max_depth: usize,
    /// Naming convention for generated identifiers.
    pub case: Case,
    /// Keep positional arguments in the result.
    pub infer_positionals: bool,
    /// Attempt subcommand discovery at all.
    pub subcommands: bool,
    /// Flags appended to the command to obtain help; `""` runs it bare.
    pub help_flags: Vec<String>,
    pub timeout: Duration,
    /// Parallel sibling workers; `None` picks from the available cores.
    pub jobs: Option<usize>,
    /// Try every help flag for subcommands too. When false a child only
    /// tries the flag that worked for its parent.
    pub try_subcommand_flags: bool,
    /// Accept output from subcommand probes that exit non-zero.
    pub accept_nonzero_subcommands: bool,
    /// Fall back to `man <page>` when no help flag prints anything usable.
    pub man_pages: bool,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            case: Case::default(),
            infer_positionals: true,
            subcommands: true,
            help_flags: DEFAULT_HELP_FLAGS.iter().map(|flag| flag.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            jobs: None,
            try_subcommand_flags: true,
            accept_nonzero_subcommands: false,
            man_pages: false,
        }
    }
}

impl ExploreConfig {
    /// Moves `flag` to the front of the help flags, adding it if missing.
    pub fn with_help_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        self.help_flags.retain(|existing| *existing != flag);
        self.help_flags.insert(0, flag);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_case(mut self, case: Case) -> Self {
        self.case = case;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn with_man_pages(mut self, man_pages: bool) -> Self {
        self.man_pages = man_pages;
        self
    }

    fn worker_count(&self) -> usize {
        self.jobs.filter(|jobs| *jobs > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|parallelism| parallelism.get())
                .unwrap_or(4)
                .min(8)
        })
    }
}

/// The only exploration failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("could not obtain help for `{command}`: {reason}")]
    RootExecution { command: String, reason: String },
    #[error("exploration was cancelled")]
    Cancelled,
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Result of probing one command path.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Parsed(Command),
    Timeout,
    Failure(String),
}

#[derive(Debug, Default)]
struct CancelNode {
    cancelled: AtomicBool,
    parent: Option<Arc<CancelNode>>,
}

/// Hierarchical cancellation flag.
///
/// A token is cancelled when it or any ancestor is. Cancelling a child
/// leaves its parent and siblings running.
///
/// # Examples
///
/// ```
/// use helpscope_discovery::CancelToken;
///
/// let root = CancelToken::new();
/// let left = root.child();
/// let right = root.child();
/// left.cancel();
/// assert!(left.is_cancelled());
/// assert!(!right.is_cancelled());
/// root.cancel();
/// assert!(right.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    node: Arc<CancelNode>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(CancelNode {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.node)),
            }),
        }
    }

    pub fn cancel(&self) {
        self.node.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        let mut current = Some(&self.node);
        while let Some(node) = current {
            if node.cancelled.load(Ordering::SeqCst) {
                return true;
            }
            current = node.parent.as_ref();
        }
        false
    }
}

/// A finished exploration.
#[derive(Debug, Clone)]
pub struct Exploration {
    pub command: Command,
    pub report: ExplorationReport,
}

/// Builds a [`Command`] tree by running a program and its subcommands.
///
/// # Examples
///
/// ```no_run
/// use helpscope_discovery::{ExploreConfig, Explorer, LocalExecutor};
///
/// let explorer = Explorer::new(LocalExecutor::new(), ExploreConfig::default().with_max_depth(2));
/// let git = explorer.explore(&["git".to_string()]).unwrap();
/// for node in git.command_tree() {
///     println!("{} ({} flags)", node.command.join(" "), node.named.len());
/// }
/// ```
pub struct Explorer<E> {
    executor: E,
    config: ExploreConfig,
    cancel: CancelToken,
}

impl<E: Executor> Explorer<E> {
    pub fn new(executor: E, config: ExploreConfig) -> Self {
        Self {
            executor,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `token` as the root of cancellation for every probe.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ExploreConfig {
        &self.config
    }

    /// Token that stops every probe not yet started when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Explores `root` and returns the finished tree.
    pub fn explore(&self, root: &[String]) -> Result<Command, ExploreError> {
        self.explore_with_report(root).map(|exploration| exploration.command)
    }

    /// Explores `root`, also returning a record of every probe.
    ///
    /// Only a failure to obtain any help for the root itself is an error.
    /// Subcommand probes that fail are dropped; ones that time out are
    /// kept as empty nodes and not explored further.
    pub fn explore_with_report(&self, root: &[String]) -> Result<Exploration, ExploreError> {
        if root.is_empty() {
            return Err(ExploreError::RootExecution {
                command: String::new(),
                reason: "no command given".to_string(),
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count())
            .build()
            .map_err(|err| ExploreError::ThreadPool(err.to_string()))?;
        pool.install(|| self.explore_root(root))
    }

    fn explore_root(&self, root: &[String]) -> Result<Exploration, ExploreError> {
        if self.cancel.is_cancelled() {
            return Err(ExploreError::Cancelled);
        }
        info!(command = ?root, max_depth = self.config.max_depth, "exploring command");

        let mut report = ExplorationReport::default();
        let (outcome, record) = self.probe(root, &self.config.help_flags, None, &self.cancel);
        report.push(record);

        let mut command = match outcome {
            ProbeOutcome::Parsed(command) => command,
            ProbeOutcome::Timeout => empty_node(root),
            ProbeOutcome::Failure(reason) => {
                return Err(ExploreError::RootExecution {
                    command: root.join(" "),
                    reason,
                });
            }
        };

        if self.config.subcommands && self.config.max_depth > 0 && command.help_text.is_some() {
            report.extend(self.expand(&mut command, 0, &self.cancel));
        }
        self.finalize(&mut command);

        info!(
            command = ?root,
            nodes = command.command_tree().count(),
            invocations = report.invocations(),
            "exploration finished"
        );
        Ok(Exploration { command, report })
    }

    /// Probes the children of `node`, which sits at `depth` below the root.
    fn expand(&self, node: &mut Command, depth: usize, token: &CancelToken) -> Vec<ProbeRecord> {
        let candidates = subcommand_candidates(node);
        if candidates.is_empty() {
            return Vec::new();
        }
        debug!(command = ?node.command, candidates = ?candidates, "probing subcommand candidates");

        let flags = self.child_flags(node);
        let parent: &Command = node;
        let results: Vec<(String, Option<Command>, Vec<ProbeRecord>)> = candidates
            .par_iter()
            .map(|name| {
                let (child, records) = self.explore_child(parent, name, depth + 1, &flags, token);
                (name.clone(), child, records)
            })
            .collect();

        let mut records = Vec::new();
        let mut attached = HashSet::new();
        for (name, child, child_records) in results {
            records.extend(child_records);
            if let Some(child) = child {
                attached.insert(name);
                node.attach(child);
            }
        }
        if !attached.is_empty() {
            remove_subcommand_positionals(node, &attached);
        }
        records
    }

    fn explore_child(
        &self,
        parent: &Command,
        name: &str,
        depth: usize,
        flags: &[String],
        token: &CancelToken,
    ) -> (Option<Command>, Vec<ProbeRecord>) {
        let token = token.child();
        let mut tokens = parent.command.clone();
        tokens.push(name.to_string());

        if token.is_cancelled() {
            return (None, vec![ProbeRecord::new(&tokens, ProbeStatus::Cancelled)]);
        }

        let (outcome, record) = self.probe(&tokens, flags, Some(parent), &token);
        let mut records = vec![record];
        match outcome {
            ProbeOutcome::Parsed(mut child) => {
                child.link_to(parent);
                if depth < self.config.max_depth {
                    records.extend(self.expand(&mut child, depth, &token));
                }
                (Some(child), records)
            }
            ProbeOutcome::Timeout => {
                let mut child = empty_node(&tokens);
                child.link_to(parent);
                (Some(child), records)
            }
            ProbeOutcome::Failure(reason) => {
                debug!(command = ?tokens, reason = %reason, "dropping subcommand candidate");
                (None, records)
            }
        }
    }

    fn child_flags(&self, node: &Command) -> Vec<String> {
        match node.help_invocation.as_ref() {
            Some(flag) if !self.config.try_subcommand_flags => vec![flag.clone()],
            _ => self.config.help_flags.clone(),
        }
    }

    /// Runs `tokens` with each help flag and keeps the richest parse.
    ///
    /// When no flag yields help and [`ExploreConfig::man_pages`] is set, the
    /// command's man page is tried instead. For a subcommand (`parent` is
    /// set) output that parses to nothing, or that merely repeats the
    /// parent, is rejected.
    pub fn probe(
        &self,
        tokens: &[String],
        flags: &[String],
        parent: Option<&Command>,
        token: &CancelToken,
    ) -> (ProbeOutcome, ProbeRecord) {
        let mut record = ProbeRecord::new(tokens, ProbeStatus::Failed);
        let mut best: Option<Command> = None;
        let mut failure: Option<String> = None;
        let mut timed_out = false;

        for flag in flags {
            if token.is_cancelled() {
                break;
            }
            let mut argv = tokens.to_vec();
            if !flag.is_empty() {
                argv.push(flag.clone());
            }
            record.attempts += 1;

            let invocation = match self.executor.invoke(&argv, self.config.timeout) {
                Ok(invocation) => invocation,
                Err(err) if err.is_timeout() => {
                    timed_out = true;
                    break;
                }
                Err(err) => {
                    failure = Some(err.to_string());
                    break;
                }
            };

            if invocation.output.trim().is_empty() {
                failure.get_or_insert_with(|| "no output".to_string());
                continue;
            }
            if parent.is_some() && !invocation.success() && !self.config.accept_nonzero_subcommands {
                failure = Some(match invocation.exit_code {
                    Some(code) => format!("exit status {code}"),
                    None => "terminated by signal".to_string(),
                });
                continue;
            }

            let options = ParseOptions::new(tokens.iter().cloned()).with_help_flag(flag.clone());
            let mut command = HelpParser::new(options, &invocation.output).parse();
            command.help_invocation = Some(flag.clone());
            if best
                .as_ref()
                .is_none_or(|current| argument_total(&command) > argument_total(current))
            {
                best = Some(command);
            }
        }

        let mut from_man_page = false;
        if best.is_none() && !timed_out && self.config.man_pages && !token.is_cancelled() {
            best = self.man_page(tokens, &mut record, token);
            from_man_page = best.is_some();
        }

        let Some(command) = best else {
            if timed_out {
                record.status = ProbeStatus::Timeout;
                return (ProbeOutcome::Timeout, record);
            }
            if token.is_cancelled() && record.attempts == 0 {
                record.status = ProbeStatus::Cancelled;
                return (ProbeOutcome::Failure("cancelled".to_string()), record);
            }
            let reason = failure.unwrap_or_else(|| "no help output".to_string());
            return (ProbeOutcome::Failure(reason.clone()), record.with_detail(reason));
        };

        record.help_flag = command.help_invocation.clone();
        record.arguments = argument_total(&command);
        if let Some(parent) = parent {
            let rejection = if !command.is_valid_subcommand(parent) {
                Some("output repeats the parent command")
            } else if command.empty() {
                Some("no arguments found")
            } else {
                None
            };
            if let Some(reason) = rejection {
                record.status = ProbeStatus::NotSubcommand;
                return (ProbeOutcome::Failure(reason.to_string()), record.with_detail(reason));
            }
        }
        record.status = ProbeStatus::Parsed;
        if from_man_page {
            record = record.with_detail("man page");
        }
        (ProbeOutcome::Parsed(command), record)
    }

    /// Parses the man page of `tokens`, trying each subcommand separator.
    ///
    /// Pages that `man` cannot find (non-zero exit) are skipped.
    fn man_page(&self, tokens: &[String], record: &mut ProbeRecord, token: &CancelToken) -> Option<Command> {
        let separators: &[&str] = if tokens.len() > 1 { MAN_SEPARATORS } else { &[""] };
        let mut best: Option<Command> = None;

        for separator in separators {
            if token.is_cancelled() {
                break;
            }
            let mut argv = vec!["man".to_string()];
            argv.extend(MAN_FLAGS.iter().map(|flag| flag.to_string()));
            argv.push(tokens.join(*separator));
            record.attempts += 1;

            let invocation = match self.executor.invoke(&argv, self.config.timeout) {
                Ok(invocation) if invocation.success() && !invocation.output.trim().is_empty() => invocation,
                Ok(_) => continue,
                Err(err) => {
                    debug!(command = ?argv, error = %err, "man page lookup failed");
                    break;
                }
            };

            let command = HelpParser::new(ParseOptions::new(tokens.iter().cloned()), &invocation.output).parse();
            if best
                .as_ref()
                .is_none_or(|current| argument_total(&command) > argument_total(current))
            {
                best = Some(command);
            }
        }

        if best.is_some() {
            debug!(command = ?tokens, "using man page");
        }
        best
    }

    fn finalize(&self, command: &mut Command) {
        finalize_node(command, self.config.infer_positionals);
        annotate_types(command);
        assign_identifiers(command, self.config.case);
    }
}

fn argument_total(command: &Command) -> usize {
    command.named.len() + command.positional.len()
}

fn empty_node(tokens: &[String]) -> Command {
    Command::new(tokens.iter().cloned()).with_generated_using(crate::GENERATED_USING)
}

fn finalize_node(command: &mut Command, infer_positionals: bool) {
    let named = Flag::deduplicate(std::mem::take(&mut command.named));
    command.set_named(named);
    if !infer_positionals {
        command.positional.clear();
    }
    for child in &mut command.subcommands {
        finalize_node(child, infer_positionals);
    }
}

/// Members of a `{a,b,c}` placeholder.
fn choice_members(name: &str) -> Option<Vec<&str>> {
    let inner = name.strip_prefix('{')?.strip_suffix('}')?;
    Some(inner.split(',').map(str::trim).filter(|item| !item.is_empty()).collect())
}

fn is_command_word(word: &str) -> bool {
    COMMAND_WORD_RE.is_match(word) && !NOT_SUBCOMMANDS.contains(&word)
}

/// Words of `command` worth probing as subcommands, in first-seen order.
///
/// Sources are positional names, members of choice positionals and
/// literal words from usage lines.
pub fn subcommand_candidates(command: &Command) -> Vec<String> {
    let own: HashSet<&str> = command.command.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut offer = |word: &str| {
        if is_command_word(word) && !own.contains(word) && seen.insert(word.to_string()) {
            candidates.push(word.to_string());
        }
    };

    for positional in &command.positional {
        match choice_members(&positional.name) {
            Some(members) => members.into_iter().for_each(&mut offer),
            None => offer(&positional.name),
        }
    }
    for usage in &command.usage {
        usage.literals().for_each(&mut offer);
    }
    candidates
}

pub(crate) fn remove_subcommand_positionals(command: &mut Command, attached: &HashSet<String>) {
    let became_subcommand = |positional: &Positional| match choice_members(&positional.name) {
        Some(members) => members.iter().any(|member| attached.contains(*member)),
        None => attached.contains(&positional.name),
    };
    command.positional.retain(|positional| !became_subcommand(positional));
    for (position, positional) in command.positional.iter_mut().enumerate() {
        positional.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpscope_core::{UsageElement, UsageInstance};

    fn literal(text: &str) -> UsageElement {
        UsageElement {
            text: text.to_string(),
            variable: false,
            optional: false,
            repeatable: false,
        }
    }

    #[test]
    fn test_config_help_flag_moves_first() {
        let config = ExploreConfig::default().with_help_flag("-h");
        assert_eq!(config.help_flags, vec!["-h", "--help", "", "--usage"]);
        let config = ExploreConfig::default().with_help_flag("-?");
        assert_eq!(config.help_flags[0], "-?");
        assert_eq!(config.help_flags.len(), 5);
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(ExploreConfig::default().with_jobs(3).worker_count(), 3);
        assert!(ExploreConfig::default().with_jobs(0).worker_count() >= 1);
    }

    #[test]
    fn test_candidates_from_positionals_and_usage() {
        let mut command = Command::from_parts(
            ["tool"],
            vec![
                Positional::new("index", 0),
                Positional::new("FILE", 1),
                Positional::new("{sort,view}", 2),
                Positional::new("file", 3),
            ],
            Vec::new(),
        );
        command.usage.push(UsageInstance {
            text: "tool mem <ref>".to_string(),
            elements: vec![literal("mem"), literal("tool"), literal("index")],
        });
        assert_eq!(subcommand_candidates(&command), vec!["index", "sort", "view", "mem"]);
    }

    #[test]
    fn test_remove_subcommand_positionals() {
        let mut command = Command::from_parts(
            ["tool"],
            vec![
                Positional::new("{sort,view}", 0),
                Positional::new("index", 1),
                Positional::new("FILE", 2),
            ],
            Vec::new(),
        );
        let attached: HashSet<String> = ["view".to_string(), "index".to_string()].into();
        remove_subcommand_positionals(&mut command, &attached);
        assert_eq!(command.positional.len(), 1);
        assert_eq!(command.positional[0].name, "FILE");
        assert_eq!(command.positional[0].position, 0);
    }

    #[test]
    fn test_cancel_token_hierarchy() {
        let root = CancelToken::new();
        let child = root.child();
        let grandchild = child.child();
        let sibling = root.child();

        child.cancel();
        assert!(grandchild.is_cancelled());
        assert!(!sibling.is_cancelled());
        assert!(!root.is_cancelled());

        root.cancel();
        assert!(sibling.is_cancelled());
    }
}
