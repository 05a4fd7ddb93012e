//! Explorer behaviour driven by an in-memory executor.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use helpscope_core::{Case, validate_command};
use helpscope_discovery::{
    CancelToken, ExecError, Executor, ExploreConfig, ExploreError, Explorer, Invocation, ProbeStatus,
};

enum Reply {
    Help(&'static str),
    Exit(i32, &'static str),
    Timeout,
}

/// Answers invocations from a table keyed by the joined argv.
///
/// Unknown command lines print nothing and exit 1.
#[derive(Default)]
struct ScriptedExecutor {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn help(mut self, argv: &str, text: &'static str) -> Self {
        self.replies.insert(argv.to_string(), Reply::Help(text));
        self
    }

    fn exit(mut self, argv: &str, code: i32, text: &'static str) -> Self {
        self.replies.insert(argv.to_string(), Reply::Exit(code, text));
        self
    }

    fn timeout(mut self, argv: &str) -> Self {
        self.replies.insert(argv.to_string(), Reply::Timeout);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Executor for ScriptedExecutor {
    fn invoke(&self, argv: &[String], timeout: Duration) -> Result<Invocation, ExecError> {
        let key = argv.join(" ");
        self.calls.lock().unwrap().push(key.clone());
        let (output, exit_code) = match self.replies.get(&key) {
            Some(Reply::Help(text)) => (text.to_string(), Some(0)),
            Some(Reply::Exit(code, text)) => (text.to_string(), Some(*code)),
            Some(Reply::Timeout) => return Err(ExecError::Timeout { command: key, timeout }),
            None => (String::new(), Some(1)),
        };
        Ok(Invocation {
            output,
            exit_code,
            elapsed: Duration::from_millis(1),
        })
    }
}

fn tokens(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

fn config(depth: usize) -> ExploreConfig {
    ExploreConfig {
        max_depth: depth,
        help_flags: vec!["--help".to_string()],
        jobs: Some(2),
        ..ExploreConfig::default()
    }
}

const TOOL_HELP: &str = "\
usage: tool [-v] <command>

Commands:
  index     build an index
  align     align reads to a reference

Options:
  -v, --verbose   verbose logging
";

const INDEX_HELP: &str = "\
usage: tool index [-t N] REF

Options:
  -t, --threads N   number of threads
";

const ALIGN_HELP: &str = "\
usage: tool align <mode>

Commands:
  fast      quick alignment mode
  exact     exhaustive alignment mode
";

const FAST_HELP: &str = "\
usage: tool align fast [-k N] READS

  -k N    seed length
";

fn hierarchy() -> ScriptedExecutor {
    ScriptedExecutor::default()
        .help("tool --help", TOOL_HELP)
        .help("tool index --help", INDEX_HELP)
        .help("tool align --help", ALIGN_HELP)
        .help("tool align fast --help", FAST_HELP)
        .help("tool align exact --help", FAST_HELP)
}

#[test]
fn test_depth_one_stops_at_direct_children() {
    let executor = hierarchy();
    let explorer = Explorer::new(&executor, config(1));
    let root = explorer.explore(&tokens(&["tool"])).unwrap();

    assert_eq!(root.height(), 1);
    let names: Vec<&str> = root.subcommands.iter().map(|child| child.name()).collect();
    assert_eq!(names, vec!["index", "align"]);
    assert!(
        executor.calls().iter().all(|call| !call.contains("fast")),
        "probed beyond max depth: {:?}",
        executor.calls()
    );

    // The command words became subcommands, not positionals.
    assert!(root.positional.iter().all(|p| p.name != "index" && p.name != "align"));
    assert!(validate_command(&root).is_empty());
}

#[test]
fn test_deeper_exploration_builds_full_tree() {
    let executor = hierarchy();
    let root = Explorer::new(&executor, config(3)).explore(&tokens(&["tool"])).unwrap();

    assert_eq!(root.height(), 2);
    let align = root.subcommand("align").unwrap();
    assert_eq!(align.subcommands.len(), 2);
    let fast = align.subcommand("fast").unwrap();
    assert_eq!(fast.command, tokens(&["tool", "align", "fast"]));
    assert_eq!(fast.depth(), 2);
    assert_eq!(fast.parent(&root).unwrap().command, tokens(&["tool", "align"]));
    assert!(validate_command(&root).is_empty());
}

#[test]
fn test_depth_zero_yields_single_node() {
    let executor = hierarchy();
    let root = Explorer::new(&executor, config(0)).explore(&tokens(&["tool"])).unwrap();

    assert!(root.subcommands.is_empty());
    assert_eq!(root.command_tree().count(), 1);
    assert_eq!(executor.calls(), vec!["tool --help"]);
}

#[test]
fn test_subcommand_timeout_leaves_empty_child() {
    let executor = ScriptedExecutor::default()
        .help("tool --help", "usage: tool <command>\n\nCommands:\n  subcmd    run the sub command\n")
        .timeout("tool subcmd --help");
    let exploration = Explorer::new(&executor, config(3))
        .explore_with_report(&tokens(&["tool"]))
        .unwrap();

    let child = exploration.command.subcommand("subcmd").unwrap();
    assert!(child.empty());
    assert!(child.help_text.is_none());
    assert_eq!(child.depth(), 1);
    assert_eq!(exploration.report.timeouts().count(), 1);
    assert_eq!(executor.calls(), vec!["tool --help", "tool subcmd --help"]);
}

#[test]
fn test_failed_candidates_are_dropped() {
    let executor = ScriptedExecutor::default()
        .help("tool --help", TOOL_HELP)
        .help("tool index --help", INDEX_HELP)
        .exit("tool align --help", 2, "tool: unknown command 'align'\n  -x   nothing here\n");
    let exploration = Explorer::new(&executor, config(1))
        .explore_with_report(&tokens(&["tool"]))
        .unwrap();

    let names: Vec<&str> = exploration.command.subcommands.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["index"]);
    let failed = exploration
        .report
        .probes
        .iter()
        .find(|probe| probe.command == tokens(&["tool", "align"]))
        .unwrap();
    assert_eq!(failed.status, ProbeStatus::Failed);
    assert_eq!(failed.detail.as_deref(), Some("exit status 2"));
}

#[test]
fn test_parent_help_echo_is_not_a_subcommand() {
    let executor = ScriptedExecutor::default()
        .help("tool --help", TOOL_HELP)
        .help("tool index --help", TOOL_HELP)
        .help("tool align --help", TOOL_HELP);
    let exploration = Explorer::new(&executor, config(2))
        .explore_with_report(&tokens(&["tool"]))
        .unwrap();

    assert!(exploration.command.subcommands.is_empty());
    assert_eq!(exploration.report.count(ProbeStatus::NotSubcommand), 2);
}

#[test]
fn test_root_failure_is_an_error() {
    let executor = ScriptedExecutor::default();
    let err = Explorer::new(&executor, config(1))
        .explore(&tokens(&["missing-tool"]))
        .unwrap_err();
    assert!(matches!(err, ExploreError::RootExecution { .. }));
    assert!(err.to_string().contains("missing-tool"));
}

#[test]
fn test_root_nonzero_exit_with_help_is_accepted() {
    let executor = ScriptedExecutor::default().exit("tool --help", 1, INDEX_HELP);
    let root = Explorer::new(&executor, config(0)).explore(&tokens(&["tool"])).unwrap();
    assert_eq!(root.named.len(), 1);
}

#[test]
fn test_synonyms_collapse_to_one_flag() {
    let executor = ScriptedExecutor::default().help(
        "tool --help",
        "usage: tool [-f FORMAT] [--format FORMAT] IN\n\n  -f, --format FORMAT   output format\n",
    );
    let root = Explorer::new(&executor, config(0)).explore(&tokens(&["tool"])).unwrap();

    assert_eq!(root.named.len(), 1);
    assert_eq!(root.named[0].synonym_names(), vec!["-f", "--format"]);
}

#[test]
fn test_best_help_flag_wins() {
    let executor = ScriptedExecutor::default()
        .help("tool -h", "usage: tool [-a]\n")
        .help("tool --help", INDEX_HELP);
    let cfg = ExploreConfig {
        help_flags: tokens(&["-h", "--help"]),
        ..config(0)
    };
    let root = Explorer::new(&executor, cfg).explore(&tokens(&["tool"])).unwrap();

    assert_eq!(root.help_invocation.as_deref(), Some("--help"));
    assert_eq!(root.named[0].synonym_names(), vec!["-t", "--threads"]);
}

#[test]
fn test_identifiers_and_positional_switch() {
    let executor = hierarchy();
    let mut cfg = config(1).with_case(Case::Camel);
    cfg.infer_positionals = false;
    let root = Explorer::new(&executor, cfg).explore(&tokens(&["tool"])).unwrap();

    let index = root.subcommand("index").unwrap();
    assert!(index.positional.is_empty());
    assert_eq!(index.named[0].identifier.as_deref(), Some("threads"));
    assert!(root.named[0].identifier.is_some());
}

#[test]
fn test_subcommand_discovery_can_be_disabled() {
    let executor = hierarchy();
    let cfg = ExploreConfig {
        subcommands: false,
        ..config(3)
    };
    let root = Explorer::new(&executor, cfg).explore(&tokens(&["tool"])).unwrap();
    assert!(root.subcommands.is_empty());
    assert_eq!(executor.calls().len(), 1);
}

#[test]
fn test_cancelled_exploration() {
    let executor = hierarchy();
    let token = CancelToken::new();
    token.cancel();
    let err = Explorer::new(&executor, config(1))
        .with_cancel_token(token)
        .explore(&tokens(&["tool"]))
        .unwrap_err();
    assert!(matches!(err, ExploreError::Cancelled));
    assert!(executor.calls().is_empty());
}

const MAN_PAGE: &str = "\
TOOL(1)                      User Commands                      TOOL(1)

NAME
       tool - does things

OPTIONS
       -v, --verbose
              print more detail

       -o, --output=FILE
              write the result to FILE
";

#[test]
fn test_man_page_used_when_help_is_silent() {
    let executor = ScriptedExecutor::default().help("man --no-subpages tool", MAN_PAGE);
    let cfg = config(0).with_man_pages(true);
    let exploration = Explorer::new(&executor, cfg)
        .explore_with_report(&tokens(&["tool"]))
        .unwrap();

    let root = &exploration.command;
    assert_eq!(root.named.len(), 2);
    assert!(root.named.iter().any(|flag| flag.has_synonym("--output")));
    assert!(root.help_invocation.is_none());
    assert_eq!(exploration.report.probes[0].detail.as_deref(), Some("man page"));
    assert_eq!(executor.calls(), vec!["tool --help", "man --no-subpages tool"]);
}

#[test]
fn test_subcommand_man_page_separators() {
    let executor = ScriptedExecutor::default()
        .help("tool --help", "usage: tool <command>\n\nCommands:\n  sub       run the sub command\n")
        .exit("man --no-subpages tool-sub", 16, "No manual entry for tool-sub\n")
        .help("man --no-subpages tool_sub", MAN_PAGE);
    let root = Explorer::new(&executor, config(1).with_man_pages(true))
        .explore(&tokens(&["tool"]))
        .unwrap();

    let sub = root.subcommand("sub").unwrap();
    assert_eq!(sub.named.len(), 2);
    assert!(executor.calls().contains(&"man --no-subpages tool_sub".to_string()));
}

#[test]
fn test_man_pages_are_off_by_default() {
    let executor = ScriptedExecutor::default().help("man --no-subpages tool", MAN_PAGE);
    let err = Explorer::new(&executor, config(0))
        .explore(&tokens(&["tool"]))
        .unwrap_err();
    assert!(matches!(err, ExploreError::RootExecution { .. }));
    assert!(executor.calls().iter().all(|call| !call.starts_with("man")));
}
