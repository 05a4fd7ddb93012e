use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use helpscope_core::{Case, Command, assign_identifiers};
use helpscope_discovery::output::{self, OutputFormat};
use helpscope_discovery::{
    ContainerExecutor, Executor, ExploreConfig, Explorer, LocalExecutor, ParseOptions, parse_help_with,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "helpscope", version)]
#[command(about = "Infer a command-line interface from the help text a program prints")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Run a program, parse its help and explore its subcommands.
    Explore(ExploreArgs),
    /// Parse help text from a file without executing anything.
    ParseFile(ParseFileArgs),
    /// Parse help text from stdin without executing anything.
    ParseStdin(ParseStdinArgs),
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Write one file per command node into this directory instead of stdout.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Identifier case convention.
    #[arg(long, value_enum, default_value_t = Case::AsIs)]
    case: Case,
}

#[derive(Debug, Args)]
struct ExploreArgs {
    /// Command to explore, e.g. `samtools` or `bwa mem`.
    #[arg(required = true, num_args = 1..)]
    cmd: Vec<String>,
    /// Subcommand levels to explore; 0 disables subcommand discovery.
    #[arg(long, default_value_t = 1)]
    depth: usize,
    /// Drop positional arguments from the result.
    #[arg(long)]
    no_pos: bool,
    /// Do not look for subcommands.
    #[arg(long)]
    no_subcommands: bool,
    /// Help flag to try first.
    #[arg(long, default_value = "--help", allow_hyphen_values = true)]
    help_flag: String,
    /// Fall back to the program's man page when its help flags print nothing.
    #[arg(long)]
    man_pages: bool,
    /// Seconds to wait for each invocation.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
    /// Parallel subcommand probes (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Run the program inside this running container.
    #[arg(long)]
    container: Option<String>,
    /// Container engine used with --container.
    #[arg(long, default_value = "docker")]
    engine: String,
    /// Also write the probe report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct ParseFileArgs {
    /// File holding captured help text.
    input: PathBuf,
    #[command(flatten)]
    parse: ParseArgs,
}

#[derive(Debug, Args)]
struct ParseStdinArgs {
    #[command(flatten)]
    parse: ParseArgs,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Command that printed the text, e.g. "samtools sort".
    #[arg(long)]
    command: String,
    /// Help flag that produced the text.
    #[arg(long, allow_hyphen_values = true)]
    help_flag: Option<String>,
    /// Terminal width the text was wrapped at.
    #[arg(long)]
    wrap_width: Option<usize>,
    #[command(flatten)]
    output: OutputArgs,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        CliCommand::Explore(args) => run_explore(args),
        CliCommand::ParseFile(args) => run_parse_file(args),
        CliCommand::ParseStdin(args) => run_parse_stdin(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn run_explore(args: ExploreArgs) -> Result<(), String> {
    let mut config = ExploreConfig::default()
        .with_max_depth(args.depth)
        .with_case(args.output.case)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_help_flag(args.help_flag.clone())
        .with_man_pages(args.man_pages);
    config.infer_positionals = !args.no_pos;
    config.subcommands = !args.no_subcommands;
    config.jobs = args.jobs;

    let executor: Box<dyn Executor> = match args.container.as_deref() {
        Some(container) => Box::new(ContainerExecutor::new(container).with_engine(args.engine.clone())),
        None => Box::new(LocalExecutor::new()),
    };

    let exploration = Explorer::new(executor, config)
        .explore_with_report(&args.cmd)
        .map_err(|err| err.to_string())?;
    info!(
        nodes = exploration.report.nodes(),
        invocations = exploration.report.invocations(),
        "explored command"
    );

    if let Some(path) = args.report.as_ref() {
        let json = serde_json::to_string_pretty(&exploration.report)
            .map_err(|err| format!("Failed to serialize report: {err}"))?;
        fs::write(path, json).map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
    }

    emit(&exploration.command, &args.output)
}

fn run_parse_file(args: ParseFileArgs) -> Result<(), String> {
    let help_text = fs::read_to_string(&args.input)
        .map_err(|err| format!("Failed to read '{}': {err}", args.input.display()))?;
    run_parse_help_text(&args.parse, &help_text)
}

fn run_parse_stdin(args: ParseStdinArgs) -> Result<(), String> {
    let mut help_text = String::new();
    std::io::stdin()
        .read_to_string(&mut help_text)
        .map_err(|err| format!("Failed to read stdin: {err}"))?;
    run_parse_help_text(&args.parse, &help_text)
}

fn run_parse_help_text(args: &ParseArgs, help_text: &str) -> Result<(), String> {
    let tokens: Vec<&str> = args.command.split_whitespace().collect();
    if tokens.is_empty() {
        return Err("--command must name the program".to_string());
    }
    let mut options = ParseOptions::new(tokens);
    if let Some(flag) = args.help_flag.as_deref() {
        options = options.with_help_flag(flag);
    }
    if let Some(width) = args.wrap_width {
        options = options.with_wrap_width(width);
    }

    let mut command = parse_help_with(&options, help_text);
    assign_identifiers(&mut command, args.output.case);
    emit(&command, &args.output)
}

fn emit(command: &Command, args: &OutputArgs) -> Result<(), String> {
    match args.out_dir.as_ref() {
        Some(dir) => {
            let written = output::write_tree(dir, command, args.format).map_err(|err| err.to_string())?;
            for path in written {
                println!("{}", path.display());
            }
        }
        None => {
            let rendered = output::render(command, args.format).map_err(|err| err.to_string())?;
            println!("{}", rendered.trim_end());
        }
    }
    Ok(())
}
