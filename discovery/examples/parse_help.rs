//! Parses captured help text and prints the inferred interface.
//!
//! ```bash
//! cargo run -p helpscope-discovery --example parse_help
//! ```

use helpscope_core::{Case, assign_identifiers};
use helpscope_discovery::{parse_help, subcommand_candidates};

fn main() {
    let help_text = r#"
Usage: mycli [OPTIONS] <COMMAND>

A fictional CLI tool for demonstration

Commands:
  init     Initialize a new project
  build    Build the project
  deploy   Deploy to production

Options:
  -v, --verbose          Enable verbose output
  -c, --config <FILE>    Path to config file [default: config.toml]
  -j, --jobs <N>         Number of parallel jobs [default: 4]
      --level {low,high} Optimisation level
  -h, --help             Print help
  -V, --version          Print version
"#;

    let mut command = parse_help(&["mycli"], help_text);
    assign_identifiers(&mut command, Case::Snake);

    println!("Command: {}", command.command.join(" "));
    println!("\nFlags ({}):", command.named.len());
    for flag in &command.named {
        let kind = flag.cli_type.as_ref().map(ToString::to_string).unwrap_or_default();
        let identifier = flag.identifier.as_deref().unwrap_or("?");
        println!("  {:<24} {identifier:<10} {kind}", flag.synonym_names().join(", "));
    }

    println!("\nPositionals ({}):", command.positional.len());
    for positional in &command.positional {
        let required = if positional.optional { "optional" } else { "required" };
        println!("  {} ({required})", positional.name);
    }

    println!("\nSubcommand candidates: {}", subcommand_candidates(&command).join(", "));
}
