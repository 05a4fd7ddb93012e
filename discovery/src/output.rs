//! Manifest rendering for command trees.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use helpscope_core::Command;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// File extension used by [`write_tree`].
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown output format `{other}` (expected json or yaml)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A command tree with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_using: String,
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub command: Command,
}

impl Manifest {
    pub fn new(command: Command) -> Self {
        Self {
            generated_using: crate::GENERATED_USING.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            command,
        }
    }
}

/// Renders `command` and its subcommands as one manifest.
pub fn render(command: &Command, format: OutputFormat) -> Result<String, OutputError> {
    render_manifest(&Manifest::new(command.clone()), format)
}

pub fn render_manifest(manifest: &Manifest, format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(manifest)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(manifest)?),
    }
}

/// Writes one manifest per node of the tree into `dir`.
///
/// Each file holds a single node without its subcommands and is named
/// after [`Command::as_filename`]. Returns the written paths in tree order.
pub fn write_tree(dir: &Path, command: &Command, format: OutputFormat) -> Result<Vec<PathBuf>, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for node in command.command_tree() {
        let mut single = node.clone();
        single.subcommands.clear();
        let rendered = render(&single, format)?;
        let path = dir.join(format!("{}.{}", node.as_filename(), format.extension()));
        fs::write(&path, rendered).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "wrote manifest");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpscope_core::{Flag, Positional};

    fn tree() -> Command {
        let mut root = Command::from_parts(["tool"], Vec::new(), vec![Flag::switch(&["-v", "--verbose"])]);
        root.attach(Command::from_parts(["tool", "sort"], vec![Positional::new("in.bam", 0)], Vec::new()));
        root.attach(Command::new(["tool", "view"]));
        root
    }

    #[test]
    fn test_format_parse_and_display() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("cwl".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Yaml.to_string(), "yaml");
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
    }

    #[test]
    fn test_render_json_manifest() {
        let json = render(&tree(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["generated_using"], crate::GENERATED_USING);
        assert_eq!(value["command"]["command"][0], "tool");
        assert_eq!(value["command"]["subcommands"].as_array().unwrap().len(), 2);
        assert!(value["generated_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_render_yaml_roundtrip() {
        let yaml = render(&tree(), OutputFormat::Yaml).unwrap();
        let manifest: Manifest = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(manifest.command, tree());
    }

    #[test]
    fn test_write_tree_one_file_per_node() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_tree(dir.path(), &tree(), OutputFormat::Json).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["tool.json", "tool_sort.json", "tool_view.json"]);

        let sort: Manifest = serde_json::from_str(&fs::read_to_string(&paths[1]).unwrap()).unwrap();
        assert_eq!(sort.command.command, vec!["tool", "sort"]);
        assert!(sort.command.subcommands.is_empty());
    }

    #[test]
    fn test_write_tree_keeps_similar_siblings_apart() {
        let mut root = Command::new(["tool"]);
        root.attach(Command::from_parts(["tool", "foo-bar"], vec![Positional::new("a", 0)], Vec::new()));
        root.attach(Command::from_parts(["tool", "foo_bar"], vec![Positional::new("b", 0)], Vec::new()));

        let dir = tempfile::tempdir().unwrap();
        let paths = write_tree(dir.path(), &root, OutputFormat::Json).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);

        let underscored: Manifest = serde_json::from_str(&fs::read_to_string(&paths[2]).unwrap()).unwrap();
        assert_eq!(underscored.command.command, vec!["tool", "foo_bar"]);
        assert_eq!(underscored.command.positional[0].name, "b");
    }
}
