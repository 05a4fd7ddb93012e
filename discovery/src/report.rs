//! Structured exploration reporting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened when one command path was probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Help text was obtained and parsed (possibly to an empty command).
    Parsed,
    /// Every attempt timed out; the node was kept empty.
    Timeout,
    /// The program could not be run or printed nothing usable.
    Failed,
    /// Output was obtained but does not describe a distinct subcommand.
    NotSubcommand,
    /// Exploration was cancelled before this probe started.
    Cancelled,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Failed => write!(f, "failed"),
            Self::NotSubcommand => write!(f, "not_subcommand"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One probed command path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub command: Vec<String>,
    pub status: ProbeStatus,
    /// Help flag whose output was kept, `""` for a bare invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_flag: Option<String>,
    /// Number of executor invocations made for this path.
    pub attempts: usize,
    /// Flags plus positionals found in the kept output.
    pub arguments: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProbeRecord {
    pub fn new(command: &[String], status: ProbeStatus) -> Self {
        Self {
            command: command.to_vec(),
            status,
            help_flag: None,
            attempts: 0,
            arguments: 0,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Every probe made during one exploration, in tree order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationReport {
    pub probes: Vec<ProbeRecord>,
}

impl ExplorationReport {
    pub fn push(&mut self, record: ProbeRecord) {
        self.probes.push(record);
    }

    pub fn count(&self, status: ProbeStatus) -> usize {
        self.probes.iter().filter(|probe| probe.status == status).count()
    }

    /// Probes that became nodes of the tree.
    pub fn nodes(&self) -> usize {
        self.count(ProbeStatus::Parsed) + self.count(ProbeStatus::Timeout)
    }

    pub fn timeouts(&self) -> impl Iterator<Item = &ProbeRecord> {
        self.probes
            .iter()
            .filter(|probe| probe.status == ProbeStatus::Timeout)
    }

    /// Total executor invocations.
    pub fn invocations(&self) -> usize {
        self.probes.iter().map(|probe| probe.attempts).sum()
    }
}

impl Extend<ProbeRecord> for ExplorationReport {
    fn extend<T: IntoIterator<Item = ProbeRecord>>(&mut self, iter: T) {
        self.probes.extend(iter);
    }
}
