//! Running the subject program to capture its help output.
//!
//! [`Executor`] is the seam between the explorer and the outside world.
//! [`LocalExecutor`] spawns the program directly; [`ContainerExecutor`] runs
//! the same argv inside a running container. Tests substitute their own
//! implementation.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

static PROBE_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Extra time granted to the reader threads after the process exits.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Captured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The longer of stdout and stderr; help often goes to stderr.
    pub output: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failure to obtain any output from an invocation.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no command to run")]
    EmptyCommand,
}

impl ExecError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True when the program itself does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == ErrorKind::NotFound)
    }
}

/// Runs a command line under a timeout and returns what it printed.
pub trait Executor: Send + Sync {
    fn invoke(&self, argv: &[String], timeout: Duration) -> Result<Invocation, ExecError>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn invoke(&self, argv: &[String], timeout: Duration) -> Result<Invocation, ExecError> {
        (**self).invoke(argv, timeout)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn invoke(&self, argv: &[String], timeout: Duration) -> Result<Invocation, ExecError> {
        (**self).invoke(argv, timeout)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn invoke(&self, argv: &[String], timeout: Duration) -> Result<Invocation, ExecError> {
        (**self).invoke(argv, timeout)
    }
}

/// Environment applied to every probe.
pub fn default_probe_env() -> Vec<(&'static str, &'static str)> {
    vec![
        // Prevent graphical helpers from opening windows during probes.
        ("DISPLAY", ""),
        ("WAYLAND_DISPLAY", ""),
        ("BROWSER", "true"),
        // Keep interactive helpers from switching terminal modes.
        ("DEBIAN_FRONTEND", "noninteractive"),
        ("TERM", "dumb"),
        ("NO_COLOR", "1"),
        // Avoid interactive pagers when commands route help through pager tools.
        ("PAGER", "cat"),
        ("MANPAGER", "cat"),
        ("SYSTEMD_PAGER", "cat"),
        ("GIT_PAGER", "cat"),
    ]
}

/// Scratch working directory so that probes cannot litter the caller's.
struct ProbeWorkspace {
    path: PathBuf,
}

impl ProbeWorkspace {
    fn create() -> Option<Self> {
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|duration| duration.as_nanos())
            .unwrap_or_default();
        let seq = PROBE_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.push(format!("helpscope-probe-{}-{nanos}-{seq}", std::process::id()));
        fs::create_dir(&path).ok().map(|()| Self { path })
    }
}

impl Drop for ProbeWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Spawns the program directly on the local machine.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    env: Vec<(String, String)>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an environment variable on top of the probe defaults.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl Executor for LocalExecutor {
    fn invoke(&self, argv: &[String], timeout: Duration) -> Result<Invocation, ExecError> {
        let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;
        let label = argv.join(" ");
        let workspace = ProbeWorkspace::create();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(workspace) = workspace.as_ref() {
            command.current_dir(&workspace.path);
        }
        for (key, value) in default_probe_env() {
            command.env(key, value);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| {
            debug!(command = ?argv, error = %source, "failed to spawn help command");
            ExecError::Spawn {
                command: label.clone(),
                source,
            }
        })?;
        capture(&mut child, argv, &label, timeout, started)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = sender.send(buf);
        });
    }
    receiver
}

/// Waits for a reader thread until `deadline`.
///
/// Returns `None` when the pipe is still open at the deadline, which
/// happens when a background process inherited it.
fn collect(receiver: &Receiver<Vec<u8>>, deadline: Instant) -> Option<String> {
    match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn capture(
    child: &mut Child,
    argv: &[String],
    label: &str,
    timeout: Duration,
    started: Instant,
) -> Result<Invocation, ExecError> {
    // Drain both pipes on their own threads so that a full pipe buffer
    // cannot block the child before it exits.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!(command = ?argv, timeout_ms = timeout.as_millis() as u64, "help command timed out, killing process");
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::Timeout {
                command: label.to_string(),
                timeout,
            });
        }
        Err(source) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::Spawn {
                command: label.to_string(),
                source,
            });
        }
    };

    // Reader threads left behind here finish once the pipe closes.
    let deadline = (started + timeout).max(Instant::now() + DRAIN_GRACE);
    let (Some(stdout), Some(stderr)) = (collect(&stdout, deadline), collect(&stderr, deadline)) else {
        warn!(command = ?argv, "help command exited but its output pipes stayed open");
        return Err(ExecError::Timeout {
            command: label.to_string(),
            timeout,
        });
    };
    let output = if stdout.len() >= stderr.len() { stdout } else { stderr };
    let invocation = Invocation {
        output,
        exit_code: status.code(),
        elapsed: started.elapsed(),
    };
    debug!(
        command = ?argv,
        exit_code = ?invocation.exit_code,
        elapsed_ms = invocation.elapsed.as_millis() as u64,
        output_len = invocation.output.len(),
        "help command finished"
    );
    Ok(invocation)
}

/// Runs the program inside an already running container.
///
/// `["samtools", "--help"]` becomes
/// `docker exec <container> samtools --help`.
#[derive(Debug, Clone)]
pub struct ContainerExecutor {
    engine: String,
    container: String,
    inner: LocalExecutor,
}

impl ContainerExecutor {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            engine: "docker".to_string(),
            container: container.into(),
            inner: LocalExecutor::new(),
        }
    }

    /// Container engine binary, e.g. `podman`.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Full argv that will be run on the host.
    pub fn wrap(&self, argv: &[String]) -> Vec<String> {
        let mut wrapped = vec![self.engine.clone(), "exec".to_string(), self.container.clone()];
        wrapped.extend(argv.iter().cloned());
        wrapped
    }
}

impl Executor for ContainerExecutor {
    fn invoke(&self, argv: &[String], timeout: Duration) -> Result<Invocation, ExecError> {
        if argv.is_empty() {
            return Err(ExecError::EmptyCommand);
        }
        self.inner.invoke(&self.wrap(argv), timeout)
    }
}
