//! Execution of untrusted commands under resource limits.
//!
//! Everything that spawns a student process goes through the [`SandboxRunner`] trait. The
//! production implementation is [`ProcessSandbox`]: it prefixes the command with the sandbox
//! executable (see [`SandboxInvocation`]) and collects resource usage with one of the
//! [`ResourceAccounting`] strategies, picked once at configuration time.
//!
//! A non-zero exit is a normal outcome and is returned in [`RunResult::return_code`]. Only
//! transport failures (the command cannot be spawned, a pipe breaks) are reported as
//! [`SandboxError`].
//!
//! This module is Unix-only: children are placed in their own process group so a hard time
//! limit can kill the whole tree.

use std::{env, path::PathBuf, time::Duration};

use serde::Serialize;
use tracing::warn;

use crate::{constraints::ResourceLimits, errors::SandboxError};

mod invocation;
mod process;
mod profiler;
mod rusage;
pub mod stub;
mod usage_log;

pub use invocation::{SandboxInvocation, DEFAULT_SANDBOX_BINARY};
pub use process::ProcessSandbox;

/// Flag handed to the sandbox executable, followed by the path of the usage file to write.
pub const DEFAULT_USAGE_LOG_FLAG: &str = "--usage-log";

/// Interval between two memory samples of the active profiler.
pub const DEFAULT_PROFILER_INTERVAL: Duration = Duration::from_millis(100);

/// Runs a command inside the sandbox.
///
/// Implementations must not mutate process-wide state (environment variables, working
/// directory) so that nothing leaks from one call into the next.
pub trait SandboxRunner: Send + Sync {
    /// Runs `command` (program followed by its arguments) and waits for it.
    ///
    /// # Errors
    /// Only when the process outcome itself cannot be obtained.
    fn run_command(&self, command: &[String], options: RunOptions)
        -> Result<RunResult, SandboxError>;
}

/// What was observed from one sandboxed process. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Absent when the accounting strategy could not measure it.
    pub execution_time: Option<Duration>,
    /// Peak memory in bytes, absent when the accounting strategy could not measure it.
    pub memory_usage: Option<u64>,
}

impl RunResult {
    pub fn new(return_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            return_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            execution_time: None,
            memory_usage: None,
        }
    }

    pub fn success(&self) -> bool {
        self.return_code == 0
    }
}

/// Standard input given to a sandboxed process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Input {
    /// Stdin is closed immediately.
    #[default]
    Empty,
    Text(String),
    File(PathBuf),
}

impl Input {
    /// Short human-readable identifier, used in debug bundles.
    pub fn describe(&self) -> String {
        match self {
            Input::Empty => String::new(),
            Input::Text(_) => "<text>".to_string(),
            Input::File(path) => path.display().to_string(),
        }
    }
}

/// Per-call options of [`SandboxRunner::run_command`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub stdin: Input,
    pub cwd: Option<PathBuf>,
    /// Variables added to the child environment only.
    pub env: Vec<(String, String)>,
    /// `None` runs the command without limit flags (e.g. build steps).
    pub limits: Option<ResourceLimits>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdin(mut self, stdin: Input) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// How resource usage of a run is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAccounting {
    /// Wall-clock time only, memory is not measured.
    WallClock,
    /// The sandbox executable writes a JSON usage file, read back after exit.
    UsageLog { flag: String },
    /// `wait4(2)` resource usage of the child: CPU time (user plus system) and peak RSS.
    KernelUsage,
    /// Active polling of the memory of the child and all its descendants.
    Profiler { interval: Duration },
}

impl ResourceAccounting {
    pub fn usage_log() -> Self {
        ResourceAccounting::UsageLog {
            flag: DEFAULT_USAGE_LOG_FLAG.to_string(),
        }
    }

    pub fn profiler() -> Self {
        ResourceAccounting::Profiler {
            interval: DEFAULT_PROFILER_INTERVAL,
        }
    }
}

impl Default for ResourceAccounting {
    fn default() -> Self {
        ResourceAccounting::WallClock
    }
}

/// Selects the sandbox executable and accounting strategy.
///
/// # Environment Variables
///
/// - `SANDBOX_BINARY` — sandbox executable (default: `run_student`). `none` or an empty
///   value runs commands directly, with limits enforced by the grader itself.
/// - `SANDBOX_ACCOUNTING` — one of `wall`, `usage-log`, `kernel`, `profiler`
///   (default: `wall`).
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    binary: Option<PathBuf>,
    accounting: ResourceAccounting,
}

impl SandboxConfig {
    pub fn new() -> Self {
        Self {
            binary: Some(PathBuf::from(DEFAULT_SANDBOX_BINARY)),
            accounting: ResourceAccounting::default(),
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::new();
        let binary = match env::var("SANDBOX_BINARY") {
            Ok(value) if value.is_empty() || value.eq_ignore_ascii_case("none") => None,
            Ok(value) => Some(PathBuf::from(value)),
            Err(_) => defaults.binary,
        };
        let accounting = match env::var("SANDBOX_ACCOUNTING").as_deref() {
            Ok("wall") | Err(_) => ResourceAccounting::WallClock,
            Ok("usage-log") => ResourceAccounting::usage_log(),
            Ok("kernel") => ResourceAccounting::KernelUsage,
            Ok("profiler") => ResourceAccounting::profiler(),
            Ok(other) => {
                warn!("unknown SANDBOX_ACCOUNTING '{other}', using wall clock");
                ResourceAccounting::WallClock
            }
        };
        Self { binary, accounting }
    }

    /// `None` runs commands directly.
    pub fn with_binary(mut self, binary: Option<PathBuf>) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_accounting(mut self, accounting: ResourceAccounting) -> Self {
        self.accounting = accounting;
        self
    }

    pub fn build(self) -> ProcessSandbox {
        let invocation = match self.binary {
            Some(binary) => SandboxInvocation::new(binary),
            None => SandboxInvocation::direct(),
        };
        ProcessSandbox::new(invocation, self.accounting)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new()
    }
}
