//! Error types shared by the sandbox, project and registry layers.

use std::path::PathBuf;

use thiserror::Error;

/// Raised when a submission cannot be built.
///
/// `output` carries the diagnostic exactly as it should be shown back to the student: the
/// compiler's stderr, prefixed by a limit message when the sandbox killed the compiler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("build failed: {output}")]
pub struct BuildError {
    pub output: String,
}

impl BuildError {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

/// Failures of the sandbox transport itself, never of the program under test.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("empty command")]
    EmptyCommand,
    #[error("could not spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not open input file '{path}': {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while supervising the child: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`Project`](crate::project::Project) and
/// [`DualProject`](crate::project::DualProject) runs.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// `run` was called before a successful `build`. This is a harness bug.
    #[error("project was run before being built")]
    NotBuilt,
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("factory does not exist: {0}")]
    UnknownFactory(String),
    #[error("factory '{name}' is not a {expected} factory")]
    WrongKind { name: String, expected: &'static str },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LimitsError {
    #[error("hard time limit ({hard_time:?}) is lower than the time limit ({time:?})")]
    HardTimeBelowTime {
        time: std::time::Duration,
        hard_time: std::time::Duration,
    },
    #[error("time limit must be positive")]
    ZeroTime,
    #[error("memory limit must be positive")]
    ZeroMemory,
}
