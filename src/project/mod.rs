//! Build-once, run-many execution of a submission.
//!
//! A [`Project`] is a working directory plus an injected pair of closures: one that builds
//! the submission in place, and one that runs the result through a
//! [`SandboxRunner`](crate::sandbox::SandboxRunner). Per-language recipes live in the
//! [`ProjectFactory`] implementations of the submodules; none of them subclass anything.
//!
//! Hardware-description backends judge the student against a golden model run live, which
//! does not fit the `run -> RunResult` shape. They produce a [`DualProject`] instead.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::{
    constraints::ResourceLimits,
    errors::{BuildError, ProjectError},
    results::compilation_message,
    sandbox::{Input, RunOptions, RunResult, SandboxRunner},
};

mod classpath;
mod compiled;
mod hdl;
mod interpreted;
mod makefile;

pub use classpath::ClasspathProjectFactory;
pub use compiled::CompiledProjectFactory;
pub use hdl::{HdlProjectFactory, HdlSources, VerilogProjectFactory, VhdlProjectFactory};
pub use interpreted::InterpretedProjectFactory;
pub use makefile::MakefileProjectFactory;

/// Builds the project in the given directory.
pub type BuildFn = Box<dyn Fn(&Path) -> Result<(), ProjectError> + Send + Sync>;
/// Runs the built project in the given directory.
pub type RunFn =
    Box<dyn Fn(&Path, Input, ResourceLimits) -> Result<RunResult, ProjectError> + Send + Sync>;
/// Runs the golden model and the student design in the given directory.
pub type DualRunFn =
    Box<dyn Fn(&Path, ResourceLimits) -> Result<DualRunResult, ProjectError> + Send + Sync>;
/// Preparation step executed before the build, e.g. fetching an auxiliary dataset.
pub type SetupFn = Box<dyn Fn(&Path) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectState {
    Unbuilt,
    Built,
}

/// Produces [`Project`]s for one backend. Holds configuration only, never submission state.
pub trait ProjectFactory: Send + Sync {
    /// Materializes `code` in a fresh scratch directory, removed when the project is dropped.
    fn create_from_code(&self, code: &[u8]) -> anyhow::Result<Project>;

    /// Uses an already populated directory as is.
    fn create_from_directory(&self, directory: &Path) -> anyhow::Result<Project>;
}

/// Build steps shared by [`Project`] and [`DualProject`].
struct Lifecycle {
    directory: PathBuf,
    state: ProjectState,
    setup: Vec<SetupFn>,
    build: BuildFn,
    _scratch: Option<TempDir>,
}

impl Lifecycle {
    fn new(directory: PathBuf, build: BuildFn) -> Self {
        Self {
            directory,
            state: ProjectState::Unbuilt,
            setup: Vec::new(),
            build,
            _scratch: None,
        }
    }

    fn build(&mut self) -> Result<(), ProjectError> {
        for step in &self.setup {
            step(&self.directory).map_err(|e| BuildError::new(format!("{e:#}")))?;
        }
        (self.build)(&self.directory)?;
        self.state = ProjectState::Built;
        Ok(())
    }

    fn ensure_built(&self) -> Result<(), ProjectError> {
        match self.state {
            ProjectState::Built => Ok(()),
            ProjectState::Unbuilt => Err(ProjectError::NotBuilt),
        }
    }
}

/// A submission in a working directory, built once and run many times.
pub struct Project {
    lifecycle: Lifecycle,
    run: RunFn,
}

impl Project {
    pub fn new(directory: impl Into<PathBuf>, build: BuildFn, run: RunFn) -> Self {
        Self {
            lifecycle: Lifecycle::new(directory.into(), build),
            run,
        }
    }

    /// Ties the lifetime of a scratch directory to the project.
    pub fn with_scratch(mut self, scratch: TempDir) -> Self {
        self.lifecycle._scratch = Some(scratch);
        self
    }

    /// Adds a step run before the build. Its failure is reported as a [`BuildError`].
    pub fn with_setup<F>(mut self, step: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.lifecycle.setup.push(Box::new(step));
        self
    }

    pub fn directory(&self) -> &Path {
        &self.lifecycle.directory
    }

    pub fn state(&self) -> ProjectState {
        self.lifecycle.state
    }

    /// Builds the project. A failed rebuild leaves an already built project built.
    ///
    /// # Errors
    /// [`ProjectError::Build`] for anything the student should see, [`ProjectError::Sandbox`]
    /// when the sandbox itself failed.
    #[instrument(skip(self), fields(directory = %self.lifecycle.directory.display()))]
    pub fn build(&mut self) -> Result<(), ProjectError> {
        let res = self.lifecycle.build();
        match &res {
            Ok(()) => info!("project built"),
            Err(e) => info!("build failed: {e}"),
        }
        res
    }

    /// Runs the built project with `input` on stdin.
    ///
    /// # Errors
    /// [`ProjectError::NotBuilt`] when [`build`](Self::build) has not succeeded yet.
    #[instrument(skip(self, input), fields(directory = %self.lifecycle.directory.display()))]
    pub fn run(&self, input: Input, limits: ResourceLimits) -> Result<RunResult, ProjectError> {
        self.lifecycle.ensure_built()?;
        let result = (self.run)(&self.lifecycle.directory, input, limits)?;
        debug!(
            "run finished with code {} ({} bytes of output)",
            result.return_code,
            result.stdout.len()
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("directory", &self.lifecycle.directory)
            .field("state", &self.lifecycle.state)
            .finish_non_exhaustive()
    }
}

/// Output of both simulations of a [`DualProject`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DualRunResult {
    pub golden_stdout: String,
    pub student: RunResult,
}

/// A hardware design compiled twice against the same testbench: once with the golden model,
/// once with the student design.
pub struct DualProject {
    lifecycle: Lifecycle,
    run: DualRunFn,
}

impl DualProject {
    pub fn new(directory: impl Into<PathBuf>, build: BuildFn, run: DualRunFn) -> Self {
        Self {
            lifecycle: Lifecycle::new(directory.into(), build),
            run,
        }
    }

    pub fn with_scratch(mut self, scratch: TempDir) -> Self {
        self.lifecycle._scratch = Some(scratch);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.lifecycle.directory
    }

    pub fn state(&self) -> ProjectState {
        self.lifecycle.state
    }

    #[instrument(skip(self), fields(directory = %self.lifecycle.directory.display()))]
    pub fn build(&mut self) -> Result<(), ProjectError> {
        self.lifecycle.build()
    }

    /// Runs the golden simulation, then the student one.
    #[instrument(skip(self), fields(directory = %self.lifecycle.directory.display()))]
    pub fn run_dual(&self, limits: ResourceLimits) -> Result<DualRunResult, ProjectError> {
        self.lifecycle.ensure_built()?;
        (self.run)(&self.lifecycle.directory, limits)
    }
}

impl std::fmt::Debug for DualProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualProject")
            .field("directory", &self.lifecycle.directory)
            .field("state", &self.lifecycle.state)
            .finish_non_exhaustive()
    }
}

/// Creates a scratch directory holding `code` as `file_name`.
pub(crate) fn scratch_with_file(file_name: &str, code: &[u8]) -> anyhow::Result<TempDir> {
    let scratch = tempfile::Builder::new()
        .prefix("submission-")
        .tempdir()
        .context("could not create scratch directory")?;
    let path = scratch.path().join(file_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    fs::write(&path, code).with_context(|| format!("could not write {}", path.display()))?;
    Ok(scratch)
}

pub(crate) fn ensure_directory(directory: &Path) -> anyhow::Result<()> {
    if !directory.is_dir() {
        anyhow::bail!("'{}' is not a valid directory", directory.display());
    }
    Ok(())
}

pub(crate) fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Runs a build command without limit flags and turns a failure into a [`BuildError`].
pub(crate) fn run_build_step(
    runner: &dyn SandboxRunner,
    command: &[String],
    directory: &Path,
) -> Result<RunResult, ProjectError> {
    let result = runner.run_command(command, RunOptions::new().in_dir(directory))?;
    if result.return_code != 0 {
        warn!(
            "build step {:?} failed with code {}",
            command.first(),
            result.return_code
        );
        return Err(build_error(&result).into());
    }
    Ok(result)
}

/// Diagnostic shown to the student for a failed build step.
pub(crate) fn build_error(result: &RunResult) -> BuildError {
    let mut output = compilation_message(result.return_code).to_string();
    for stream in [&result.stdout, &result.stderr] {
        if !stream.trim().is_empty() {
            output.push('\n');
            output.push_str(stream.trim_end());
        }
    }
    BuildError::new(output)
}

/// Runs `command` in `directory` with `input` and `limits`.
pub(crate) fn run_limited(
    runner: &dyn SandboxRunner,
    command: &[String],
    directory: &Path,
    input: Input,
    limits: ResourceLimits,
) -> Result<RunResult, ProjectError> {
    let options = RunOptions::new()
        .in_dir(directory)
        .with_stdin(input)
        .with_limits(limits);
    Ok(runner.run_command(command, options)?)
}

pub(crate) type SharedRunner = Arc<dyn SandboxRunner>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::stub::StubRunner;

    fn echo_project(runner: Arc<StubRunner>) -> Project {
        let build_runner = Arc::clone(&runner);
        Project::new(
            "/tmp",
            Box::new(move |dir| {
                run_build_step(build_runner.as_ref(), &args(["cc"]), dir).map(|_| ())
            }),
            Box::new(move |dir, input, limits| {
                run_limited(runner.as_ref(), &args(["./main"]), dir, input, limits)
            }),
        )
    }

    #[test]
    fn run_before_build_fails() {
        let runner = Arc::new(StubRunner::new());
        let project = echo_project(Arc::clone(&runner));
        assert_eq!(project.state(), ProjectState::Unbuilt);
        let err = project
            .run(Input::Empty, ResourceLimits::default())
            .unwrap_err();
        assert!(matches!(err, ProjectError::NotBuilt));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn failed_build_carries_diagnostic() {
        let runner = Arc::new(
            StubRunner::new().then(RunResult::new(1, "", "main.c:1: error: expected ';'\n")),
        );
        let mut project = echo_project(Arc::clone(&runner));
        let Err(ProjectError::Build(BuildError { output })) = project.build() else {
            panic!("expected a build error");
        };
        assert_eq!(output, "Compilation failed.\nmain.c:1: error: expected ';'");
        assert_eq!(project.state(), ProjectState::Unbuilt);
    }

    #[test]
    fn compiler_killed_by_time_limit() {
        let runner = Arc::new(StubRunner::new().then(RunResult::new(253, "", "")));
        let mut project = echo_project(runner);
        let Err(ProjectError::Build(err)) = project.build() else {
            panic!("expected a build error");
        };
        assert_eq!(err.output, "The time limit was exceeded during compilation.");
    }

    #[test]
    fn built_project_runs_in_its_directory() {
        let runner = Arc::new(StubRunner::new());
        let mut project = echo_project(Arc::clone(&runner));
        project.build().unwrap();
        assert_eq!(project.state(), ProjectState::Built);
        project
            .run(Input::Text("1 2".into()), ResourceLimits::default())
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].command, args(["./main"]));
        assert_eq!(calls[1].options.cwd.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(calls[1].options.stdin, Input::Text("1 2".into()));
        assert!(calls[0].options.limits.is_none());
        assert!(calls[1].options.limits.is_some());
    }

    #[test]
    fn setup_failure_is_a_build_error() {
        let runner = Arc::new(StubRunner::new());
        let mut project = echo_project(Arc::clone(&runner))
            .with_setup(|_| anyhow::bail!("dataset download failed"));
        let Err(ProjectError::Build(err)) = project.build() else {
            panic!("expected a build error");
        };
        assert!(err.output.contains("dataset download failed"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn scratch_directory_is_removed_with_the_project() {
        let scratch = scratch_with_file("src/Main.java", b"class Main {}").unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.join("src/Main.java").is_file());
        let project = Project::new(
            &path,
            Box::new(|_| Ok(())),
            Box::new(|_, _, _| Ok(RunResult::new(0, "", ""))),
        )
        .with_scratch(scratch);
        drop(project);
        assert!(!path.exists());
    }
}
