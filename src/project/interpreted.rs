use std::{path::Path, sync::Arc};

use tracing::debug;

use super::{
    args, ensure_directory, run_limited, scratch_with_file, Project, ProjectFactory, SharedRunner,
};

/// Script languages: nothing to build, the interpreter runs the entry file.
pub struct InterpretedProjectFactory {
    runner: SharedRunner,
    binary: String,
    main_file: String,
    flags: Vec<String>,
}

impl InterpretedProjectFactory {
    pub fn new(runner: SharedRunner, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            main_file: "main.py".to_string(),
            flags: Vec::new(),
        }
    }

    pub fn with_main_file(mut self, main_file: impl Into<String>) -> Self {
        self.main_file = main_file.into();
        self
    }

    /// Arguments appended after the entry file.
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = args(flags);
        self
    }

    fn project(&self, directory: &Path) -> Project {
        let mut command = vec![self.binary.clone(), self.main_file.clone()];
        command.extend(self.flags.iter().cloned());
        let runner = Arc::clone(&self.runner);
        Project::new(
            directory,
            Box::new(|_| Ok(())),
            Box::new(move |dir, input, limits| {
                run_limited(runner.as_ref(), &command, dir, input, limits)
            }),
        )
    }
}

impl ProjectFactory for InterpretedProjectFactory {
    fn create_from_code(&self, code: &[u8]) -> anyhow::Result<Project> {
        let scratch = scratch_with_file(&self.main_file, code)?;
        debug!("wrote {} in {}", self.main_file, scratch.path().display());
        Ok(self.project(scratch.path()).with_scratch(scratch))
    }

    fn create_from_directory(&self, directory: &Path) -> anyhow::Result<Project> {
        ensure_directory(directory)?;
        Ok(self.project(directory))
    }
}
