use std::{path::Path, sync::Arc};

use super::{
    args, run_build_step, run_limited, scratch_with_file, MakefileProjectFactory, Project,
    ProjectFactory, SharedRunner,
};

const BINARY_NAME: &str = "main";

/// Single source file compiled by a C-style compiler into `./main`.
pub struct CompiledProjectFactory {
    runner: SharedRunner,
    compiler: String,
    source_file: String,
    flags: Vec<String>,
}

impl CompiledProjectFactory {
    pub fn new(
        runner: SharedRunner,
        compiler: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            compiler: compiler.into(),
            source_file: source_file.into(),
            flags: Vec::new(),
        }
    }

    /// `gcc` on `main.c`.
    pub fn c(runner: SharedRunner) -> Self {
        Self::new(runner, "gcc", "main.c")
    }

    /// `g++` on `main.cpp`.
    pub fn cpp(runner: SharedRunner) -> Self {
        Self::new(runner, "g++", "main.cpp")
    }

    /// Extra compiler flags, e.g. `-std=c++11 -O2`.
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = args(flags);
        self
    }

    fn compile_command(&self) -> Vec<String> {
        let mut command = vec![
            self.compiler.clone(),
            self.source_file.clone(),
            "-o".to_string(),
            BINARY_NAME.to_string(),
        ];
        command.extend(self.flags.iter().cloned());
        command
    }
}

impl ProjectFactory for CompiledProjectFactory {
    fn create_from_code(&self, code: &[u8]) -> anyhow::Result<Project> {
        let scratch = scratch_with_file(&self.source_file, code)?;
        let compile = self.compile_command();
        let build_runner = Arc::clone(&self.runner);
        let runner = Arc::clone(&self.runner);
        let run = vec![format!("./{BINARY_NAME}")];

        let project = Project::new(
            scratch.path(),
            Box::new(move |dir| run_build_step(build_runner.as_ref(), &compile, dir).map(|_| ())),
            Box::new(move |dir, input, limits| {
                run_limited(runner.as_ref(), &run, dir, input, limits)
            }),
        );
        Ok(project.with_scratch(scratch))
    }

    /// A project tree brings its own build recipe: delegated to the Makefile backend.
    fn create_from_directory(&self, directory: &Path) -> anyhow::Result<Project> {
        MakefileProjectFactory::new(Arc::clone(&self.runner)).create_from_directory(directory)
    }
}
