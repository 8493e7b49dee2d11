use std::{path::Path, sync::Arc};

use anyhow::bail;

use super::{
    args, ensure_directory, run_build_step, run_limited, Project, ProjectFactory, SharedRunner,
};

/// Any language the grader does not special-case: `make` builds, `make run` runs.
pub struct MakefileProjectFactory {
    runner: SharedRunner,
}

impl MakefileProjectFactory {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

impl ProjectFactory for MakefileProjectFactory {
    fn create_from_code(&self, _code: &[u8]) -> anyhow::Result<Project> {
        bail!("a Makefile project needs a directory, not a single source file")
    }

    fn create_from_directory(&self, directory: &Path) -> anyhow::Result<Project> {
        ensure_directory(directory)?;
        let build_runner = Arc::clone(&self.runner);
        let runner = Arc::clone(&self.runner);
        // silent so recipe echoes do not end up in the graded output
        let run = args(["make", "--silent", "run"]);
        Ok(Project::new(
            directory,
            Box::new(move |dir| {
                run_build_step(build_runner.as_ref(), &args(["make"]), dir).map(|_| ())
            }),
            Box::new(move |dir, input, limits| {
                run_limited(runner.as_ref(), &run, dir, input, limits)
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constraints::ResourceLimits,
        sandbox::{stub::StubRunner, Input},
    };

    #[test]
    fn make_then_make_run() {
        let stub = Arc::new(StubRunner::new());
        let dir = tempfile::tempdir().unwrap();
        let mut project = MakefileProjectFactory::new(stub.clone())
            .create_from_directory(dir.path())
            .unwrap();
        project.build().unwrap();
        project.run(Input::Empty, ResourceLimits::default()).unwrap();
        let calls = stub.calls();
        assert_eq!(calls[0].command, args(["make"]));
        assert_eq!(calls[1].command, args(["make", "--silent", "run"]));
    }

    #[test]
    fn single_file_is_rejected() {
        let factory = MakefileProjectFactory::new(Arc::new(StubRunner::new()));
        assert!(factory.create_from_code(b"all:").is_err());
    }
}
