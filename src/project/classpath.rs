use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use tracing::debug;

use crate::errors::{BuildError, ProjectError};

use super::{
    ensure_directory, run_build_step, run_limited, scratch_with_file, Project, ProjectFactory,
    SharedRunner,
};

const SOURCE_DIR: &str = "src";
const BUILD_DIR: &str = "build";
const LIB_DIR: &str = "lib";
const MAIN_CLASS: &str = "Main";

/// Java-style backend: every source under `src/` compiled into `build/`, `Main` run from
/// the `build:lib:lib/*` classpath.
pub struct ClasspathProjectFactory {
    runner: SharedRunner,
    compiler: String,
    runtime: String,
    source_version: String,
    bootclasspath: Option<String>,
}

impl ClasspathProjectFactory {
    pub fn new(runner: SharedRunner, source_version: impl Into<String>) -> Self {
        Self {
            runner,
            compiler: "javac".to_string(),
            runtime: "java".to_string(),
            source_version: source_version.into(),
            bootclasspath: None,
        }
    }

    /// Runtime classes to compile against, for sources older than the installed compiler.
    pub fn with_bootclasspath(mut self, bootclasspath: impl Into<String>) -> Self {
        self.bootclasspath = Some(bootclasspath.into());
        self
    }

    pub fn with_binaries(mut self, compiler: impl Into<String>, runtime: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self.runtime = runtime.into();
        self
    }

    fn project(&self, directory: &Path) -> anyhow::Result<Project> {
        let build_dir = directory.join(BUILD_DIR);
        fs::create_dir_all(&build_dir)
            .with_context(|| format!("could not create {}", build_dir.display()))?;

        let mut compile = vec![
            self.compiler.clone(),
            "-source".to_string(),
            self.source_version.clone(),
            "-d".to_string(),
            BUILD_DIR.to_string(),
            "-cp".to_string(),
            format!("{LIB_DIR}/*"),
            "-sourcepath".to_string(),
            SOURCE_DIR.to_string(),
        ];
        if let Some(bootclasspath) = &self.bootclasspath {
            compile.push("-bootclasspath".to_string());
            compile.push(bootclasspath.clone());
        }
        let run = vec![
            self.runtime.clone(),
            "-cp".to_string(),
            format!("{BUILD_DIR}:{LIB_DIR}:{LIB_DIR}/*"),
            MAIN_CLASS.to_string(),
        ];

        let build_runner = Arc::clone(&self.runner);
        let runner = Arc::clone(&self.runner);
        Ok(Project::new(
            directory,
            Box::new(move |dir| {
                let sources = java_sources(&dir.join(SOURCE_DIR)).map_err(|e| {
                    BuildError::new(format!("could not list the source files: {e}"))
                })?;
                if sources.is_empty() {
                    return Err(ProjectError::Build(BuildError::new(
                        "No source file found in the submission.",
                    )));
                }
                debug!("compiling {} source files", sources.len());
                let mut command = compile.clone();
                command.extend(sources.iter().map(|p| p.display().to_string()));
                run_build_step(build_runner.as_ref(), &command, dir).map(|_| ())
            }),
            Box::new(move |dir, input, limits| {
                run_limited(runner.as_ref(), &run, dir, input, limits)
            }),
        ))
    }
}

impl ProjectFactory for ClasspathProjectFactory {
    fn create_from_code(&self, code: &[u8]) -> anyhow::Result<Project> {
        let scratch = scratch_with_file(&format!("{SOURCE_DIR}/{MAIN_CLASS}.java"), code)?;
        Ok(self.project(scratch.path())?.with_scratch(scratch))
    }

    fn create_from_directory(&self, directory: &Path) -> anyhow::Result<Project> {
        ensure_directory(directory)?;
        self.project(directory)
    }
}

/// All `.java` files below `dir`, relative to its parent, in a stable order.
fn java_sources(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let root = dir.parent().unwrap_or(dir);
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "java") {
                found.push(path.strip_prefix(root).map(Path::to_path_buf).unwrap_or(path));
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constraints::ResourceLimits,
        project::args,
        sandbox::{stub::StubRunner, Input},
    };

    #[test]
    fn discovers_sources_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("pkg/sub")).unwrap();
        fs::write(src.join("Main.java"), "").unwrap();
        fs::write(src.join("pkg/A.java"), "").unwrap();
        fs::write(src.join("pkg/sub/B.java"), "").unwrap();
        fs::write(src.join("pkg/notes.txt"), "").unwrap();

        let sources = java_sources(&src).unwrap();
        assert_eq!(
            sources,
            vec![
                PathBuf::from("src/Main.java"),
                PathBuf::from("src/pkg/A.java"),
                PathBuf::from("src/pkg/sub/B.java"),
            ]
        );
    }

    #[test]
    fn java7_commands() {
        let stub = Arc::new(StubRunner::new());
        let factory = ClasspathProjectFactory::new(stub.clone(), "1.7")
            .with_bootclasspath("/usr/lib/jvm/java-1.7.0-openjdk/jre/lib/rt.jar");
        let mut project = factory.create_from_code(b"public class Main {}").unwrap();
        assert!(project.directory().join("build").is_dir());

        project.build().unwrap();
        project.run(Input::Empty, ResourceLimits::default()).unwrap();

        let calls = stub.calls();
        assert_eq!(
            calls[0].command,
            args([
                "javac",
                "-source",
                "1.7",
                "-d",
                "build",
                "-cp",
                "lib/*",
                "-sourcepath",
                "src",
                "-bootclasspath",
                "/usr/lib/jvm/java-1.7.0-openjdk/jre/lib/rt.jar",
                "src/Main.java",
            ])
        );
        assert_eq!(calls[1].command, args(["java", "-cp", "build:lib:lib/*", "Main"]));
    }

    #[test]
    fn empty_source_tree_is_a_build_error() {
        let stub = Arc::new(StubRunner::new());
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        let mut project = ClasspathProjectFactory::new(stub.clone(), "8")
            .create_from_directory(dir.path())
            .unwrap();
        assert!(matches!(project.build(), Err(ProjectError::Build(_))));
        assert!(stub.calls().is_empty());
    }
}
