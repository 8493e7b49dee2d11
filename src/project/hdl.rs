//! Hardware-description backends, judged against a golden model simulated alongside the
//! student design.

use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use tempfile::TempDir;

use crate::{errors::BuildError, sandbox::Input};

use super::{
    args, ensure_directory, run_build_step, run_limited, DualProject, DualRunResult,
    SharedRunner,
};

/// File names of the three sources of an HDL project, relative to its directory, and the
/// top-level entity to simulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdlSources {
    pub design: String,
    pub testbench: String,
    pub golden: String,
    pub entity: String,
}

/// Produces [`DualProject`]s.
pub trait HdlProjectFactory: Send + Sync {
    /// Copies the student design, the testbench and the golden model into a scratch directory.
    fn create_from_sources(
        &self,
        code: &[u8],
        testbench: &Path,
        golden: &Path,
        entity: &str,
    ) -> anyhow::Result<DualProject>;

    fn create_from_directory(
        &self,
        directory: &Path,
        sources: HdlSources,
    ) -> anyhow::Result<DualProject>;
}

fn materialize(
    code: &[u8],
    testbench: &Path,
    golden: &Path,
    entity: &str,
    extension: &str,
) -> anyhow::Result<(TempDir, HdlSources)> {
    let scratch = tempfile::Builder::new()
        .prefix("hdl-")
        .tempdir()
        .context("could not create scratch directory")?;
    let sources = HdlSources {
        design: format!("design.{extension}"),
        testbench: format!("testbench.{extension}"),
        golden: format!("golden.{extension}"),
        entity: entity.to_string(),
    };
    fs::write(scratch.path().join(&sources.design), code).context("could not write design")?;
    fs::copy(testbench, scratch.path().join(&sources.testbench))
        .with_context(|| format!("could not copy testbench {}", testbench.display()))?;
    fs::copy(golden, scratch.path().join(&sources.golden))
        .with_context(|| format!("could not copy golden model {}", golden.display()))?;
    Ok((scratch, sources))
}

/// Icarus Verilog: both designs compiled with the testbench, then simulated with `vvp`.
pub struct VerilogProjectFactory {
    runner: SharedRunner,
}

impl VerilogProjectFactory {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }

    fn project(&self, directory: &Path, sources: HdlSources) -> DualProject {
        const GOLDEN_OUT: &str = "golden.out";
        const CODE_OUT: &str = "code.out";

        let compile_golden = args([
            "iverilog",
            "-o",
            GOLDEN_OUT,
            sources.testbench.as_str(),
            sources.golden.as_str(),
        ]);
        let compile_code = args([
            "iverilog",
            "-o",
            CODE_OUT,
            sources.testbench.as_str(),
            sources.design.as_str(),
        ]);
        let build_runner = Arc::clone(&self.runner);
        let runner = Arc::clone(&self.runner);

        DualProject::new(
            directory,
            Box::new(move |dir| {
                run_build_step(build_runner.as_ref(), &compile_golden, dir)?;
                run_build_step(build_runner.as_ref(), &compile_code, dir)?;
                Ok(())
            }),
            Box::new(move |dir, limits| {
                let golden =
                    run_limited(runner.as_ref(), &args(["vvp", GOLDEN_OUT]), dir, Input::Empty, limits)?;
                let student =
                    run_limited(runner.as_ref(), &args(["vvp", CODE_OUT]), dir, Input::Empty, limits)?;
                Ok(DualRunResult {
                    golden_stdout: golden.stdout,
                    student,
                })
            }),
        )
    }
}

impl HdlProjectFactory for VerilogProjectFactory {
    fn create_from_sources(
        &self,
        code: &[u8],
        testbench: &Path,
        golden: &Path,
        entity: &str,
    ) -> anyhow::Result<DualProject> {
        let (scratch, sources) = materialize(code, testbench, golden, entity, "v")?;
        Ok(self.project(scratch.path(), sources).with_scratch(scratch))
    }

    fn create_from_directory(
        &self,
        directory: &Path,
        sources: HdlSources,
    ) -> anyhow::Result<DualProject> {
        ensure_directory(directory)?;
        Ok(self.project(directory, sources))
    }
}

/// GHDL: sources analysed once, each design elaborated and run against the testbench.
pub struct VhdlProjectFactory {
    runner: SharedRunner,
}

impl VhdlProjectFactory {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }

    fn project(&self, directory: &Path, sources: HdlSources) -> DualProject {
        let analyse = args(["ghdl", "-a", sources.testbench.as_str(), sources.design.as_str()]);
        let simulate = |unit: &str| {
            args([
                "ghdl",
                "-c",
                unit,
                sources.testbench.as_str(),
                "-r",
                sources.entity.as_str(),
            ])
        };
        let run_golden = simulate(&sources.golden);
        let run_code = simulate(&sources.design);
        let build_runner = Arc::clone(&self.runner);
        let runner = Arc::clone(&self.runner);

        DualProject::new(
            directory,
            Box::new(move |dir| {
                run_build_step(build_runner.as_ref(), &analyse, dir)?;
                Ok(())
            }),
            Box::new(move |dir, limits| {
                let golden = run_limited(runner.as_ref(), &run_golden, dir, Input::Empty, limits)?;
                if golden.return_code != 0 {
                    return Err(BuildError::new(format!(
                        "The reference simulation failed.\n{}",
                        golden.stderr.trim_end()
                    ))
                    .into());
                }
                let mut student =
                    run_limited(runner.as_ref(), &run_code, dir, Input::Empty, limits)?;
                student.stdout = strip_report_prefixes(&student.stdout);
                Ok(DualRunResult {
                    golden_stdout: strip_report_prefixes(&golden.stdout),
                    student,
                })
            }),
        )
    }
}

impl HdlProjectFactory for VhdlProjectFactory {
    fn create_from_sources(
        &self,
        code: &[u8],
        testbench: &Path,
        golden: &Path,
        entity: &str,
    ) -> anyhow::Result<DualProject> {
        let (scratch, sources) = materialize(code, testbench, golden, entity, "vhd")?;
        Ok(self.project(scratch.path(), sources).with_scratch(scratch))
    }

    fn create_from_directory(
        &self,
        directory: &Path,
        sources: HdlSources,
    ) -> anyhow::Result<DualProject> {
        ensure_directory(directory)?;
        Ok(self.project(directory, sources))
    }
}

/// Drops the `file:line:column:time:(severity)` prefix of GHDL report lines, which differs
/// between the golden and the student runs.
fn strip_report_prefixes(stdout: &str) -> String {
    stdout
        .lines()
        .map(|line| line.splitn(6, ':').nth(5).unwrap_or(line))
        .map(|line| format!("{line}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constraints::ResourceLimits,
        errors::ProjectError,
        sandbox::{stub::StubRunner, RunResult},
    };

    fn sources(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let tb = dir.join("tb.v");
        let golden = dir.join("ref.v");
        fs::write(&tb, "module tb; endmodule").unwrap();
        fs::write(&golden, "module adder; endmodule").unwrap();
        (tb, golden)
    }

    #[test]
    fn verilog_builds_and_runs_both_designs() {
        let inputs = tempfile::tempdir().unwrap();
        let (tb, golden) = sources(inputs.path());
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, "sum=3\n", ""))
                .then(RunResult::new(0, "sum=4\n", "")),
        );
        let mut project = VerilogProjectFactory::new(stub.clone())
            .create_from_sources(b"module adder; endmodule", &tb, &golden, "adder")
            .unwrap();
        assert!(project.directory().join("design.v").is_file());
        assert!(project.directory().join("golden.v").is_file());

        project.build().unwrap();
        let result = project.run_dual(ResourceLimits::default()).unwrap();
        assert_eq!(result.golden_stdout, "sum=3\n");
        assert_eq!(result.student.stdout, "sum=4\n");

        let calls = stub.calls();
        assert_eq!(
            calls[0].command,
            args(["iverilog", "-o", "golden.out", "testbench.v", "golden.v"])
        );
        assert_eq!(
            calls[1].command,
            args(["iverilog", "-o", "code.out", "testbench.v", "design.v"])
        );
        assert_eq!(calls[2].command, args(["vvp", "golden.out"]));
        assert_eq!(calls[3].command, args(["vvp", "code.out"]));
    }

    #[test]
    fn either_compile_failure_is_a_build_error() {
        let inputs = tempfile::tempdir().unwrap();
        let (tb, golden) = sources(inputs.path());
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(1, "", "design.v:1: syntax error")),
        );
        let mut project = VerilogProjectFactory::new(stub.clone())
            .create_from_sources(b"module", &tb, &golden, "adder")
            .unwrap();
        let Err(ProjectError::Build(err)) = project.build() else {
            panic!("expected a build error");
        };
        assert!(err.output.contains("syntax error"));
        assert!(matches!(
            project.run_dual(ResourceLimits::default()),
            Err(ProjectError::NotBuilt)
        ));
    }

    #[test]
    fn vhdl_failing_golden_is_a_build_error() {
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(1, "", "bound check failure")),
        );
        let dir = tempfile::tempdir().unwrap();
        let sources = HdlSources {
            design: "design.vhd".into(),
            testbench: "tb.vhd".into(),
            golden: "golden.vhd".into(),
            entity: "tb".into(),
        };
        let mut project = VhdlProjectFactory::new(stub.clone())
            .create_from_directory(dir.path(), sources)
            .unwrap();
        project.build().unwrap();
        assert!(matches!(
            project.run_dual(ResourceLimits::default()),
            Err(ProjectError::Build(_))
        ));
        let calls = stub.calls();
        assert_eq!(calls[0].command, args(["ghdl", "-a", "tb.vhd", "design.vhd"]));
        assert_eq!(
            calls[1].command,
            args(["ghdl", "-c", "golden.vhd", "tb.vhd", "-r", "tb"])
        );
    }

    #[test]
    fn vhdl_reports_are_compared_without_location() {
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, "golden.vhd:10:5:@20ns:(report note): out=1\n", ""))
                .then(RunResult::new(0, "design.vhd:42:9:@20ns:(report note): out=1\n", "")),
        );
        let dir = tempfile::tempdir().unwrap();
        let sources = HdlSources {
            design: "design.vhd".into(),
            testbench: "tb.vhd".into(),
            golden: "golden.vhd".into(),
            entity: "tb".into(),
        };
        let mut project = VhdlProjectFactory::new(stub)
            .create_from_directory(dir.path(), sources)
            .unwrap();
        project.build().unwrap();
        let result = project.run_dual(ResourceLimits::default()).unwrap();
        assert_eq!(result.golden_stdout, " out=1\n");
        assert_eq!(result.student.stdout, result.golden_stdout);
    }

    #[test]
    fn unprefixed_lines_are_kept() {
        assert_eq!(strip_report_prefixes("plain line\n"), "plain line\n");
    }
}
