//! Drives one submission through its test cases.
//!
//! The [`Grader`] builds the project once, runs every [`TestCase`] with the same limits and
//! folds the per-case results into a [`SubmissionSummary`]. For each run, the output-size
//! guard is applied first and the classifier second. A run whose output carries the
//! cooperative timeout marker is retried once before being judged.
//!
//! Nothing here panics or returns an error to the caller: a build failure becomes a
//! `COMPILATION_ERROR` for every case, and harness or sandbox failures become
//! `INTERNAL_ERROR`.

use std::{collections::BTreeMap, time::Duration};

use anyhow::bail;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    classifier::{classify, exceeds_output_limit},
    configuration::GraderConfiguration,
    constraints::ResourceLimits,
    diff::line_diff,
    errors::ProjectError,
    logger::init_logger,
    project::{DualProject, Project},
    results::{parse_non_zero_return_code, summary_result, GraderResult},
    sandbox::{Input, RunResult},
    test_case::TestCase,
    text::{cut_stderr, reduce_text, remove_socket_exception},
};

/// Stdout kept in the debug bundle of a graded test case.
pub const DEBUG_STDOUT_LIMIT: usize = 50 * 1024;
/// Stdout kept for a custom-input run.
pub const CUSTOM_STDOUT_LIMIT: usize = 80 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCaseResult {
    pub name: String,
    pub result: GraderResult,
    /// Weight of the case when accepted, zero otherwise.
    pub score: f64,
}

/// What the submitter gets to see about a failed test case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestCaseDebugInfo {
    pub input: String,
    pub stdout: String,
    pub stderr: String,
    pub return_code: Option<i32>,
    pub diff: Option<String>,
    pub execution_time: Option<Duration>,
    pub memory_usage: Option<u64>,
    pub total_subcases: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    pub compilation_output: Option<String>,
    /// Non-accepted test cases only.
    pub files_feedback: BTreeMap<String, TestCaseDebugInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionSummary {
    pub results: Vec<TestCaseResult>,
    pub summary_result: GraderResult,
    /// Percentage in `[0, 100]`.
    pub grade: f64,
    pub success: bool,
    pub debug_info: DebugInfo,
}

impl SubmissionSummary {
    /// Same result with a zero score for every case.
    fn uniform<'a>(
        names: impl IntoIterator<Item = &'a str>,
        result: GraderResult,
        debug_info: DebugInfo,
    ) -> Self {
        let results: Vec<TestCaseResult> = names
            .into_iter()
            .map(|name| TestCaseResult {
                name: name.to_string(),
                result,
                score: 0.0,
            })
            .collect();
        Self {
            summary_result: if results.is_empty() {
                result
            } else {
                summary_result(results.iter().map(|r| r.result))
            },
            results,
            grade: 0.0,
            success: false,
            debug_info,
        }
    }
}

/// Outcome of a single run on student-provided input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomRunSummary {
    pub result: GraderResult,
    /// 100 when accepted, 0 otherwise.
    pub grade: u8,
    pub stdout: String,
    pub stderr: String,
    pub return_code: Option<i32>,
    pub compilation_output: Option<String>,
}

impl CustomRunSummary {
    fn failed(result: GraderResult, compilation_output: Option<String>) -> Self {
        Self {
            result,
            grade: 0,
            stdout: String::new(),
            stderr: String::new(),
            return_code: None,
            compilation_output,
        }
    }
}

/// Judges submissions with a fixed configuration and fixed limits.
#[derive(Debug, Clone)]
pub struct Grader {
    config: GraderConfiguration,
    limits: ResourceLimits,
}

impl Grader {
    /// When `config` names a log directory, a global log file is installed there.
    pub fn new(config: GraderConfiguration, limits: ResourceLimits) -> Self {
        if let Some(dir) = &config.log {
            match init_logger(dir) {
                Ok(path) => info!("grading log: {}", path.display()),
                Err(e) => eprintln!("could not initialize the grading log: {e:#}"),
            }
        }
        Self { config, limits }
    }

    pub fn config(&self) -> &GraderConfiguration {
        &self.config
    }

    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    /// Builds `project` and runs every test case; `weights[i]` is the weight of
    /// `test_cases[i]`.
    #[instrument(skip_all, fields(tests = test_cases.len()))]
    pub fn grade(
        &self,
        project: &mut Project,
        test_cases: &[TestCase],
        weights: &[f64],
    ) -> SubmissionSummary {
        match self.try_grade(project, test_cases, weights) {
            Ok(summary) => {
                info!(
                    result = %summary.summary_result,
                    grade = summary.grade,
                    "submission graded"
                );
                summary
            }
            Err(e) => {
                error!("grading aborted: {e:#}");
                SubmissionSummary::uniform(
                    test_cases.iter().map(|t| t.name.as_str()),
                    GraderResult::InternalError,
                    DebugInfo::default(),
                )
            }
        }
    }

    fn try_grade(
        &self,
        project: &mut Project,
        test_cases: &[TestCase],
        weights: &[f64],
    ) -> anyhow::Result<SubmissionSummary> {
        if weights.len() != test_cases.len() {
            bail!(
                "{} weights given for {} test cases",
                weights.len(),
                test_cases.len()
            );
        }
        if let Some(weight) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            bail!("invalid test case weight {weight}");
        }

        match project.build() {
            Ok(()) => {}
            Err(ProjectError::Build(e)) => {
                return Ok(SubmissionSummary::uniform(
                    test_cases.iter().map(|t| t.name.as_str()),
                    GraderResult::CompilationError,
                    DebugInfo {
                        compilation_output: Some(e.output),
                        ..DebugInfo::default()
                    },
                ));
            }
            Err(e) => return Err(e.into()),
        }

        let mut results = Vec::with_capacity(test_cases.len());
        let mut debug_info = DebugInfo::default();
        for (case, weight) in test_cases.iter().zip(weights) {
            let (result, debug) = self.run_test_case(project, case);
            info!(test = %case.name, %result, "test case graded");
            if let Some(debug) = debug {
                debug_info.files_feedback.insert(case.name.clone(), debug);
            }
            results.push(TestCaseResult {
                name: case.name.clone(),
                result,
                score: if result == GraderResult::Accepted {
                    *weight
                } else {
                    0.0
                },
            });
        }

        let total: f64 = weights.iter().sum();
        let score: f64 = results.iter().map(|r| r.score).sum();
        let grade = if total == 0.0 {
            100.0
        } else {
            score * 100.0 / total
        };
        Ok(SubmissionSummary {
            summary_result: summary_result(results.iter().map(|r| r.result)),
            success: results.iter().all(|r| r.result == GraderResult::Accepted),
            results,
            grade,
            debug_info,
        })
    }

    /// Runs `project` on `input` once. Retries when the run reports a cooperative timeout.
    fn run_with_retry(&self, project: &Project, input: &Input) -> Result<RunResult, ProjectError> {
        let run = project.run(input.clone(), self.limits)?;
        match &self.config.cooperative_timeout_marker {
            Some(marker) if run.stdout.contains(marker.as_str()) => {
                warn!("cooperative timeout reported, retrying once");
                project.run(input.clone(), self.limits)
            }
            _ => Ok(run),
        }
    }

    fn run_test_case(
        &self,
        project: &Project,
        case: &TestCase,
    ) -> (GraderResult, Option<TestCaseDebugInfo>) {
        let mut run = match self.run_with_retry(project, &case.input) {
            Ok(run) => run,
            Err(e) => {
                error!(test = %case.name, "run failed: {e}");
                return (GraderResult::InternalError, None);
            }
        };

        let result = if exceeds_output_limit(&run.stdout, self.config.output_limit) {
            debug!("discarding {} bytes of output", run.stdout.len());
            // frees the buffer right away
            run.stdout = String::new();
            GraderResult::OutputLimitExceeded
        } else if run.return_code == 0
            && self
                .config
                .cooperative_timeout_marker
                .as_deref()
                .is_some_and(|marker| run.stdout.contains(marker))
        {
            GraderResult::TimeLimitExceeded
        } else {
            classify(
                run.return_code,
                &run.stdout,
                case.expected_output.as_deref(),
                &self.config,
            )
        };

        if result == GraderResult::Accepted {
            return (result, None);
        }
        let diff = match (&case.expected_output, result) {
            (Some(expected), GraderResult::WrongAnswer | GraderResult::PresentationError)
                if self.config.compute_diff && self.config.diff_visible_for(&case.name) =>
            {
                Some(line_diff(expected, &run.stdout))
            }
            _ => None,
        };
        let debug = TestCaseDebugInfo {
            input: case.input.describe(),
            stdout: reduce_text(&run.stdout, DEBUG_STDOUT_LIMIT),
            stderr: reduce_text(
                &cut_stderr(&remove_socket_exception(&run.stderr)),
                DEBUG_STDOUT_LIMIT,
            ),
            return_code: Some(run.return_code),
            diff,
            execution_time: run.execution_time,
            memory_usage: run.memory_usage,
            total_subcases: case.total_subcases,
        };
        (result, Some(debug))
    }

    /// Builds `project` and runs it once on `input`, without any expected output.
    #[instrument(skip_all)]
    pub fn run_custom_input(&self, project: &mut Project, input: Input) -> CustomRunSummary {
        match project.build() {
            Ok(()) => {}
            Err(ProjectError::Build(e)) => {
                return CustomRunSummary::failed(GraderResult::CompilationError, Some(e.output))
            }
            Err(e) => {
                error!("custom run build failed: {e}");
                return CustomRunSummary::failed(GraderResult::InternalError, None);
            }
        }

        let run = match project.run(input, self.limits) {
            Ok(run) => run,
            Err(e) => {
                error!("custom run failed: {e}");
                return CustomRunSummary::failed(GraderResult::InternalError, None);
            }
        };

        let (result, stdout) = if exceeds_output_limit(&run.stdout, self.config.output_limit) {
            (GraderResult::OutputLimitExceeded, String::new())
        } else if run.return_code != 0 {
            (
                parse_non_zero_return_code(run.return_code),
                reduce_text(&run.stdout, CUSTOM_STDOUT_LIMIT),
            )
        } else {
            (
                GraderResult::Accepted,
                reduce_text(&run.stdout, CUSTOM_STDOUT_LIMIT),
            )
        };
        info!(%result, "custom input run");
        CustomRunSummary {
            result,
            grade: if result == GraderResult::Accepted { 100 } else { 0 },
            stdout,
            stderr: reduce_text(
                &cut_stderr(&remove_socket_exception(&run.stderr)),
                CUSTOM_STDOUT_LIMIT,
            ),
            return_code: Some(run.return_code),
            compilation_output: None,
        }
    }

    /// Grades a hardware design against the live output of its golden model.
    #[instrument(skip(self, project))]
    pub fn grade_dual(&self, project: &mut DualProject, testbench_name: &str) -> SubmissionSummary {
        let compilation_error = |output: String| {
            SubmissionSummary::uniform(
                [testbench_name],
                GraderResult::CompilationError,
                DebugInfo {
                    compilation_output: Some(output),
                    ..DebugInfo::default()
                },
            )
        };
        let internal_error = |e: ProjectError| {
            error!("dual grading aborted: {e}");
            SubmissionSummary::uniform(
                [testbench_name],
                GraderResult::InternalError,
                DebugInfo::default(),
            )
        };

        match project.build() {
            Ok(()) => {}
            Err(ProjectError::Build(e)) => return compilation_error(e.output),
            Err(e) => return internal_error(e),
        }
        let dual = match project.run_dual(self.limits) {
            Ok(dual) => dual,
            Err(ProjectError::Build(e)) => return compilation_error(e.output),
            Err(e) => return internal_error(e),
        };

        let case = TestCase::new(testbench_name, Input::Empty)
            .with_expected_output(dual.golden_stdout);
        let mut student = dual.student;
        let result = if exceeds_output_limit(&student.stdout, self.config.output_limit) {
            student.stdout = String::new();
            GraderResult::OutputLimitExceeded
        } else {
            classify(
                student.return_code,
                &student.stdout,
                case.expected_output.as_deref(),
                &self.config,
            )
        };
        info!(%result, "design graded");

        let mut debug_info = DebugInfo::default();
        if result != GraderResult::Accepted {
            let diff = match (&case.expected_output, result) {
                (Some(expected), GraderResult::WrongAnswer | GraderResult::PresentationError)
                    if self.config.compute_diff && self.config.diff_visible_for(&case.name) =>
                {
                    Some(line_diff(expected, &student.stdout))
                }
                _ => None,
            };
            debug_info.files_feedback.insert(
                case.name.clone(),
                TestCaseDebugInfo {
                    input: testbench_name.to_string(),
                    stdout: reduce_text(&student.stdout, DEBUG_STDOUT_LIMIT),
                    stderr: cut_stderr(&student.stderr),
                    return_code: Some(student.return_code),
                    diff,
                    execution_time: student.execution_time,
                    memory_usage: student.memory_usage,
                    total_subcases: None,
                },
            );
        }

        let accepted = result == GraderResult::Accepted;
        SubmissionSummary {
            results: vec![TestCaseResult {
                name: case.name,
                result,
                score: if accepted { 1.0 } else { 0.0 },
            }],
            summary_result: result,
            grade: if accepted { 100.0 } else { 0.0 },
            success: accepted,
            debug_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        project::{CompiledProjectFactory, ProjectFactory},
        sandbox::stub::StubRunner,
    };

    fn cases() -> Vec<TestCase> {
        vec![
            TestCase::new("t1", Input::Text("1".into())).with_expected_output("one\n"),
            TestCase::new("t2", Input::Text("2".into())).with_expected_output("two\n"),
        ]
    }

    fn project(stub: &Arc<StubRunner>) -> Project {
        CompiledProjectFactory::c(stub.clone())
            .create_from_code(b"int main() {}")
            .unwrap()
    }

    fn grader() -> Grader {
        Grader::new(GraderConfiguration::new(), ResourceLimits::default())
    }

    #[test]
    fn compile_failure_fails_every_case_without_running() {
        let stub = Arc::new(StubRunner::new().then(RunResult::new(1, "", "main.c: error")));
        let summary = grader().grade(&mut project(&stub), &cases(), &[1.0, 1.0]);

        assert!(summary
            .results
            .iter()
            .all(|r| r.result == GraderResult::CompilationError));
        assert_eq!(summary.summary_result, GraderResult::CompilationError);
        assert_eq!(summary.grade, 0.0);
        assert!(!summary.success);
        assert!(summary
            .debug_info
            .compilation_output
            .is_some_and(|o| o.contains("main.c: error")));
        assert_eq!(stub.count_program("./main"), 0);
    }

    #[test]
    fn weighted_grade() {
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, "wrong\n", ""))
                .then(RunResult::new(0, "two\n", "")),
        );
        let summary = grader().grade(&mut project(&stub), &cases(), &[1.0, 3.0]);

        assert_eq!(summary.grade, 75.0);
        assert_eq!(summary.summary_result, GraderResult::WrongAnswer);
        assert!(!summary.success);
        assert_eq!(summary.results[0].score, 0.0);
        assert_eq!(summary.results[1].score, 3.0);
        assert!(summary.debug_info.files_feedback.contains_key("t1"));
        assert!(!summary.debug_info.files_feedback.contains_key("t2"));
    }

    #[test]
    fn order_of_test_cases_does_not_matter() {
        let outputs = ["one\n", "2\n", "three\n"];
        let all = vec![
            TestCase::new("a", Input::Empty).with_expected_output("one\n"),
            TestCase::new("b", Input::Empty).with_expected_output("two\n"),
            TestCase::new("c", Input::Empty).with_expected_output("three\n"),
        ];
        let weights = [2.0, 5.0, 3.0];

        let run = |order: [usize; 3]| {
            let mut stub = StubRunner::new().then(RunResult::new(0, "", ""));
            for &i in &order {
                stub = stub.then(RunResult::new(0, outputs[i], ""));
            }
            let stub = Arc::new(stub);
            let cases: Vec<TestCase> = order.iter().map(|&i| all[i].clone()).collect();
            let weights: Vec<f64> = order.iter().map(|&i| weights[i]).collect();
            grader().grade(&mut project(&stub), &cases, &weights)
        };

        let forward = run([0, 1, 2]);
        let backward = run([2, 1, 0]);
        assert_eq!(forward.grade, 50.0);
        assert_eq!(forward.grade, backward.grade);
        assert_eq!(forward.summary_result, backward.summary_result);
        assert_eq!(forward.summary_result, GraderResult::WrongAnswer);
    }

    #[test]
    fn zero_total_weight_is_full_grade() {
        let stub = Arc::new(StubRunner::new());
        let cases = vec![TestCase::new("info", Input::Empty)];
        let summary = grader().grade(&mut project(&stub), &cases, &[0.0]);
        assert_eq!(summary.grade, 100.0);
        assert!(summary.success);
    }

    #[test]
    fn oversized_output_is_output_limit_exceeded() {
        let expected = "x".repeat(64);
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, expected.clone(), "")),
        );
        let grader = Grader::new(
            GraderConfiguration::new().with_output_limit(16),
            ResourceLimits::default(),
        );
        let cases = vec![TestCase::new("big", Input::Empty).with_expected_output(expected)];
        let summary = grader.grade(&mut project(&stub), &cases, &[1.0]);
        assert_eq!(summary.results[0].result, GraderResult::OutputLimitExceeded);
        assert_eq!(summary.debug_info.files_feedback["big"].stdout, "");
    }

    #[test]
    fn cooperative_timeout_is_retried_once() {
        let marker = "# Error: evaluation exceeded\n";
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, marker, ""))
                .then(RunResult::new(0, "one\n", "")),
        );
        let cases = vec![TestCase::new("t1", Input::Empty).with_expected_output("one\n")];
        let summary = grader().grade(&mut project(&stub), &cases, &[1.0]);
        assert_eq!(summary.results[0].result, GraderResult::Accepted);
        assert_eq!(stub.count_program("./main"), 2);

        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, marker, ""))
                .then(RunResult::new(0, marker, "")),
        );
        let summary = grader().grade(&mut project(&stub), &cases, &[1.0]);
        assert_eq!(summary.results[0].result, GraderResult::TimeLimitExceeded);
        assert_eq!(stub.count_program("./main"), 2);
    }

    #[test]
    fn diff_only_for_visible_cases() {
        let script = || {
            Arc::new(
                StubRunner::new()
                    .then(RunResult::new(0, "", ""))
                    .then(RunResult::new(0, "uno\n", ""))
                    .then(RunResult::new(0, "dos\n", "")),
            )
        };
        let config = GraderConfiguration::new().with_output_diff_for(["t1"]);
        let grader = Grader::new(config.clone(), ResourceLimits::default());
        let summary = grader.grade(&mut project(&script()), &cases(), &[1.0, 1.0]);
        let feedback = &summary.debug_info.files_feedback;
        assert_eq!(feedback["t1"].diff.as_deref(), Some("- one\n+ uno\n"));
        assert_eq!(feedback["t2"].diff, None);

        let staff = Grader::new(config.with_is_staff(true), ResourceLimits::default());
        let summary = staff.grade(&mut project(&script()), &cases(), &[1.0, 1.0]);
        assert!(summary.debug_info.files_feedback["t2"].diff.is_some());

        let no_diff = Grader::new(
            GraderConfiguration::new()
                .with_is_staff(true)
                .with_compute_diff(false),
            ResourceLimits::default(),
        );
        let summary = no_diff.grade(&mut project(&script()), &cases(), &[1.0, 1.0]);
        assert!(summary.debug_info.files_feedback["t1"].diff.is_none());
    }

    #[test]
    fn sandbox_failure_is_an_internal_error() {
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then_fail("sandbox binary missing")
                .then(RunResult::new(0, "two\n", "")),
        );
        let summary = grader().grade(&mut project(&stub), &cases(), &[1.0, 1.0]);
        assert_eq!(summary.results[0].result, GraderResult::InternalError);
        assert_eq!(summary.results[1].result, GraderResult::Accepted);
        assert_eq!(summary.grade, 50.0);
    }

    #[test]
    fn mismatched_weights_are_an_internal_error() {
        let stub = Arc::new(StubRunner::new());
        let summary = grader().grade(&mut project(&stub), &cases(), &[1.0]);
        assert_eq!(summary.summary_result, GraderResult::InternalError);
        assert_eq!(summary.results.len(), 2);
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn negative_or_nan_weights_are_an_internal_error() {
        for weights in [[2.0, -1.0], [1.0, f64::NAN], [f64::INFINITY, 1.0]] {
            let stub = Arc::new(StubRunner::new());
            let summary = grader().grade(&mut project(&stub), &cases(), &weights);
            assert_eq!(summary.summary_result, GraderResult::InternalError);
            assert!((0.0..=100.0).contains(&summary.grade));
            assert!(stub.calls().is_empty());
        }
    }

    #[test]
    fn custom_input_caps_a_single_long_stderr_line() {
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(1, "", "x".repeat(CUSTOM_STDOUT_LIMIT * 2))),
        );
        let summary = grader().run_custom_input(&mut project(&stub), Input::Empty);
        assert_eq!(summary.result, GraderResult::RuntimeError);
        assert!(summary.stderr.len() <= CUSTOM_STDOUT_LIMIT + "\n...".len());
    }

    #[test]
    fn runtime_errors_keep_debug_info() {
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(139, "", "Segmentation fault"))
                .then(RunResult::new(252, "", "")),
        );
        let cases = cases().into_iter().map(|c| c.with_total_subcases(4)).collect::<Vec<_>>();
        let summary = grader().grade(&mut project(&stub), &cases, &[1.0, 1.0]);
        assert_eq!(summary.results[0].result, GraderResult::RuntimeError);
        assert_eq!(summary.results[1].result, GraderResult::MemoryLimitExceeded);
        assert_eq!(summary.summary_result, GraderResult::MemoryLimitExceeded);
        let t1 = &summary.debug_info.files_feedback["t1"];
        assert_eq!(t1.return_code, Some(139));
        assert_eq!(t1.stderr, "Segmentation fault");
        assert_eq!(t1.input, "<text>");
        assert_eq!(t1.total_subcases, Some(4));
    }

    #[test]
    fn custom_input() {
        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(0, "hello\n", "")),
        );
        let summary = grader().run_custom_input(&mut project(&stub), Input::Text("x".into()));
        assert_eq!(summary.result, GraderResult::Accepted);
        assert_eq!(summary.grade, 100);
        assert_eq!(summary.stdout, "hello\n");

        let stub = Arc::new(
            StubRunner::new()
                .then(RunResult::new(0, "", ""))
                .then(RunResult::new(253, "", "")),
        );
        let summary = grader().run_custom_input(&mut project(&stub), Input::Empty);
        assert_eq!(summary.result, GraderResult::TimeLimitExceeded);
        assert_eq!(summary.grade, 0);

        let stub = Arc::new(StubRunner::new().then(RunResult::new(1, "", "syntax")));
        let summary = grader().run_custom_input(&mut project(&stub), Input::Empty);
        assert_eq!(summary.result, GraderResult::CompilationError);
        assert!(summary.compilation_output.is_some_and(|o| o.contains("syntax")));
    }

    #[test]
    fn summary_serializes_to_json() {
        let stub = Arc::new(StubRunner::new().then(RunResult::new(1, "", "")));
        let summary = grader().grade(&mut project(&stub), &cases(), &[1.0, 1.0]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["summary_result"], "COMPILATION_ERROR");
        assert_eq!(json["results"][0]["name"], "t1");
    }
}
