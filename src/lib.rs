//! # Multilang Grader
//!
//! Builds untrusted student submissions, runs them against test cases inside a sandbox and
//! classifies every run into a precedence-ordered [`GraderResult`](results::GraderResult).
//!
//! It provides:
//! - One [`Project`](project::Project) type for "build once, run many times" workflows, with
//!   per-language recipes behind the [`ProjectFactory`](project::ProjectFactory) trait
//!   (interpreted, single-file compiled, classpath, Makefile, dual-run HDL simulation)
//! - A [`SandboxRunner`](sandbox::SandboxRunner) trait and a process-based implementation with
//!   pluggable resource accounting (wall clock, sandbox usage log, `wait4`, active profiler)
//! - A pure [`classifier`] for exit codes and outputs, including presentation errors
//! - A [`Grader`](harness::Grader) that drives a project through its test cases and
//!   aggregates a weighted grade with worst-wins precedence
//!
//! Only Unix targets are supported: processes are supervised through process groups.
//!
//! # Documentation Overview
//!
//! - For the execution model and backends, see the [`project`] module and [`registry`].
//! - For limits and how they reach the sandbox executable, see [`constraints`] and
//!   [`sandbox`].
//! - For grading behavior (diffs, presentation errors, output budget), see
//!   [`GraderConfiguration`](configuration::GraderConfiguration).
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use multilang_grader::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let runner = Arc::new(SandboxConfig::from_env().build());
//!     let registry = FactoryRegistry::with_defaults(runner);
//!
//!     let factory = registry.program_factory("cpp11")?;
//!     let mut project = factory.create_from_code(b"#include <cstdio>\nint main() { puts(\"42\"); }")?;
//!
//!     let limits = ResourceLimitsBuilder::from_env().build()?;
//!     let grader = Grader::new(GraderConfiguration::from_env(), limits);
//!     let tests = vec![TestCase::new("answer", Input::Empty).with_expected_output("42\n")];
//!
//!     let summary = grader.grade(&mut project, &tests, &[1.0]);
//!     println!("{}: {:.1}%", summary.summary_result, summary.grade);
//!     Ok(())
//! }
//! ```

pub use anyhow;
pub mod classifier;
pub mod configuration;
pub mod constraints;
pub mod diff;
pub mod errors;
pub mod harness;
mod logger;
pub mod project;
pub mod registry;
pub mod results;
pub mod sandbox;
pub mod test_case;
mod text;

/// Commonly used types and traits for quick access.
///
/// ```rust
/// use multilang_grader::prelude::*;
/// ```
pub mod prelude {
    pub use crate::configuration::GraderConfiguration;
    pub use crate::constraints::{ResourceLimits, ResourceLimitsBuilder};
    pub use crate::errors::{BuildError, ProjectError};
    pub use crate::harness::{Grader, SubmissionSummary};
    pub use crate::project::{HdlProjectFactory, Project, ProjectFactory};
    pub use crate::registry::{BackendFactory, FactoryRegistry};
    pub use crate::results::GraderResult;
    pub use crate::sandbox::{Input, ProcessSandbox, SandboxConfig, SandboxRunner};
    pub use crate::test_case::TestCase;
}
