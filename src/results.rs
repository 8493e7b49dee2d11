//! Grading outcomes and the mapping from sandbox exit codes to them.
//!
//! [`GraderResult`] is ordered by precedence: a lower value is a more severe outcome and wins
//! when several results are folded into one (see [`summary_result`]).

use serde::Serialize;

/// Outcome of grading one test case, or a whole submission.
///
/// Discriminants leave gaps so new outcomes can be slotted in without renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum GraderResult {
    CompilationError = 10,
    TimeLimitExceeded = 20,
    MemoryLimitExceeded = 30,
    RuntimeError = 40,
    OutputLimitExceeded = 50,
    GradingRuntimeError = 60,
    InternalError = 70,
    PresentationError = 80,
    WrongAnswer = 90,
    Accepted = 100,
}

impl GraderResult {
    pub const ALL: [GraderResult; 10] = [
        GraderResult::CompilationError,
        GraderResult::TimeLimitExceeded,
        GraderResult::MemoryLimitExceeded,
        GraderResult::RuntimeError,
        GraderResult::OutputLimitExceeded,
        GraderResult::GradingRuntimeError,
        GraderResult::InternalError,
        GraderResult::PresentationError,
        GraderResult::WrongAnswer,
        GraderResult::Accepted,
    ];

    /// Numeric precedence, higher is better.
    pub fn precedence(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            GraderResult::CompilationError => "COMPILATION_ERROR",
            GraderResult::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            GraderResult::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            GraderResult::RuntimeError => "RUNTIME_ERROR",
            GraderResult::OutputLimitExceeded => "OUTPUT_LIMIT_EXCEEDED",
            GraderResult::GradingRuntimeError => "GRADING_RUNTIME_ERROR",
            GraderResult::InternalError => "INTERNAL_ERROR",
            GraderResult::PresentationError => "PRESENTATION_ERROR",
            GraderResult::WrongAnswer => "WRONG_ANSWER",
            GraderResult::Accepted => "ACCEPTED",
        }
    }
}

impl std::fmt::Display for GraderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Exit codes reserved by the sandbox to report its own verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SandboxCode {
    MemoryLimit = 252,
    TimeLimit = 253,
    InternalError = 254,
}

impl SandboxCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Maps a non-zero exit code to its outcome.
///
/// Zero is not an outcome on its own (the output still has to be compared); it is mapped to
/// `RuntimeError` here only so the function stays total.
pub fn parse_non_zero_return_code(return_code: i32) -> GraderResult {
    match return_code {
        c if c == SandboxCode::MemoryLimit.code() => GraderResult::MemoryLimitExceeded,
        c if c == SandboxCode::TimeLimit.code() => GraderResult::TimeLimitExceeded,
        c if c == SandboxCode::InternalError.code() => GraderResult::InternalError,
        _ => GraderResult::RuntimeError,
    }
}

/// Message put in front of the compiler diagnostic when a build step fails.
pub fn compilation_message(return_code: i32) -> &'static str {
    if return_code == 0 {
        return "";
    }
    match parse_non_zero_return_code(return_code) {
        GraderResult::MemoryLimitExceeded => "The memory limit was exceeded during compilation.",
        GraderResult::TimeLimitExceeded => "The time limit was exceeded during compilation.",
        _ => "Compilation failed.",
    }
}

/// Worst-wins fold. An empty set is vacuously accepted.
pub fn summary_result<I>(results: I) -> GraderResult
where
    I: IntoIterator<Item = GraderResult>,
{
    results.into_iter().min().unwrap_or(GraderResult::Accepted)
}
