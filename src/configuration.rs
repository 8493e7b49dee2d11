//! Config for the grader behaviors
//!
//! This module provides configuration options for controlling how test cases are judged and
//! what ends up in the debug bundle.
//!
//! Configuration can be created programmatically using [`GraderConfiguration::new()`] or by
//! reading environment variables using [`GraderConfiguration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Boolean flags are case-insensitive and enabled by `"true"`.
//!
//! - `GRADER_COMPUTE_DIFF` — Compute a diff for wrong outputs (default: `true`)
//! - `GRADER_TREAT_NON_ZERO_AS_RUNTIME_ERROR` — Map non-zero exits through the sandbox code
//!   table instead of calling them wrong answers (default: `true`)
//! - `GRADER_IGNORE_PRESENTATION_ERROR` — Accept outputs that differ only in whitespace
//!   (default: `false`)
//! - `GRADER_OUTPUT_LIMIT` — Output budget in bytes (default: 2 MiB)
//! - `GRADER_IS_STAFF` — The submission comes from staff, diffs are always shown
//!   (default: `false`)
//! - `GRADER_LOG_DIR` — Directory where a log file is written (default: no log file)

use std::{collections::HashSet, path::PathBuf};

use tracing::warn;

/// Default output budget: 2 MiB.
pub const DEFAULT_OUTPUT_LIMIT: usize = 2 * 1024 * 1024;

/// Text printed by test frameworks that enforce their own per-test timeout.
pub const DEFAULT_COOPERATIVE_TIMEOUT_MARKER: &str = "# Error: evaluation exceeded";

/// Configuration for grader behaviors.
#[derive(Debug, Clone)]
pub struct GraderConfiguration {
    pub(crate) compute_diff: bool,
    pub(crate) output_diff_for: HashSet<String>,
    pub(crate) treat_non_zero_as_runtime_error: bool,
    pub(crate) ignore_presentation_error: bool,
    pub(crate) output_limit: usize,
    pub(crate) is_staff: bool,
    pub(crate) cooperative_timeout_marker: Option<String>,
    pub(crate) log: Option<PathBuf>,
}

impl GraderConfiguration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Diffs are computed, but only shown for staff or listed test cases (none listed).
    /// - Non-zero exit codes are mapped through the sandbox code table.
    /// - Presentation errors are reported as such.
    /// - Output is limited to 2 MiB.
    /// - A run whose stdout contains `"# Error: evaluation exceeded"` is retried once.
    /// - No log file is written.
    pub fn new() -> Self {
        Self {
            compute_diff: true,
            output_diff_for: HashSet::new(),
            treat_non_zero_as_runtime_error: true,
            ignore_presentation_error: false,
            output_limit: DEFAULT_OUTPUT_LIMIT,
            is_staff: false,
            cooperative_timeout_marker: Some(DEFAULT_COOPERATIVE_TIMEOUT_MARKER.to_string()),
            log: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables. Any other value (including
    /// unset) will result in using the default value for each field.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let defaults = Self::new();
        let output_limit = match std::env::var("GRADER_OUTPUT_LIMIT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("ignoring GRADER_OUTPUT_LIMIT={raw:?}: not a byte count");
                defaults.output_limit
            }),
            Err(_) => defaults.output_limit,
        };

        Self {
            compute_diff: get_env_flag("GRADER_COMPUTE_DIFF", defaults.compute_diff),
            treat_non_zero_as_runtime_error: get_env_flag(
                "GRADER_TREAT_NON_ZERO_AS_RUNTIME_ERROR",
                defaults.treat_non_zero_as_runtime_error,
            ),
            ignore_presentation_error: get_env_flag(
                "GRADER_IGNORE_PRESENTATION_ERROR",
                defaults.ignore_presentation_error,
            ),
            output_limit,
            is_staff: get_env_flag("GRADER_IS_STAFF", defaults.is_staff),
            log: std::env::var_os("GRADER_LOG_DIR").map(PathBuf::from),
            ..defaults
        }
    }

    /// Enable or disable diff computation for wrong outputs.
    pub fn with_compute_diff(mut self, value: bool) -> Self {
        self.compute_diff = value;
        self
    }

    /// Test cases whose diff is shown to non-staff submitters.
    pub fn with_output_diff_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_diff_for = names.into_iter().map(Into::into).collect();
        self
    }

    /// When disabled, any non-zero exit is a wrong answer.
    pub fn with_treat_non_zero_as_runtime_error(mut self, value: bool) -> Self {
        self.treat_non_zero_as_runtime_error = value;
        self
    }

    /// Accept outputs that only differ in whitespace.
    pub fn with_ignore_presentation_error(mut self, value: bool) -> Self {
        self.ignore_presentation_error = value;
        self
    }

    /// Set the output budget in bytes.
    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = bytes;
        self
    }

    /// Mark the submission as coming from staff.
    pub fn with_is_staff(mut self, value: bool) -> Self {
        self.is_staff = value;
        self
    }

    /// Set (or clear) the marker that triggers the single timeout retry.
    pub fn with_cooperative_timeout_marker(mut self, marker: Option<&str>) -> Self {
        self.cooperative_timeout_marker = marker.map(str::to_string);
        self
    }

    /// Write a log file in the given directory.
    pub fn with_log(mut self, dir: Option<PathBuf>) -> Self {
        self.log = dir;
        self
    }

    pub fn output_limit(&self) -> usize {
        self.output_limit
    }

    /// Whether the diff of `test_name` may be shown to the submitter.
    pub(crate) fn diff_visible_for(&self, test_name: &str) -> bool {
        self.is_staff || self.output_diff_for.contains(test_name)
    }
}

impl Default for GraderConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_visibility() {
        let config = GraderConfiguration::new().with_output_diff_for(["public"]);
        assert!(config.diff_visible_for("public"));
        assert!(!config.diff_visible_for("hidden"));

        let staff = config.with_is_staff(true);
        assert!(staff.diff_visible_for("hidden"));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = GraderConfiguration::default()
            .with_output_limit(10)
            .with_cooperative_timeout_marker(None)
            .with_ignore_presentation_error(true);
        assert_eq!(config.output_limit(), 10);
        assert!(config.cooperative_timeout_marker.is_none());
        assert!(config.ignore_presentation_error);
        assert!(config.compute_diff);
    }
}
