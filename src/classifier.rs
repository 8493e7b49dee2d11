//! Turns a raw process outcome into a [`GraderResult`].
//!
//! Output is compared in two tiers: exact equality first, then a whitespace-insensitive token
//! comparison that can only downgrade a mismatch to a presentation error, never hide a wrong
//! token.
//!
//! The output-size guard ([`exceeds_output_limit`]) is applied by the harness before any of
//! this runs.

use crate::{
    configuration::GraderConfiguration,
    results::{parse_non_zero_return_code, GraderResult},
};

const TOKEN_SEPARATORS: [char; 4] = [' ', '\t', '\r', '\n'];

/// Byte-for-byte equality.
pub fn check_output(stdout: &str, expected: &str) -> bool {
    stdout == expected
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(TOKEN_SEPARATORS).filter(|t| !t.is_empty())
}

/// Whether `stdout` and `expected` hold the same tokens once whitespace is ignored.
///
/// ```
/// use multilang_grader::classifier::is_presentation_error;
///
/// assert!(is_presentation_error("a b\nc", "a  b c"));
/// assert!(!is_presentation_error("a b", "a c"));
/// ```
pub fn is_presentation_error(stdout: &str, expected: &str) -> bool {
    tokens(stdout).eq(tokens(expected))
}

/// Whether `output` must be discarded and judged as [`GraderResult::OutputLimitExceeded`].
pub fn exceeds_output_limit(output: &str, limit: usize) -> bool {
    output.len() > limit
}

/// Classifies one run.
///
/// `expected` is `None` for test cases without a reference output; those are accepted as soon
/// as the program exits cleanly.
pub fn classify(
    return_code: i32,
    stdout: &str,
    expected: Option<&str>,
    config: &GraderConfiguration,
) -> GraderResult {
    if return_code != 0 {
        return if config.treat_non_zero_as_runtime_error {
            parse_non_zero_return_code(return_code)
        } else {
            GraderResult::WrongAnswer
        };
    }

    let Some(expected) = expected else {
        return GraderResult::Accepted;
    };
    if check_output(stdout, expected) {
        GraderResult::Accepted
    } else if is_presentation_error(stdout, expected) {
        if config.ignore_presentation_error {
            GraderResult::Accepted
        } else {
            GraderResult::PresentationError
        }
    } else {
        GraderResult::WrongAnswer
    }
}
