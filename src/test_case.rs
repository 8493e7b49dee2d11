use crate::sandbox::Input;

/// One test of a task, identified by its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub input: Input,
    /// `None` accepts any output of a clean exit.
    pub expected_output: Option<String>,
    /// Number of checks bundled in this case, reported back as is.
    pub total_subcases: Option<u32>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, input: Input) -> Self {
        Self {
            name: name.into(),
            input,
            expected_output: None,
            total_subcases: None,
        }
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    pub fn with_total_subcases(mut self, total: u32) -> Self {
        self.total_subcases = Some(total);
        self
    }
}
