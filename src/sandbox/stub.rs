//! Scripted [`SandboxRunner`] used in place of the real sandbox in tests.
//!
//! Results are handed out in the order they were pushed. Once the queue is empty every call
//! gets the fallback result (exit code 0, no output). Every invocation is recorded so tests
//! can assert on what was (or was not) run.

use std::{collections::VecDeque, sync::Mutex};

use crate::errors::SandboxError;

use super::{RunOptions, RunResult, SandboxRunner};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: Vec<String>,
    pub options: RunOptions,
}

#[derive(Debug)]
enum Scripted {
    Result(RunResult),
    Failure(String),
}

#[derive(Debug)]
pub struct StubRunner {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
    fallback: RunResult,
}

impl StubRunner {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fallback: RunResult::new(0, "", ""),
        }
    }

    /// Result returned once the script is exhausted.
    pub fn with_fallback(mut self, result: RunResult) -> Self {
        self.fallback = result;
        self
    }

    /// Queues the result of the next call.
    pub fn then(self, result: RunResult) -> Self {
        self.push(Scripted::Result(result));
        self
    }

    /// Queues a transport failure for the next call.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Failure(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of recorded calls whose program is `program`.
    pub fn count_program(&self, program: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.command.first().is_some_and(|p| p == program))
            .count()
    }

    fn push(&self, scripted: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(scripted);
        }
    }
}

impl Default for StubRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxRunner for StubRunner {
    fn run_command(
        &self,
        command: &[String],
        options: RunOptions,
    ) -> Result<RunResult, SandboxError> {
        if command.is_empty() {
            return Err(SandboxError::EmptyCommand);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                command: command.to_vec(),
                options,
            });
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Scripted::Result(result)) => Ok(result),
            Some(Scripted::Failure(message)) => Err(SandboxError::Io(std::io::Error::other(message))),
            None => Ok(self.fallback.clone()),
        }
    }
}
