use std::{path::PathBuf, time::Duration};

use crate::constraints::ResourceLimits;

pub const DEFAULT_SANDBOX_BINARY: &str = "run_student";

/// Turns a command and its limits into the argv actually spawned.
///
/// This is the only place that knows the flag syntax of the sandbox executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxInvocation {
    binary: Option<PathBuf>,
}

impl SandboxInvocation {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    /// No sandbox executable: commands run as-is and limits are enforced by the caller.
    pub fn direct() -> Self {
        Self { binary: None }
    }

    pub fn is_direct(&self) -> bool {
        self.binary.is_none()
    }

    /// Sandbox flags for `limits`, in the order the sandbox expects them.
    pub fn limit_flags(limits: &ResourceLimits) -> Vec<String> {
        let mut flags = Vec::with_capacity(7);
        if limits.share_network() {
            flags.push("--share-network".to_string());
        }
        flags.push("--time".to_string());
        flags.push(format_secs(limits.time()));
        flags.push("--hard-time".to_string());
        flags.push(format_secs(limits.hard_time()));
        flags.push("--memory".to_string());
        flags.push(limits.memory_mb().to_string());
        flags
    }

    /// Full argv: sandbox binary, limit flags, `extra` sandbox flags, then the command.
    pub fn wrap(
        &self,
        command: &[String],
        limits: Option<&ResourceLimits>,
        extra: &[String],
    ) -> Vec<String> {
        let Some(binary) = &self.binary else {
            return command.to_vec();
        };

        let mut argv = vec![binary.display().to_string()];
        if let Some(limits) = limits {
            argv.extend(Self::limit_flags(limits));
        }
        argv.extend(extra.iter().cloned());
        argv.extend(command.iter().cloned());
        argv
    }
}

fn format_secs(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        duration.as_secs_f64().to_string()
    }
}
