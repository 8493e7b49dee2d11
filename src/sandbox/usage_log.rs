use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tempfile::TempPath;
use tracing::warn;

use crate::errors::SandboxError;

/// Side-channel file written by the sandbox executable after the child exits.
pub(super) struct UsageFile {
    path: TempPath,
}

#[derive(Debug, Default, PartialEq)]
pub(super) struct Usage {
    pub execution_time: Option<Duration>,
    pub memory_usage: Option<u64>,
}

#[derive(Deserialize)]
struct RawUsage {
    /// Seconds.
    execution_time: Option<f64>,
    /// Bytes.
    memory_usage: Option<u64>,
}

impl UsageFile {
    pub fn create() -> Result<Self, SandboxError> {
        let file = tempfile::Builder::new()
            .prefix("usage-")
            .suffix(".json")
            .tempfile()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file back. Missing or malformed files give an empty [`Usage`].
    pub fn read(self) -> Usage {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("could not read usage log {}: {e}", self.path.display());
                return Usage::default();
            }
        };
        parse_usage(&raw).unwrap_or_else(|e| {
            warn!("malformed usage log {}: {e}", self.path.display());
            Usage::default()
        })
    }
}

fn parse_usage(raw: &str) -> Result<Usage, serde_json::Error> {
    let raw: RawUsage = serde_json::from_str(raw)?;
    Ok(Usage {
        execution_time: raw
            .execution_time
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64),
        memory_usage: raw.memory_usage,
    })
}
