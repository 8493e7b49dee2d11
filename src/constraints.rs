//! Defines the resource limits applied to every sandboxed run.
//!
//! Limits are attached to a single run call, not to a project: the same built project can be
//! run many times with different limits.
//!
//! # Overview
//!
//! The main entry point is the [`ResourceLimitsBuilder`] struct, which uses a builder pattern
//! to configure limits. These include:
//!
//! - **CPU time**: soft time limit, reported by the sandbox as a time-limit verdict
//! - **Wall time**: hard time limit after which the process is killed
//! - **Memory**: maximum memory in MB
//! - **Network**: whether the process may use the host network
//!
//! Translation into sandbox flags happens in
//! [`SandboxInvocation`](crate::sandbox::SandboxInvocation) and nowhere else.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use multilang_grader::constraints::ResourceLimitsBuilder;
//!
//! let limits = ResourceLimitsBuilder::new()
//!     .with_time(Duration::from_secs(2))
//!     .with_hard_time(Duration::from_secs(5))
//!     .with_memory_mb(256)
//!     .build()
//!     .unwrap();
//! assert_eq!(limits.memory_mb(), 256);
//! ```
//!
//! Limits can also be read from environment variables using
//! [`ResourceLimitsBuilder::from_env()`].

use std::{env, time::Duration};

use tracing::warn;

use crate::errors::LimitsError;

const DEFAULT_TIME: Duration = Duration::from_secs(2);
const DEFAULT_MEMORY_MB: u64 = 50;

/// A builder for [`ResourceLimits`].
///
/// Unset values fall back to a 2 second time limit, a hard time limit equal to the time
/// limit, 50 MB of memory and a shared network.
#[derive(Debug, Default, Clone)]
pub struct ResourceLimitsBuilder {
    time: Option<Duration>,
    hard_time: Option<Duration>,
    memory_mb: Option<u64>,
    share_network: Option<bool>,
}

impl ResourceLimitsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder configured from environment variables.
    ///
    /// Read environment variables are:
    /// - `TIME_LIMIT_SECS` (f64): time limit in seconds
    /// - `HARD_TIME_LIMIT_SECS` (f64): hard time limit in seconds
    /// - `MEMORY_LIMIT_MB` (u64): memory limit in MB
    /// - `SHARE_NETWORK` (bool): `"false"` isolates the network
    ///
    /// Unparsable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        fn parse_secs(var: &str) -> Option<Duration> {
            let raw = env::var(var).ok()?;
            match raw.parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
                _ => {
                    warn!("ignoring {var}={raw:?}: not a number of seconds");
                    None
                }
            }
        }

        fn parse_u64(var: &str) -> Option<u64> {
            let raw = env::var(var).ok()?;
            raw.parse()
                .map_err(|_| warn!("ignoring {var}={raw:?}: not an integer"))
                .ok()
        }

        Self {
            time: parse_secs("TIME_LIMIT_SECS"),
            hard_time: parse_secs("HARD_TIME_LIMIT_SECS"),
            memory_mb: parse_u64("MEMORY_LIMIT_MB"),
            share_network: env::var("SHARE_NETWORK")
                .ok()
                .map(|v| !v.eq_ignore_ascii_case("false")),
        }
    }

    /// Sets the CPU time limit.
    #[must_use]
    pub fn with_time(self, time: Duration) -> Self {
        Self {
            time: Some(time),
            ..self
        }
    }

    /// Sets the wall-clock limit after which the process is killed.
    ///
    /// Defaults to the time limit.
    #[must_use]
    pub fn with_hard_time(self, hard_time: Duration) -> Self {
        Self {
            hard_time: Some(hard_time),
            ..self
        }
    }

    /// Sets the memory limit (in MB).
    #[must_use]
    pub fn with_memory_mb(self, memory_mb: u64) -> Self {
        Self {
            memory_mb: Some(memory_mb),
            ..self
        }
    }

    /// Allows or forbids network access. Network is shared by default so submissions can reach
    /// their runtime dependencies.
    #[must_use]
    pub fn with_share_network(self, share_network: bool) -> Self {
        Self {
            share_network: Some(share_network),
            ..self
        }
    }

    /// Consumes the builder and returns the constructed `ResourceLimits`.
    ///
    /// # Errors
    ///
    /// Returns an error when limits are impossible, e.g. hard time < time.
    pub fn build(self) -> Result<ResourceLimits, LimitsError> {
        let time = self.time.unwrap_or(DEFAULT_TIME);
        let hard_time = self.hard_time.unwrap_or(time);
        let memory_mb = self.memory_mb.unwrap_or(DEFAULT_MEMORY_MB);

        if time.is_zero() {
            return Err(LimitsError::ZeroTime);
        }
        if hard_time < time {
            return Err(LimitsError::HardTimeBelowTime { time, hard_time });
        }
        if memory_mb == 0 {
            return Err(LimitsError::ZeroMemory);
        }

        Ok(ResourceLimits {
            time,
            hard_time,
            memory_mb,
            share_network: self.share_network.unwrap_or(true),
        })
    }
}

/// Obtained using [`ResourceLimitsBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    time: Duration,
    hard_time: Duration,
    memory_mb: u64,
    share_network: bool,
}

impl ResourceLimits {
    pub fn builder() -> ResourceLimitsBuilder {
        ResourceLimitsBuilder::new()
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn hard_time(&self) -> Duration {
        self.hard_time
    }

    pub fn memory_mb(&self) -> u64 {
        self.memory_mb
    }

    pub fn memory_bytes(&self) -> u64 {
        self.memory_mb.saturating_mul(1_000_000)
    }

    pub fn share_network(&self) -> bool {
        self.share_network
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            time: DEFAULT_TIME,
            hard_time: DEFAULT_TIME,
            memory_mb: DEFAULT_MEMORY_MB,
            share_network: true,
        }
    }
}
