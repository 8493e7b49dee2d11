use std::{
    fs::File,
    io::{self, Read, Write},
    os::unix::process::{CommandExt, ExitStatusExt},
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, instrument, trace, warn};

use crate::{errors::SandboxError, results::SandboxCode};

use super::{
    invocation::SandboxInvocation, profiler::TreeProfiler, rusage, usage_log, Input,
    ResourceAccounting, RunOptions, RunResult, SandboxRunner,
};

/// Polling period of the supervision loop when no profiler interval applies.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs commands as child processes, optionally behind the sandbox executable.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    invocation: SandboxInvocation,
    accounting: ResourceAccounting,
}

/// Limits the grader enforces itself when there is no sandbox executable.
#[derive(Debug, Clone, Copy, Default)]
struct Watch {
    deadline: Option<Instant>,
    memory_bytes: Option<u64>,
}

pub(super) struct Supervised {
    pub(super) status: ExitStatus,
    /// Set when the grader killed the process itself.
    pub(super) verdict: Option<SandboxCode>,
    pub(super) peak_memory: Option<u64>,
    /// User plus system time, known only with kernel accounting.
    pub(super) cpu_time: Option<Duration>,
}

impl ProcessSandbox {
    pub fn new(invocation: SandboxInvocation, accounting: ResourceAccounting) -> Self {
        Self {
            invocation,
            accounting,
        }
    }

    /// No sandbox executable: limits are enforced by killing the process group.
    pub fn direct(accounting: ResourceAccounting) -> Self {
        Self::new(SandboxInvocation::direct(), accounting)
    }

    pub fn accounting(&self) -> &ResourceAccounting {
        &self.accounting
    }

    fn watch(&self, options: &RunOptions, started: Instant) -> Watch {
        match (&options.limits, self.invocation.is_direct()) {
            (Some(limits), true) => Watch {
                deadline: Some(started + limits.hard_time()),
                memory_bytes: Some(limits.memory_bytes()),
            },
            _ => Watch::default(),
        }
    }
}

impl SandboxRunner for ProcessSandbox {
    #[instrument(skip(self, options), fields(cwd = ?options.cwd))]
    fn run_command(
        &self,
        command: &[String],
        options: RunOptions,
    ) -> Result<RunResult, SandboxError> {
        if command.is_empty() {
            return Err(SandboxError::EmptyCommand);
        }

        let usage_file = match &self.accounting {
            ResourceAccounting::UsageLog { .. } => Some(usage_log::UsageFile::create()?),
            _ => None,
        };
        let extra = match (&self.accounting, &usage_file) {
            (ResourceAccounting::UsageLog { flag }, Some(file)) => {
                vec![flag.clone(), file.path().display().to_string()]
            }
            _ => Vec::new(),
        };
        let argv = self
            .invocation
            .wrap(command, options.limits.as_ref(), &extra);
        debug!("spawning {argv:?}");

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(options.env.iter().map(|(k, v)| (k, v)));
        match &options.stdin {
            Input::Empty => cmd.stdin(Stdio::null()),
            Input::Text(_) => cmd.stdin(Stdio::piped()),
            Input::File(path) => {
                let file = File::open(path).map_err(|source| SandboxError::Input {
                    path: path.clone(),
                    source,
                })?;
                cmd.stdin(Stdio::from(file))
            }
        };

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| SandboxError::Spawn {
            program: argv[0].clone(),
            source,
        })?;
        trace!("spawned pid {}", child.id());

        let feeder = match (&options.stdin, child.stdin.take()) {
            (Input::Text(text), Some(stdin)) => Some(feed_stdin(stdin, text.clone())),
            _ => None,
        };
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let watch = self.watch(&options, started);
        let supervised = match &self.accounting {
            ResourceAccounting::WallClock | ResourceAccounting::UsageLog { .. } => {
                supervise(&mut child, watch, POLL_INTERVAL, None)
            }
            ResourceAccounting::Profiler { interval } => {
                let mut profiler = TreeProfiler::new(child.id());
                supervise(&mut child, watch, *interval, Some(&mut profiler))
            }
            ResourceAccounting::KernelUsage => rusage::wait_with_usage(&mut child, watch.deadline),
        };
        let supervised = match supervised {
            Ok(supervised) => supervised,
            Err(e) => {
                kill_process_group(&mut child);
                let _ = child.wait();
                return Err(e.into());
            }
        };
        let elapsed = started.elapsed();
        if self.invocation.is_direct() {
            // leftover background processes would keep the output pipes open
            kill_group(child.id());
        }

        if let Some(feeder) = feeder {
            if let Ok(Err(e)) = feeder.join() {
                debug!("stdin was not fully consumed: {e}");
            }
        }
        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        let return_code = match supervised.verdict {
            Some(code) => {
                debug!("grader killed pid {} ({code:?})", child.id());
                code.code()
            }
            None => exit_code(supervised.status),
        };

        let (execution_time, memory_usage) = match &self.accounting {
            ResourceAccounting::UsageLog { .. } => usage_file
                .map(|file| file.read())
                .map(|usage| (usage.execution_time, usage.memory_usage))
                .unwrap_or((None, None)),
            ResourceAccounting::WallClock => (Some(elapsed), None),
            ResourceAccounting::KernelUsage => (supervised.cpu_time, supervised.peak_memory),
            ResourceAccounting::Profiler { .. } => (Some(elapsed), supervised.peak_memory),
        };

        debug!(
            "exit code {return_code}, {} bytes of stdout, {} bytes of stderr",
            stdout.len(),
            stderr.len()
        );
        Ok(RunResult {
            return_code,
            stdout,
            stderr,
            execution_time,
            memory_usage,
        })
    }
}

/// Waits for `child`, sampling memory with `profiler` and enforcing `watch` in between.
fn supervise(
    child: &mut Child,
    watch: Watch,
    interval: Duration,
    mut profiler: Option<&mut TreeProfiler>,
) -> io::Result<Supervised> {
    loop {
        if let Some(profiler) = profiler.as_deref_mut() {
            let current = profiler.sample();
            if let (Some(current), Some(limit)) = (current, watch.memory_bytes) {
                if current > limit {
                    kill_process_group(child);
                    let status = child.wait()?;
                    return Ok(Supervised {
                        status,
                        verdict: Some(SandboxCode::MemoryLimit),
                        peak_memory: profiler.peak(),
                        cpu_time: None,
                    });
                }
            }
        }

        if let Some(status) = child.try_wait()? {
            return Ok(Supervised {
                status,
                verdict: None,
                peak_memory: profiler.and_then(|p| p.peak()),
                cpu_time: None,
            });
        }

        let now = Instant::now();
        let mut pause = interval;
        if let Some(deadline) = watch.deadline {
            if now >= deadline {
                kill_process_group(child);
                let status = child.wait()?;
                return Ok(Supervised {
                    status,
                    verdict: Some(SandboxCode::TimeLimit),
                    peak_memory: profiler.and_then(|p| p.peak()),
                    cpu_time: None,
                });
            }
            pause = pause.min(deadline - now);
        }
        thread::sleep(pause);
    }
}

/// Kills the child and every process left in its group.
pub(super) fn kill_process_group(child: &mut Child) {
    kill_group(child.id());
    if let Err(e) = child.kill() {
        trace!("kill of pid {} failed: {e}", child.id());
    }
}

pub(super) fn kill_group(pid: u32) {
    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    // SAFETY: plain syscall, the group was created for this child by `process_group(0)`.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        trace!(
            "kill of process group {pgid} failed: {}",
            io::Error::last_os_error()
        );
    }
}

/// Exit code, or `128 + signal` when the process was killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => {
            warn!("exit status {status:?} has neither code nor signal");
            SandboxCode::InternalError.code()
        }
    }
}

fn feed_stdin(mut stdin: ChildStdin, text: String) -> JoinHandle<io::Result<()>> {
    thread::spawn(move || {
        match stdin.write_all(text.as_bytes()) {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
        // stdin is dropped here, closing the pipe
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<String, SandboxError> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
