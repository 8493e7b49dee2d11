//! Resource accounting through `wait4(2)`.

use std::{
    io,
    process::Child,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Instant,
};

use tracing::debug;
use wait4::{ResUse, ResourceUsage, Wait4};

use crate::results::SandboxCode;

use super::process::{kill_group, Supervised};

/// Waits for `child` and returns its status, the grader verdict if it had to kill it, its
/// peak resident memory in bytes and the CPU time it consumed.
///
/// When `deadline` is set, a killer thread terminates the process group once it passes.
pub(super) fn wait_with_usage(
    child: &mut Child,
    deadline: Option<Instant>,
) -> io::Result<Supervised> {
    let pid = child.id();
    let fired = Arc::new(AtomicBool::new(false));
    // the finished signal keeps the killer from hitting a reused pid
    let (finished_tx, finished_rx) = mpsc::channel::<()>();

    let killer = deadline.map(|deadline| {
        let fired = Arc::clone(&fired);
        thread::spawn(move || {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if let Err(mpsc::RecvTimeoutError::Timeout) = finished_rx.recv_timeout(timeout) {
                fired.store(true, Ordering::SeqCst);
                kill_group(pid);
            }
        })
    });

    let waited = child.wait4();
    let _ = finished_tx.send(());
    if let Some(killer) = killer {
        let _ = killer.join();
    }

    let ResUse {
        status,
        rusage: ResourceUsage {
            utime,
            stime,
            maxrss,
        },
    } = waited?;
    let verdict = fired
        .load(Ordering::SeqCst)
        .then_some(SandboxCode::TimeLimit);
    let cpu_time = utime + stime;
    debug!("pid {pid} finished with maxrss {maxrss}, cpu time {cpu_time:?}");
    Ok(Supervised {
        status,
        verdict,
        peak_memory: Some(maxrss),
        cpu_time: Some(cpu_time),
    })
}
